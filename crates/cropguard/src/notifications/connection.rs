//! Persistent stream connection manager.
//!
//! Owns the single live connection to the notification endpoint for the
//! current user and recovers from drops with bounded backoff. The manager is
//! polled: the host event loop calls [`ConnectionManager::tick`] (prompted
//! by transport wakeups), and discrete [`StreamEvent`]s drive the state
//! machine instead of nested callbacks.

use std::time::{Duration, Instant};

use crate::{ApiConfig, Result};

use super::types::{NotificationRecord, StreamPayload};
use tracing::{debug, error, info, warn};
use url::Url;

/// Delay unit for the reconnect schedule: attempt `n` waits `n` times this.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(3000);

/// Automatic reconnection stops after this many consecutive attempts.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// A discrete event observed on the stream transport.
#[derive(Debug)]
pub enum StreamEvent {
    Opened,
    Message(String),
    Error(String),
    Closed,
}

/// A live stream of notification events. Dropping it closes the connection.
pub trait NotificationStream {
    fn try_recv(&mut self) -> Option<StreamEvent>;
}

/// Opens streams. The production connector dials the websocket endpoint;
/// tests script one.
pub trait StreamConnector {
    type Stream: NotificationStream;

    fn open(&mut self, url: &Url) -> Result<Self::Stream>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

/// Manages the notification stream for one user at a time.
///
/// At most one live stream and at most one pending reconnect exist at any
/// instant. [`ConnectionManager::disconnect`] is the only path that stops
/// reconnection attempts.
pub struct ConnectionManager<C: StreamConnector> {
    config: ApiConfig,
    connector: C,
    stream: Option<C::Stream>,
    status: ConnectionStatus,
    user_id: Option<String>,
    reconnect_attempts: u32,
    reconnect_at: Option<Instant>,
}

impl<C: StreamConnector> ConnectionManager<C> {
    pub fn new(config: ApiConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            stream: None,
            status: ConnectionStatus::Disconnected,
            user_id: None,
            reconnect_attempts: 0,
            reconnect_at: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// When the next automatic reconnect fires, if one is pending.
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Open the stream for `user_id`.
    ///
    /// A no-op when a connection for the same user is already up or being
    /// opened. Any other state (different user, exhausted reconnects) tears
    /// the old channel down and starts fresh.
    pub fn connect(&mut self, user_id: &str, now: Instant) {
        let same_user = self.user_id.as_deref() == Some(user_id);
        if same_user
            && matches!(
                self.status,
                ConnectionStatus::Connected | ConnectionStatus::Connecting
            )
        {
            debug!("already connected for {user_id}, nothing to do");
            return;
        }

        self.disconnect();
        info!("opening notification stream for {user_id}");
        self.user_id = Some(user_id.to_owned());
        self.open_stream(now);
    }

    /// Tear the channel down and cancel any pending reconnect.
    ///
    /// This is the cancellation primitive: no scheduled work survives it.
    pub fn disconnect(&mut self) {
        if self.reconnect_at.take().is_some() {
            debug!("cancelled pending reconnect");
        }
        if self.stream.take().is_some() {
            info!("closing notification stream");
        }
        self.user_id = None;
        self.reconnect_attempts = 0;
        self.status = ConnectionStatus::Disconnected;
    }

    /// Drive the connection: fire a due reconnect, then drain transport
    /// events, forwarding each parsed record to `act` in transport order.
    pub fn tick<F>(&mut self, now: Instant, act: &mut F)
    where
        F: FnMut(NotificationRecord),
    {
        if let Some(at) = self.reconnect_at {
            if now >= at {
                self.reconnect_at = None;
                info!(
                    "reconnecting notification stream (attempt {})",
                    self.reconnect_attempts
                );
                self.open_stream(now);
            }
        }

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return;
            };
            let Some(event) = stream.try_recv() else {
                return;
            };

            match event {
                StreamEvent::Opened => {
                    info!("notification stream connected");
                    self.status = ConnectionStatus::Connected;
                    self.reconnect_attempts = 0;
                }
                StreamEvent::Message(text) => match StreamPayload::from_json(&text) {
                    Ok(payload) => act(payload.into_record()),
                    Err(err) => warn!("discarding malformed notification payload: {err}"),
                },
                StreamEvent::Error(err) => {
                    // the transport emits Closed after a fatal error; that
                    // event drives the retry, not this one
                    error!("notification stream error: {err}");
                }
                StreamEvent::Closed => {
                    self.stream = None;
                    self.schedule_reconnect(now);
                }
            }
        }
    }

    fn open_stream(&mut self, now: Instant) {
        let Some(user_id) = self.user_id.clone() else {
            return;
        };

        let url = match self.config.stream_url(&user_id) {
            Ok(url) => url,
            Err(err) => {
                error!("could not derive stream url: {err}");
                self.status = ConnectionStatus::Disconnected;
                return;
            }
        };

        self.status = ConnectionStatus::Connecting;
        match self.connector.open(&url) {
            Ok(stream) => {
                self.stream = Some(stream);
            }
            Err(err) => {
                error!("could not open notification stream: {err}");
                self.stream = None;
                self.schedule_reconnect(now);
            }
        }
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        if self.reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
            warn!(
                "giving up after {} reconnect attempts; staying disconnected until reconnected explicitly",
                self.reconnect_attempts
            );
            self.status = ConnectionStatus::Disconnected;
            self.reconnect_at = None;
            return;
        }

        self.reconnect_attempts += 1;
        let delay = RECONNECT_BASE_DELAY * self.reconnect_attempts;
        self.reconnect_at = Some(now + delay);
        self.status = ConnectionStatus::ReconnectPending;
        debug!(
            "reconnect attempt {} scheduled in {:?}",
            self.reconnect_attempts, delay
        );
    }
}
