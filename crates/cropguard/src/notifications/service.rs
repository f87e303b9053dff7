//! Owned lifecycle for the notification subsystem.
//!
//! [`NotificationService`] is the one object the host keeps around: it owns
//! the stream connection, the foreground fallback poller, the shared
//! delivered-id set and the notifier bridge. It replaces any module-level
//! mutable singleton: whatever process-wide context tracks the user session
//! owns a service value and calls `connect`/`disconnect` on identity
//! changes.

use std::time::Instant;

use crate::ApiConfig;

use super::backend::NotificationBackend;
use super::bridge::LocalNotifier;
use super::connection::{ConnectionManager, ConnectionStatus, StreamConnector};
use super::desktop::DesktopBackend;
use super::poller::{FallbackPoller, HttpPullClient, PullClient};
use super::types::{DeliveredIds, NotificationRecord};
use super::websocket::WsConnector;
use tracing::{debug, info};

pub struct NotificationService<C: StreamConnector, P: PullClient, B: NotificationBackend> {
    connection: ConnectionManager<C>,
    poller: FallbackPoller<P>,
    delivered: DeliveredIds,
    notifier: LocalNotifier<B>,
}

impl<F> NotificationService<WsConnector<F>, HttpPullClient, DesktopBackend>
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    /// Service wired with the production transport, pull client and
    /// platform backend. `wakeup` is called whenever the stream has
    /// something to deliver, so the host can schedule the next tick.
    pub fn with_platform(config: ApiConfig, wakeup: F) -> Self {
        let connector = WsConnector::new(wakeup);
        let pull = HttpPullClient::new(config.clone());
        Self::new(config, connector, pull, DesktopBackend::new())
    }
}

impl<C, P, B> NotificationService<C, P, B>
where
    C: StreamConnector,
    P: PullClient,
    B: NotificationBackend,
{
    pub fn new(config: ApiConfig, connector: C, pull: P, backend: B) -> Self {
        Self {
            connection: ConnectionManager::new(config, connector),
            poller: FallbackPoller::new(pull),
            delivered: DeliveredIds::new(),
            notifier: LocalNotifier::new(backend),
        }
    }

    /// Start delivery for `user_id`.
    ///
    /// An identity change tears down the previous user's channel and opens a
    /// fresh one; calling again for the current user is a no-op.
    pub fn connect(&mut self, user_id: &str, now: Instant) {
        info!("notification service connecting for {user_id}");
        self.connection.connect(user_id, now);
        self.poller.set_user(user_id);
    }

    /// Stop delivery: closes the stream, cancels any pending reconnect and
    /// stops the foreground poller.
    pub fn disconnect(&mut self) {
        info!("notification service disconnecting");
        self.connection.disconnect();
        self.poller.stop();
    }

    pub fn is_running(&self) -> bool {
        self.poller.is_active() || self.connection.user_id().is_some()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Drive both channels once. Call from the host event loop, at least as
    /// often as the poll interval and whenever the transport wakes it.
    ///
    /// Every record, whichever channel produced it, passes the delivered-id
    /// check before the notifier, so the same notification surfacing over the
    /// stream and a concurrent poll alerts at most once.
    pub fn tick(&mut self, now: Instant) {
        let delivered = &mut self.delivered;
        let notifier = &mut self.notifier;
        let mut act = |record: NotificationRecord| {
            if !delivered.record_if_new(&record.id) {
                debug!("skipping duplicate notification {}", record.id);
                return;
            }
            notifier.deliver(&record);
        };

        self.connection.tick(now, &mut act);
        self.poller.tick(now, &mut act);
    }
}
