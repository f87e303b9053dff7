//! Fallback polling for missed notifications.
//!
//! The persistent stream cannot run everywhere: the OS may suspend the app,
//! or the process may have been terminated and relaunched. The poller
//! compensates by pulling recent notifications on an interval and feeding
//! them through the same delivery path, deduplicated upstream.
//!
//! Two variants share the pull client:
//! - [`FallbackPoller`]: in-process interval, runs only while the app is
//!   active and a user identity is present.
//! - [`background_tick`]: one blocking pull for an OS-scheduled background
//!   task, reporting an outcome the host scheduler understands.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::api::DEFAULT_PULL_LIMIT;
use crate::{ApiConfig, SessionStore};

use super::types::NotificationRecord;
use tracing::{debug, warn};

/// How often the foreground poller pulls while the app is active.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a background tick waits for its pull before giving up.
const BACKGROUND_PULL_TIMEOUT: Duration = Duration::from_secs(25);

pub type PullResult = std::result::Result<Vec<NotificationRecord>, String>;

/// Issues one bounded pull request, most recent notifications first.
///
/// `on_done` is called with the outcome when the request completes; the
/// call itself returns immediately.
pub trait PullClient {
    fn pull(&self, user_id: &str, limit: usize, on_done: Box<dyn FnOnce(PullResult) + Send>);
}

/// Pull client talking to the backend's notification endpoint.
pub struct HttpPullClient {
    config: ApiConfig,
}

impl HttpPullClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

impl PullClient for HttpPullClient {
    fn pull(&self, user_id: &str, limit: usize, on_done: Box<dyn FnOnce(PullResult) + Send>) {
        let url = self.config.pull_url(user_id, limit);
        let request = ehttp::Request::get(url);
        ehttp::fetch(request, move |response| {
            let result = response.and_then(|resp| {
                if !resp.ok {
                    return Err(format!("bad http response: {}", resp.status_text));
                }

                serde_json::from_slice::<Vec<NotificationRecord>>(&resp.bytes)
                    .map_err(|e| e.to_string())
            });
            on_done(result);
        });
    }
}

/// In-process interval poller.
///
/// Keeps at most one pull in flight; a failed pull is logged and retried on
/// the next interval. Stopping the poller is the same lifecycle event that
/// disconnects the stream (loss of user identity).
pub struct FallbackPoller<P: PullClient> {
    client: P,
    interval: Duration,
    user_id: Option<String>,
    last_pull: Option<Instant>,
    inflight: bool,
    results_tx: Sender<PullResult>,
    results_rx: Receiver<PullResult>,
}

impl<P: PullClient> FallbackPoller<P> {
    pub fn new(client: P) -> Self {
        Self::with_interval(client, POLL_INTERVAL)
    }

    pub fn with_interval(client: P, interval: Duration) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            client,
            interval,
            user_id: None,
            last_pull: None,
            inflight: false,
            results_tx,
            results_rx,
        }
    }

    pub fn set_user(&mut self, user_id: &str) {
        if self.user_id.as_deref() == Some(user_id) {
            return;
        }
        self.stop();
        self.user_id = Some(user_id.to_owned());
    }

    /// Stop polling and discard anything still in flight.
    pub fn stop(&mut self) {
        self.user_id = None;
        self.last_pull = None;
        self.inflight = false;
        // drain so a late response for the old user can't leak into the next session
        while self.results_rx.try_recv().is_ok() {}
    }

    pub fn is_active(&self) -> bool {
        self.user_id.is_some()
    }

    /// Drive the poller: deliver completed pulls to `act`, then issue the
    /// next pull once the interval has elapsed.
    pub fn tick<F>(&mut self, now: Instant, act: &mut F)
    where
        F: FnMut(NotificationRecord),
    {
        while let Ok(result) = self.results_rx.try_recv() {
            self.inflight = false;
            match result {
                Ok(records) => {
                    debug!("pull returned {} records", records.len());
                    for record in records {
                        act(record);
                    }
                }
                Err(err) => warn!("notification pull failed: {err}"),
            }
        }

        let Some(user_id) = self.user_id.clone() else {
            return;
        };
        if self.inflight {
            return;
        }
        if let Some(last) = self.last_pull {
            if now.saturating_duration_since(last) < self.interval {
                return;
            }
        }

        self.last_pull = Some(now);
        self.inflight = true;
        let tx = self.results_tx.clone();
        self.client.pull(
            &user_id,
            DEFAULT_PULL_LIMIT,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
    }
}

/// What a background tick reports back to the OS scheduler, which uses it
/// to adjust future scheduling frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundFetchOutcome {
    NewData,
    NoData,
    Failed,
}

/// One OS-scheduled background pull.
///
/// Resolves the user from the persisted session; without one the tick is a
/// no-op reporting [`BackgroundFetchOutcome::NoData`], without any request.
/// Errors never propagate past this function.
pub fn background_tick<P, F>(
    session: &SessionStore,
    client: &P,
    act: &mut F,
) -> BackgroundFetchOutcome
where
    P: PullClient,
    F: FnMut(NotificationRecord),
{
    let Some(user_id) = session.user_id() else {
        debug!("background fetch: no persisted session, nothing to do");
        return BackgroundFetchOutcome::NoData;
    };

    let (tx, rx) = mpsc::channel();
    client.pull(
        &user_id,
        DEFAULT_PULL_LIMIT,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );

    match rx.recv_timeout(BACKGROUND_PULL_TIMEOUT) {
        Ok(Ok(records)) if records.is_empty() => BackgroundFetchOutcome::NoData,
        Ok(Ok(records)) => {
            debug!("background fetch delivered {} records", records.len());
            for record in records {
                act(record);
            }
            BackgroundFetchOutcome::NewData
        }
        Ok(Err(err)) => {
            warn!("background fetch failed: {err}");
            BackgroundFetchOutcome::Failed
        }
        Err(_) => {
            warn!("background fetch timed out");
            BackgroundFetchOutcome::Failed
        }
    }
}
