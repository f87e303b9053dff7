//! The single chokepoint that turns a [`NotificationRecord`] into a
//! platform-visible alert, regardless of which channel produced it.

use super::backend::NotificationBackend;
use super::types::NotificationRecord;
use tracing::{debug, warn};

/// App name used as the alert title when a record has none.
pub const APP_NAME: &str = "CropGuard";

/// Placeholder body for records with no display text at all.
const FALLBACK_BODY: &str = "You have a new notification";

/// Local notifier bridge.
///
/// Callers are responsible for not delivering the same record id twice in a
/// short window; the bridge itself performs no deduplication. It is a pure
/// presentation effect. Alert delivery is best-effort and never fails the
/// caller.
pub struct LocalNotifier<B: NotificationBackend> {
    backend: B,
    permission_granted: bool,
}

impl<B: NotificationBackend> LocalNotifier<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            permission_granted: false,
        }
    }

    /// Schedule an immediate alert for `record`.
    ///
    /// Requests display permission on first use; a denial turns the call
    /// into a no-op and the record still counts as processed.
    pub fn deliver(&mut self, record: &NotificationRecord) {
        if !self.permission() {
            debug!("notification permission denied, dropping alert {}", record.id);
            return;
        }

        let title = if record.title.is_empty() {
            APP_NAME
        } else {
            &record.title
        };
        let body = if record.body.is_empty() {
            FALLBACK_BODY
        } else {
            &record.body
        };

        debug!("scheduling alert for notification {}", record.id);
        self.backend.send_notification(title, body);
    }

    // only a granted result is cached, so a later grant is picked up
    fn permission(&mut self) -> bool {
        if !self.permission_granted {
            self.permission_granted = self.backend.ensure_permission();
            if !self.permission_granted {
                warn!("notification permission not granted");
            }
        }
        self.permission_granted
    }
}
