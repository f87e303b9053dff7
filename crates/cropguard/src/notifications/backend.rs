//! Notification backend trait for platform-specific alert delivery.

/// Backend for putting an alert in front of the user.
///
/// Implementations wrap whatever the host platform offers: native desktop
/// notifications, a mobile shell's notification bridge, or nothing at all.
pub trait NotificationBackend {
    /// Make sure the platform will let us display alerts, requesting
    /// permission if needed. Returns false when the user denied it.
    fn ensure_permission(&self) -> bool {
        true
    }

    /// Schedule an immediate, non-repeating alert.
    fn send_notification(&self, title: &str, body: &str);
}

/// A no-op backend that does nothing.
///
/// Used when notifications are disabled or on unsupported platforms.
pub struct NoopBackend;

impl NotificationBackend for NoopBackend {
    fn send_notification(&self, _title: &str, _body: &str) {
        // Do nothing
    }
}

/// A backend that just logs alerts.
///
/// Useful for debugging and testing.
pub struct LoggingBackend;

impl NotificationBackend for LoggingBackend {
    fn send_notification(&self, title: &str, body: &str) {
        tracing::info!("Notification: title={title:?} body={body:?}");
    }
}
