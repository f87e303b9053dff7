//! Desktop notification backend.
//!
//! Provides native desktop alerts on Linux (notify-rust) and macOS
//! (osascript). Development builds of the mobile client run on desktop, so
//! this is also the default backend during development.

use super::backend::NotificationBackend;
use tracing::{debug, error};

/// Desktop notification backend.
pub struct DesktopBackend {
    /// App name shown in notifications (used on Linux)
    #[allow(dead_code)]
    app_name: String,
}

impl DesktopBackend {
    pub fn with_app_name(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self {
            app_name: "CropGuard".to_string(),
        }
    }
}

impl NotificationBackend for DesktopBackend {
    fn ensure_permission(&self) -> bool {
        // no permission system on desktop
        true
    }

    fn send_notification(&self, title: &str, body: &str) {
        #[cfg(target_os = "linux")]
        {
            use notify_rust::Notification;

            match Notification::new()
                .appname(&self.app_name)
                .summary(title)
                .body(body)
                .show()
            {
                Ok(_) => debug!("desktop notification displayed"),
                Err(e) => error!("failed to show desktop notification: {}", e),
            }
        }

        #[cfg(target_os = "macos")]
        {
            show_macos_notification(title, body);
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            debug!("no desktop notifier on this platform: {title:?} {body:?}");
        }
    }
}

/// Show a native macOS notification using osascript.
///
/// osascript works reliably outside a proper .app bundle, which is where
/// development builds run.
#[cfg(target_os = "macos")]
fn show_macos_notification(title: &str, body: &str) {
    use std::process::Command;

    // Escape special characters for AppleScript string
    let escaped_title = title.replace('\\', "\\\\").replace('"', "\\\"");
    let escaped_body = body.replace('\\', "\\\\").replace('"', "\\\"");

    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escaped_body, escaped_title
    );

    match Command::new("osascript").args(["-e", &script]).output() {
        Ok(output) => {
            if output.status.success() {
                debug!("macOS notification displayed");
            } else {
                error!(
                    "osascript failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
            }
        }
        Err(e) => error!("failed to show macOS notification: {}", e),
    }
}
