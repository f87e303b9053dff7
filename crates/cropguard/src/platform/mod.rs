//! Platform capability selection for notification delivery.
//!
//! Picked once at startup: platforms that can schedule background execution
//! register the fetch task; the other platform relies on the push stream
//! exclusively and skips registration.

use std::collections::HashMap;
use std::time::Duration;

use crate::Result;
use tracing::{debug, info};

/// The single background task identifier this app registers.
pub const BACKGROUND_TASK_ID: &str = "cropguard.notification-fetch";

/// Minimum interval between OS-scheduled background fetches.
pub const BACKGROUND_MIN_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Notification delivery mechanism for the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Persistent stream only; no background scheduler on this platform.
    PushStream,
    /// Persistent stream while active, OS-scheduled fetch in the background.
    BackgroundFetch,
}

impl DeliveryMode {
    /// Pick the delivery mechanism appropriate to the compiled platform.
    pub fn detect() -> Self {
        if cfg!(target_os = "android") {
            DeliveryMode::BackgroundFetch
        } else {
            DeliveryMode::PushStream
        }
    }

    pub fn uses_background_fetch(&self) -> bool {
        matches!(self, DeliveryMode::BackgroundFetch)
    }
}

/// Registration parameters for the background fetch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundTaskConfig {
    pub task_id: String,
    pub min_interval: Duration,
    pub stop_on_terminate: bool,
    pub start_on_boot: bool,
}

impl Default for BackgroundTaskConfig {
    fn default() -> Self {
        Self {
            task_id: BACKGROUND_TASK_ID.to_string(),
            min_interval: BACKGROUND_MIN_INTERVAL,
            stop_on_terminate: false,
            start_on_boot: true,
        }
    }
}

/// Host-platform background scheduler.
///
/// Registration with an already-registered task id replaces the previous
/// registration rather than duplicating it. The scheduled task itself is
/// governed entirely by the host platform; the client only registers and
/// unregisters.
pub trait BackgroundScheduler {
    fn register(&mut self, config: &BackgroundTaskConfig) -> Result<()>;
    fn unregister(&mut self, task_id: &str);
}

/// Recording scheduler for hosts without an OS bridge, and for tests.
#[derive(Default)]
pub struct InProcessScheduler {
    registered: HashMap<String, BackgroundTaskConfig>,
}

impl InProcessScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self, task_id: &str) -> Option<&BackgroundTaskConfig> {
        self.registered.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

impl BackgroundScheduler for InProcessScheduler {
    fn register(&mut self, config: &BackgroundTaskConfig) -> Result<()> {
        debug!("registering background task {}", config.task_id);
        self.registered
            .insert(config.task_id.clone(), config.clone());
        Ok(())
    }

    fn unregister(&mut self, task_id: &str) {
        self.registered.remove(task_id);
    }
}

/// Register the background fetch task when the platform's delivery mode
/// calls for it; otherwise do nothing.
pub fn init_background_delivery<S: BackgroundScheduler>(
    mode: DeliveryMode,
    scheduler: &mut S,
) -> Result<()> {
    match mode {
        DeliveryMode::BackgroundFetch => {
            info!("registering background notification fetch");
            scheduler.register(&BackgroundTaskConfig::default())
        }
        DeliveryMode::PushStream => {
            debug!("platform uses the push stream exclusively; skipping background registration");
            Ok(())
        }
    }
}
