mod api;
mod error;
pub mod notifications;
pub mod platform;
mod session;

pub use api::{ApiConfig, DEFAULT_PULL_LIMIT};
pub use error::Error;
pub use notifications::{
    BackgroundFetchOutcome, ConnectionStatus, NotificationBackend, NotificationRecord,
    NotificationService,
};
pub use session::{DataPath, SessionStore};

pub type Result<T> = std::result::Result<T, error::Error>;
