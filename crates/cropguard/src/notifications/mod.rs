mod backend;
mod bridge;
mod connection;
mod desktop;
mod poller;
mod service;
mod test_support;
mod types;
mod websocket;

pub use backend::{LoggingBackend, NoopBackend, NotificationBackend};
pub use bridge::{LocalNotifier, APP_NAME};
pub use connection::{
    ConnectionManager, ConnectionStatus, NotificationStream, StreamConnector, StreamEvent,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY,
};
pub use desktop::DesktopBackend;
pub use poller::{
    background_tick, BackgroundFetchOutcome, FallbackPoller, HttpPullClient, PullClient,
    PullResult, POLL_INTERVAL,
};
pub use service::NotificationService;
pub use types::{DeliveredIds, NotificationRecord, StreamPayload, MAX_DELIVERED_IDS};
pub use websocket::{WsConnector, WsStream};
