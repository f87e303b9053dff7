use ewebsock::{Options, WsEvent, WsMessage, WsReceiver, WsSender};

use super::connection::{NotificationStream, StreamConnector, StreamEvent};
use crate::Result;
use tracing::debug;
use url::Url;

/// Production connector: dials the notification endpoint over a websocket.
///
/// The wakeup callback is invoked whenever the socket has something for us,
/// so the host can schedule the next service tick instead of busy-polling.
pub struct WsConnector<F> {
    wakeup: F,
}

impl<F> WsConnector<F>
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    pub fn new(wakeup: F) -> Self {
        Self { wakeup }
    }
}

impl<F> StreamConnector for WsConnector<F>
where
    F: Fn() + Send + Sync + Clone + 'static,
{
    type Stream = WsStream;

    fn open(&mut self, url: &Url) -> Result<WsStream> {
        let (sender, receiver) =
            ewebsock::connect_with_wakeup(url.as_str(), Options::default(), self.wakeup.clone())
                .map_err(crate::Error::Websocket)?;
        Ok(WsStream { sender, receiver })
    }
}

/// A live websocket. Dropping it closes the connection.
pub struct WsStream {
    sender: WsSender,
    receiver: WsReceiver,
}

impl NotificationStream for WsStream {
    fn try_recv(&mut self) -> Option<StreamEvent> {
        loop {
            let event = self.receiver.try_recv()?;
            match event {
                WsEvent::Opened => return Some(StreamEvent::Opened),
                WsEvent::Closed => return Some(StreamEvent::Closed),
                WsEvent::Error(err) => return Some(StreamEvent::Error(err)),
                WsEvent::Message(msg) => match msg {
                    WsMessage::Text(text) => return Some(StreamEvent::Message(text)),
                    WsMessage::Ping(data) => {
                        // keepalive is handled here; pings never surface
                        debug!("pong");
                        self.sender.send(WsMessage::Pong(data));
                    }
                    _ => {}
                },
            }
        }
    }
}
