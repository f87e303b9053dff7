//! End-to-end delivery scenarios against the public service API, with
//! scripted transport, pull and backend doubles.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cropguard::notifications::{
    NotificationBackend, NotificationService, NotificationStream, PullClient, PullResult,
    StreamConnector, StreamEvent, RECONNECT_BASE_DELAY,
};
use cropguard::{ApiConfig, ConnectionStatus, NotificationRecord};
use pretty_assertions::assert_eq;
use url::Url;

#[derive(Clone, Default)]
struct Script {
    events: Rc<RefCell<VecDeque<StreamEvent>>>,
    open_attempts: Rc<Cell<usize>>,
    fail_next_open: Rc<Cell<bool>>,
}

impl Script {
    fn push(&self, event: StreamEvent) {
        self.events.borrow_mut().push_back(event);
    }

    fn open_attempts(&self) -> usize {
        self.open_attempts.get()
    }
}

struct ScriptedConnector {
    script: Script,
}

impl StreamConnector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn open(&mut self, _url: &Url) -> cropguard::Result<ScriptedStream> {
        self.script.open_attempts.set(self.script.open_attempts.get() + 1);
        if self.script.fail_next_open.take() {
            return Err(cropguard::Error::Websocket("connection refused".into()));
        }
        Ok(ScriptedStream {
            script: self.script.clone(),
        })
    }
}

struct ScriptedStream {
    script: Script,
}

impl NotificationStream for ScriptedStream {
    fn try_recv(&mut self) -> Option<StreamEvent> {
        self.script.events.borrow_mut().pop_front()
    }
}

#[derive(Clone, Default)]
struct ScriptedPull {
    responses: Rc<RefCell<VecDeque<PullResult>>>,
    pulls: Rc<Cell<usize>>,
}

impl ScriptedPull {
    fn queue(&self, result: PullResult) {
        self.responses.borrow_mut().push_back(result);
    }
}

impl PullClient for ScriptedPull {
    fn pull(&self, _user_id: &str, _limit: usize, on_done: Box<dyn FnOnce(PullResult) + Send>) {
        self.pulls.set(self.pulls.get() + 1);
        let result = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]));
        on_done(result);
    }
}

#[derive(Clone, Default)]
struct CapturingBackend {
    alerts: Rc<RefCell<Vec<(String, String)>>>,
}

impl NotificationBackend for CapturingBackend {
    fn send_notification(&self, title: &str, body: &str) {
        self.alerts
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
    }
}

struct Harness {
    service: NotificationService<ScriptedConnector, ScriptedPull, CapturingBackend>,
    script: Script,
    pull: ScriptedPull,
    alerts: Rc<RefCell<Vec<(String, String)>>>,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let script = Script::default();
    let pull = ScriptedPull::default();
    let backend = CapturingBackend::default();
    let alerts = backend.alerts.clone();
    let config = ApiConfig::new("https://api.cropguard.example").unwrap();
    let service = NotificationService::new(
        config,
        ScriptedConnector {
            script: script.clone(),
        },
        pull.clone(),
        backend,
    );

    Harness {
        service,
        script,
        pull,
        alerts,
    }
}

fn record(id: &str) -> NotificationRecord {
    NotificationRecord {
        id: id.into(),
        title: "Weather".into(),
        body: "Rain expected".into(),
        ..Default::default()
    }
}

/// A stream message becomes exactly one alert with its own title and body.
#[test]
fn stream_message_schedules_one_alert() {
    let mut h = harness();
    let now = Instant::now();

    h.service.connect("u1", now);
    h.script.push(StreamEvent::Opened);
    h.script
        .push(StreamEvent::Message(
            r#"{"id":"n1","title":"Weather","body":"Rain expected"}"#.into(),
        ));
    h.service.tick(now);

    assert_eq!(
        h.alerts.borrow().as_slice(),
        &[("Weather".to_string(), "Rain expected".to_string())]
    );
    assert_eq!(h.service.status(), ConnectionStatus::Connected);
}

/// A drop at t=0 schedules a reconnect at t=3000ms; when that attempt
/// fails immediately, the next lands at t=9000ms from the drop.
#[test]
fn reconnect_schedule_after_drop() {
    let mut h = harness();
    let start = Instant::now();

    h.service.connect("u1", start);
    assert_eq!(h.script.open_attempts(), 1);

    // transport closes unexpectedly at t=0
    h.script.push(StreamEvent::Opened);
    h.script.push(StreamEvent::Closed);
    h.service.tick(start);
    assert_eq!(h.service.status(), ConnectionStatus::ReconnectPending);

    // nothing fires inside the first delay window
    h.service.tick(start + RECONNECT_BASE_DELAY - Duration::from_millis(1));
    assert_eq!(h.script.open_attempts(), 1);

    // attempt 1 at t=3000, failing to even open
    h.script.fail_next_open.set(true);
    h.service.tick(start + RECONNECT_BASE_DELAY);
    assert_eq!(h.script.open_attempts(), 2);

    // attempt 2 is due 6000ms later, 9000ms from the original drop
    h.service.tick(start + Duration::from_millis(8999));
    assert_eq!(h.script.open_attempts(), 2);
    h.service.tick(start + Duration::from_millis(9000));
    assert_eq!(h.script.open_attempts(), 3);
}

/// Disconnecting while a reconnect is pending means no connection
/// attempt occurs when the deadline passes.
#[test]
fn disconnect_cancels_scheduled_reconnect() {
    let mut h = harness();
    let start = Instant::now();

    h.service.connect("u1", start);
    h.script.push(StreamEvent::Opened);
    h.script.push(StreamEvent::Closed);
    h.service.tick(start);
    assert_eq!(h.script.open_attempts(), 1);

    h.service.disconnect();
    assert!(!h.service.is_running());

    h.service.tick(start + Duration::from_millis(3000));
    h.service.tick(start + Duration::from_millis(30_000));
    assert_eq!(h.script.open_attempts(), 1);
    assert_eq!(h.service.status(), ConnectionStatus::Disconnected);
}

/// The same notification id arriving over the stream and a concurrent
/// poll tick alerts exactly once.
#[test]
fn duplicate_across_channels_alerts_once() {
    let mut h = harness();
    let now = Instant::now();

    h.pull.queue(Ok(vec![record("n7")]));
    h.service.connect("u1", now);
    h.script.push(StreamEvent::Opened);
    h.script
        .push(StreamEvent::Message(
            r#"{"id":"n7","title":"Weather","body":"Rain expected"}"#.into(),
        ));

    // first tick: stream delivers n7 and the poller issues its pull;
    // second tick: the poll response drains and must be suppressed
    h.service.tick(now);
    h.service.tick(now);

    assert_eq!(h.alerts.borrow().len(), 1);
}

/// The reverse interleaving: poll delivers first, the stream copy is the
/// duplicate.
#[test]
fn duplicate_from_stream_after_poll_is_suppressed() {
    let mut h = harness();
    let now = Instant::now();

    h.pull.queue(Ok(vec![record("n7")]));
    h.service.connect("u1", now);
    h.script.push(StreamEvent::Opened);
    h.service.tick(now); // pull issued
    h.service.tick(now); // poll response delivered

    h.script
        .push(StreamEvent::Message(
            r#"{"id":"n7","title":"Weather","body":"Rain expected"}"#.into(),
        ));
    h.service.tick(now);

    assert_eq!(h.alerts.borrow().len(), 1);
}

/// Distinct records from both channels all surface.
#[test]
fn both_channels_deliver_distinct_records() {
    let mut h = harness();
    let now = Instant::now();

    h.pull.queue(Ok(vec![record("n1"), record("n2")]));
    h.service.connect("u1", now);
    h.script.push(StreamEvent::Opened);
    h.script
        .push(StreamEvent::Message(
            r#"{"id":"n3","title":"Claim","body":"Payout approved"}"#.into(),
        ));

    h.service.tick(now);
    h.service.tick(now);

    assert_eq!(h.alerts.borrow().len(), 3);
}

/// A new identity tears down the old user's channel and starts fresh.
#[test]
fn identity_change_recreates_the_channel() {
    let mut h = harness();
    let now = Instant::now();

    h.service.connect("u1", now);
    h.script.push(StreamEvent::Opened);
    h.service.tick(now);
    assert_eq!(h.service.status(), ConnectionStatus::Connected);

    h.service.connect("u2", now);
    assert_eq!(h.script.open_attempts(), 2);
    assert_eq!(h.service.status(), ConnectionStatus::Connecting);

    h.script.push(StreamEvent::Opened);
    h.service.tick(now);
    assert_eq!(h.service.status(), ConnectionStatus::Connected);
    assert!(h.service.is_running());
}
