//! # ReconnectingClient: stream consumer with a fixed reconnect delay.
//!
//! Keeps one connection to the hub's stream endpoint open for as long as the
//! runtime token is alive, decodes every frame, groups `new_report` payloads
//! and hands the result to a [`ReportConsumer`].
//!
//! ## Lifecycle
//! ```text
//! loop {
//!   ├─► state = Connecting
//!   ├─► connector.connect()
//!   │       ├─ Err ──► state = Disconnected, sleep(delay)
//!   │       └─ Ok  ──► state = Connected
//!   │                  pump frames until:
//!   │                    ├─ peer close / read error ─► close, Disconnected, sleep(delay)
//!   │                    ├─ reconnect()             ─► close, Disconnected, no sleep
//!   │                    └─ token cancelled         ─► close, Disconnected, exit
//!   └─ sleep is cut short by reconnect() and aborted by cancellation
//! }
//! ```
//!
//! ## Rules
//! - The delay is fixed: no growth, no jitter, no attempt limit.
//! - The previous connection is always closed before a new one is opened.
//! - `reconnect()` only tears down an established connection. Requested while
//!   disconnected or connecting, it is satisfied by the attempt in progress.
//! - A bad frame (invalid JSON, unknown schema version, consumer panic) drops
//!   that message only; the connection stays open.
//! - Every state change is published once, in order, on both the watch
//!   (current state) and the broadcast (transition history) channels.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::config::ClientConfig;
use crate::client::connector::{Connection, Connector, WsConnector};
use crate::client::state::ClientState;
use crate::consumers::ReportConsumer;
use crate::error::ClientError;
use crate::events::panic_message;
use crate::reports::{group_value, GroupedReport, Message};

/// Why the frame pump returned.
enum StreamEnd {
    Cancelled,
    Forced,
    Closed,
    Failed(ClientError),
}

/// Consumes the hub stream, reconnecting forever after a fixed delay.
pub struct ReconnectingClient {
    cfg: ClientConfig,
    connector: Arc<dyn Connector>,
    consumer: Arc<dyn ReportConsumer>,
    state: watch::Sender<ClientState>,
    transitions: broadcast::Sender<ClientState>,
    reconnect: Arc<Notify>,
}

impl ReconnectingClient {
    /// Creates a client that opens connections through `connector`.
    pub fn new(
        cfg: ClientConfig,
        connector: Arc<dyn Connector>,
        consumer: Arc<dyn ReportConsumer>,
    ) -> Self {
        let (state, _) = watch::channel(ClientState::Disconnected);
        let (transitions, _) = broadcast::channel(cfg.state_history_clamped());
        Self {
            cfg,
            connector,
            consumer,
            state,
            transitions,
            reconnect: Arc::new(Notify::new()),
        }
    }

    /// Creates a websocket client for `cfg.url`.
    pub fn websocket(cfg: ClientConfig, consumer: Arc<dyn ReportConsumer>) -> Self {
        let connector = Arc::new(WsConnector::new(cfg.url.clone()));
        Self::new(cfg, connector, consumer)
    }

    /// Returns a handle for observing and nudging this client.
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            state: self.state.subscribe(),
            transitions: self.transitions.clone(),
            reconnect: Arc::clone(&self.reconnect),
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// Runs the connect / stream / reconnect loop until `token` is cancelled.
    ///
    /// The final state is always [`ClientState::Disconnected`].
    pub async fn run(self, token: CancellationToken) {
        let delay = self.cfg.reconnect_delay;
        let endpoint = self.connector.endpoint().to_string();
        let mut attempt: u64 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }
            // A reconnect requested while not connected is satisfied by this attempt.
            let _ = self.reconnect.notified().now_or_never();

            attempt += 1;
            self.set_state(ClientState::Connecting);
            let connected = select! {
                res = self.connector.connect() => res,
                _ = token.cancelled() => break,
            };

            let retry_now = match connected {
                Ok(mut conn) => {
                    // So is one requested while this connect was in flight.
                    let _ = self.reconnect.notified().now_or_never();
                    self.set_state(ClientState::Connected);
                    info!(endpoint = %endpoint, attempt, "connected");

                    let end = self.pump(conn.as_mut(), &token).await;
                    conn.close().await;
                    self.set_state(ClientState::Disconnected);

                    match end {
                        StreamEnd::Cancelled => break,
                        StreamEnd::Forced => {
                            info!(endpoint = %endpoint, "reconnect requested");
                            true
                        }
                        StreamEnd::Closed => {
                            warn!(endpoint = %endpoint, delay_ms = delay.as_millis() as u64, "connection closed by peer");
                            false
                        }
                        StreamEnd::Failed(e) => {
                            warn!(
                                endpoint = %endpoint,
                                label = e.as_label(),
                                error = %e,
                                delay_ms = delay.as_millis() as u64,
                                "connection lost"
                            );
                            false
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ClientState::Disconnected);
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        label = e.as_label(),
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "connect failed"
                    );
                    false
                }
            };
            if retry_now {
                continue;
            }

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = self.reconnect.notified() => {
                    debug!(endpoint = %endpoint, "reconnect requested during delay");
                }
                _ = token.cancelled() => break,
            }
        }

        self.set_state(ClientState::Disconnected);
        info!(endpoint = %endpoint, "client stopped");
    }

    /// Reads frames until the connection ends, a reconnect is forced or the
    /// token is cancelled.
    async fn pump(&self, conn: &mut dyn Connection, token: &CancellationToken) -> StreamEnd {
        loop {
            let frame = select! {
                biased;
                _ = token.cancelled() => return StreamEnd::Cancelled,
                _ = self.reconnect.notified() => return StreamEnd::Forced,
                frame = conn.next_frame() => frame,
            };
            match frame {
                None => return StreamEnd::Closed,
                Some(Err(e)) => return StreamEnd::Failed(e),
                Some(Ok(text)) => self.dispatch(&text).await,
            }
        }
    }

    async fn dispatch(&self, frame: &str) {
        let report = match decode_frame(frame) {
            Ok(Some(report)) => report,
            Ok(None) => {
                debug!("ignoring message of unknown type");
                return;
            }
            Err(e) => {
                warn!(label = e.as_label(), error = %e.as_message(), "dropping message");
                return;
            }
        };

        let id = report.id.clone();
        let consumer = self.consumer.on_report(report);
        if let Err(panic) = AssertUnwindSafe(consumer).catch_unwind().await {
            error!(
                consumer = self.consumer.name(),
                report = %id,
                panic = %panic_message(&*panic),
                "consumer panicked"
            );
        }
    }

    fn set_state(&self, next: ClientState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            let _ = self.transitions.send(next);
            debug!(state = %next, "client state changed");
        }
    }
}

/// Decodes one stream frame.
///
/// Returns `Ok(None)` for message types this build does not know.
pub fn decode_frame(frame: &str) -> Result<Option<GroupedReport>, ClientError> {
    match serde_json::from_str::<Message<Value>>(frame)? {
        Message::NewReport { report } => Ok(Some(group_value(report)?)),
        Message::Unknown => Ok(None),
    }
}

/// Observer / control handle of a [`ReconnectingClient`].
#[derive(Clone)]
pub struct ClientHandle {
    state: watch::Receiver<ClientState>,
    transitions: broadcast::Sender<ClientState>,
    reconnect: Arc<Notify>,
}

impl ClientHandle {
    /// Current connection state.
    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Subscribes to state transitions from now on.
    pub fn transitions(&self) -> broadcast::Receiver<ClientState> {
        self.transitions.subscribe()
    }

    /// Closes the live connection (if any) and reconnects without waiting
    /// for the delay.
    pub fn reconnect(&self) {
        self.reconnect.notify_one();
    }

    /// Waits until the client reaches `target`.
    ///
    /// Returns `false` if the client was dropped first.
    pub async fn wait_for(&self, target: ClientState) -> bool {
        let mut state = self.state.clone();
        let reached = state.wait_for(|current| *current == target).await.is_ok();
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::ReportStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use ClientState::{Connected, Connecting, Disconnected};

    struct MockConnection {
        frames: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
    }

    /// Test-side ends of a [`MockConnection`].
    struct Remote {
        frames: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    fn mock_connection() -> (MockConnection, Remote) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            MockConnection {
                frames: rx,
                closed: closed.clone(),
            },
            Remote { frames: tx, closed },
        )
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn next_frame(&mut self) -> Option<Result<String, ClientError>> {
            self.frames.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Fails the first `failures` attempts, then hands out queued connections.
    /// Every attempt takes `latency` before it resolves.
    struct Scripted {
        failures: AtomicUsize,
        latency: Duration,
        connections: Mutex<VecDeque<MockConnection>>,
        attempts: Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(failures: usize, connections: Vec<MockConnection>) -> Arc<Self> {
            Self::slow(failures, connections, Duration::ZERO)
        }

        fn slow(failures: usize, connections: Vec<MockConnection>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicUsize::new(failures),
                latency,
                connections: Mutex::new(connections.into()),
                attempts: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connector for Scripted {
        async fn connect(&self) -> Result<Box<dyn Connection>, ClientError> {
            self.attempts.lock().unwrap().push(Instant::now());
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ClientError::Connect {
                    error: "connection refused".into(),
                });
            }
            match self.connections.lock().unwrap().pop_front() {
                Some(conn) => Ok(Box::new(conn)),
                None => Err(ClientError::Connect {
                    error: "script exhausted".into(),
                }),
            }
        }

        fn endpoint(&self) -> &str {
            "mock://hub"
        }
    }

    fn client(
        connector: Arc<Scripted>,
        consumer: Arc<dyn ReportConsumer>,
    ) -> ReconnectingClient {
        ReconnectingClient::new(ClientConfig::new("mock://hub"), connector, consumer)
    }

    fn frame(id: &str, minversion: u64) -> String {
        json!({
            "type": "new_report",
            "report": {
                "id": id,
                "minversion": minversion,
                "createdAt": "2024-05-01T12:00:00Z",
                "tests": [{ "name": "net/dial", "status": "success" }]
            }
        })
        .to_string()
    }

    fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
        let gap = later - earlier;
        assert!(
            gap >= expected && gap < expected + Duration::from_millis(5),
            "gap {gap:?}, expected {expected:?}"
        );
    }

    fn drain(rx: &mut broadcast::Receiver<ClientState>) -> Vec<ClientState> {
        let mut seen = Vec::new();
        while let Ok(state) = rx.try_recv() {
            seen.push(state);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_each_failure_with_fixed_delay() {
        let (conn, _remote) = mock_connection();
        let script = Scripted::new(3, vec![conn]);
        let client = client(script.clone(), Arc::new(ReportStore::new()));
        let handle = client.handle();
        let mut transitions = handle.transitions();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        assert!(handle.wait_for(Connected).await);

        let attempts = script.attempts();
        assert_eq!(attempts.len(), 4);
        for pair in attempts.windows(2) {
            assert_gap(pair[0], pair[1], Duration::from_secs(1));
        }
        assert_eq!(
            drain(&mut transitions),
            vec![
                Connecting,
                Disconnected,
                Connecting,
                Disconnected,
                Connecting,
                Disconnected,
                Connecting,
                Connected
            ]
        );

        token.cancel();
        task.await.unwrap();
        assert_eq!(handle.state(), Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_frames_do_not_close_connection() {
        struct Picky {
            store: ReportStore,
        }

        #[async_trait]
        impl ReportConsumer for Picky {
            async fn on_report(&self, report: GroupedReport) {
                if report.id == "boom" {
                    panic!("consumer failure");
                }
                self.store.add_report(report);
            }
        }

        let (conn, remote) = mock_connection();
        let script = Scripted::new(0, vec![conn]);
        let consumer = Arc::new(Picky {
            store: ReportStore::new(),
        });
        let mut changes = consumer.store.changes();
        let client = client(script.clone(), consumer.clone());
        let handle = client.handle();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        for text in [
            "not json".to_string(),
            json!({ "type": "new_report" }).to_string(),
            frame("too-new", 2),
            json!({ "type": "hello", "payload": 1 }).to_string(),
            frame("r1", 1),
            frame("boom", 1),
            frame("r2", 1),
        ] {
            remote.frames.send(text).unwrap();
        }

        changes.wait_for(|rev| *rev >= 2).await.unwrap();
        assert_eq!(consumer.store.ids(), vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(script.attempts().len(), 1);
        assert_eq!(handle.state(), Connected);
        assert!(!remote.closed.load(Ordering::SeqCst));

        token.cancel();
        task.await.unwrap();
        assert!(remote.closed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_close_waits_one_delay() {
        let (first, first_remote) = mock_connection();
        let (second, _second_remote) = mock_connection();
        let script = Scripted::new(0, vec![first, second]);
        let client = client(script.clone(), Arc::new(ReportStore::new()));
        let handle = client.handle();
        let mut transitions = handle.transitions();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        assert!(handle.wait_for(Connected).await);
        drop(first_remote.frames);

        assert_eq!(transitions.recv().await.unwrap(), Connecting);
        assert_eq!(transitions.recv().await.unwrap(), Connected);
        assert_eq!(transitions.recv().await.unwrap(), Disconnected);
        assert_eq!(transitions.recv().await.unwrap(), Connecting);
        assert_eq!(transitions.recv().await.unwrap(), Connected);
        assert!(first_remote.closed.load(Ordering::SeqCst));

        let attempts = script.attempts();
        assert_eq!(attempts.len(), 2);
        assert_gap(attempts[0], attempts[1], Duration::from_secs(1));

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_reconnect_closes_previous_connection_immediately() {
        let (first, first_remote) = mock_connection();
        let (second, second_remote) = mock_connection();
        let script = Scripted::new(0, vec![first, second]);
        let client = client(script.clone(), Arc::new(ReportStore::new()));
        let handle = client.handle();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        assert!(handle.wait_for(Connected).await);
        let mut transitions = handle.transitions();
        handle.reconnect();

        assert_eq!(transitions.recv().await.unwrap(), Disconnected);
        assert_eq!(transitions.recv().await.unwrap(), Connecting);
        assert_eq!(transitions.recv().await.unwrap(), Connected);

        assert!(first_remote.closed.load(Ordering::SeqCst));
        assert!(!second_remote.closed.load(Ordering::SeqCst));
        let attempts = script.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1] - attempts[0], Duration::ZERO);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_while_connecting_keeps_new_connection() {
        let (first, first_remote) = mock_connection();
        let (second, second_remote) = mock_connection();
        let script = Scripted::slow(0, vec![first, second], Duration::from_millis(100));
        let client = client(script.clone(), Arc::new(ReportStore::new()));
        let handle = client.handle();
        let mut transitions = handle.transitions();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        assert!(handle.wait_for(Connecting).await);
        handle.reconnect();
        assert!(handle.wait_for(Connected).await);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(script.attempts().len(), 1);
        assert_eq!(handle.state(), Connected);
        assert!(!first_remote.closed.load(Ordering::SeqCst));
        assert_eq!(drain(&mut transitions), vec![Connecting, Connected]);

        // A request made once connected still forces a fresh connection.
        handle.reconnect();
        assert_eq!(transitions.recv().await.unwrap(), Disconnected);
        assert_eq!(transitions.recv().await.unwrap(), Connecting);
        assert_eq!(transitions.recv().await.unwrap(), Connected);
        assert!(first_remote.closed.load(Ordering::SeqCst));
        assert!(!second_remote.closed.load(Ordering::SeqCst));
        assert_eq!(script.attempts().len(), 2);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_stops_client() {
        let script = Scripted::new(usize::MAX, Vec::new());
        let client = client(script.clone(), Arc::new(ReportStore::new()));
        let handle = client.handle();
        let token = CancellationToken::new();
        let task = client.spawn(token.clone());

        time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
        task.await.unwrap();

        assert_eq!(handle.state(), Disconnected);
        assert_eq!(script.attempts().len(), 3);
    }

    #[test]
    fn test_decode_frame() {
        let grouped = decode_frame(&frame("r1", 1)).unwrap().unwrap();
        assert_eq!(grouped.id, "r1");
        assert_eq!(grouped.tests.num_tests, 1);

        assert!(decode_frame(r#"{"type":"hello"}"#).unwrap().is_none());

        let err = decode_frame(&frame("r2", 2)).unwrap_err();
        assert_eq!(err.as_label(), "client_schema");
        assert_eq!(err.as_message(), "cannot parse report, minversion 2 > 1");

        let odd = json!({
            "type": "new_report",
            "report": {
                "id": "r3",
                "minversion": 1,
                "tests": [{ "name": "net/dial", "status": "unknown:4" }]
            }
        });
        let err = decode_frame(&odd.to_string()).unwrap_err();
        assert_eq!(err.as_label(), "client_schema");
        assert_eq!(
            err.as_message(),
            r#"cannot parse report, test "net/dial" has unknown status "unknown:4""#
        );

        let err = decode_frame("{").unwrap_err();
        assert_eq!(err.as_label(), "client_protocol");
    }
}
