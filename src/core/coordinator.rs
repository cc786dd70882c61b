//! # Coordinator: one event loop that owns the broker lifecycle.
//!
//! The [`Coordinator`] is the single writer for all runtime state. It owns the
//! process supervisor and the MQTT session outright and serializes every
//! mutation by consuming commands and events one at a time.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   BrokerHandle ──── Command ─────────────► cmd_rx ────┐
//!   transport I/O task ── ClientEvent ─────► client_rx ─┤
//!   stdout/stderr readers ── ProcessEvent ─► proc_rx ───┼──► tokio::select! ──► handlers
//!   child exit ────────────────────────────► wait() ────┤
//!   connect deadline (armed on start) ─────► sleep ─────┤
//!   CancellationToken ─────────────────────► cancel ────┘
//!
//! Outputs:
//!   HistoryStore ── records + diagnostics, publishes change events
//!   Status       ── running/topic/exec_path mirrors for synchronous reads
//!   Bus ──► subscriber_listener ──► SubscriberSet::emit(&Event)
//! ```
//!
//! ## Start/stop sequencing
//! - Toggle while stopped: spawn the executable, then arm a connect deadline
//!   `connect_delay` in the future. The MQTT connect happens when it fires,
//!   giving the broker time to open its socket.
//! - Toggle while running: disarm any pending deadline, disconnect the
//!   client, stop the process (SIGTERM, then kill), clear the running flag.
//! - The running flag means "process up **and** subscription established":
//!   it is set only after a successful subscribe and cleared only by stop.
//!   A lost connection or a dead child leaves it set, matching the manual
//!   stop-to-recover contract.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use brokervisor::{BrokerConfig, Coordinator, LogWriter, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let coordinator = Coordinator::builder(BrokerConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let handle = coordinator.handle();
//!     let token = CancellationToken::new();
//!     let loop_task = tokio::spawn(coordinator.run(token.clone()));
//!
//!     handle.toggle_broker().await.expect("loop alive");
//!     // ... drive the runtime through `handle` ...
//!
//!     token.cancel();
//!     let _ = loop_task.await;
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::config::BrokerConfig;
use super::handle::{BrokerHandle, Command};
use super::process::{ProcessEvent, ProcessSupervisor};
use super::session::SessionController;
use super::status::Status;
use crate::client::{ClientEvent, RumqttTransport, Transport};
use crate::events::{Bus, Event, EventKind};
use crate::records::HistoryStore;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Coordinator`] with optional components.
pub struct CoordinatorBuilder {
    cfg: BrokerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    transport: Option<Arc<dyn Transport>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BrokerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            transport: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (running flag, history changes,
    /// messages, settings) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default `rumqttc` transport.
    ///
    /// Tests use this to drive the coordinator with an in-memory fake.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds and returns the coordinator.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// the event bus, the history store, the shared status mirror, the
    /// subscriber workers, and the internal channels.
    pub fn build(self) -> Coordinator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        let history = Arc::new(HistoryStore::new(self.cfg.history_cap_clamped(), bus.clone()));
        let status = Arc::new(Status::new(
            self.cfg.topic.clone(),
            self.cfg.exec_path.clone(),
        ));

        let queue = self.cfg.queue_capacity_clamped();
        let (cmd_tx, cmd_rx) = mpsc::channel(queue);
        let (client_tx, client_rx) = mpsc::channel(queue);
        let (proc_tx, proc_rx) = mpsc::channel(queue);

        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(RumqttTransport::new(
                self.cfg.host.clone(),
                self.cfg.port,
                self.cfg.username.clone(),
                self.cfg.password.clone(),
            ))
        });

        let process = ProcessSupervisor::new(proc_tx, self.cfg.stop_grace, history.clone());
        let session = SessionController::new(
            transport,
            self.cfg.topic.clone(),
            history.clone(),
            client_tx,
        );

        Coordinator {
            cfg: self.cfg,
            bus,
            subs,
            history,
            status,
            process,
            session,
            cmd_tx,
            cmd_rx,
            client_rx,
            proc_rx,
            connect_at: None,
        }
    }
}

/// Owns the broker process, the MQTT session, and the message history.
///
/// Constructed through [`Coordinator::builder`]; driven by [`Coordinator::run`].
pub struct Coordinator {
    cfg: BrokerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    history: Arc<HistoryStore>,
    status: Arc<Status>,
    process: ProcessSupervisor,
    session: SessionController,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
    client_rx: mpsc::Receiver<ClientEvent>,
    proc_rx: mpsc::Receiver<ProcessEvent>,
    connect_at: Option<Instant>,
}

impl Coordinator {
    /// Creates a builder with the given configuration.
    pub fn builder(cfg: BrokerConfig) -> CoordinatorBuilder {
        CoordinatorBuilder::new(cfg)
    }

    /// Creates a handle bound to this coordinator.
    ///
    /// Handles stay valid for the lifetime of [`Coordinator::run`]; commands
    /// submitted after the loop exits fail with `HandleError::Closed`.
    pub fn handle(&self) -> BrokerHandle {
        BrokerHandle::new(
            self.cmd_tx.clone(),
            self.bus.clone(),
            self.history.clone(),
            self.status.clone(),
        )
    }

    /// Runs the event loop until `token` is cancelled.
    ///
    /// On cancellation the broker is torn down (client disconnected, process
    /// stopped and reaped) and subscriber queues are drained before this
    /// returns.
    pub async fn run(mut self, token: CancellationToken) {
        // The listener outlives `token` so that teardown events published
        // below still reach subscribers.
        let listener_token = CancellationToken::new();
        let listener = self.subscriber_listener(&listener_token);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,

                Some(cmd) = self.cmd_rx.recv() => {
                    self.on_command(cmd).await;
                }

                Some(event) = self.client_rx.recv() => {
                    self.on_client_event(event).await;
                }

                Some(line) = self.proc_rx.recv() => {
                    self.history.trace(line.trace_text()).await;
                }

                _ = self.process.wait(), if self.process.is_running() => {
                    // Spontaneous exit. The connect deadline stays armed: the
                    // attempt will fail and report through the history.
                    self.process.on_exited().await;
                }

                _ = Self::sleep_until(self.connect_at), if self.connect_at.is_some() => {
                    self.connect_at = None;
                    self.session.connect().await;
                }
            }
        }

        if self.status.is_running() || self.process.is_running() {
            self.stop_broker().await;
        }

        listener_token.cancel();
        let _ = listener.await;
        if let Ok(subs) = Arc::try_unwrap(self.subs) {
            subs.shutdown().await;
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// Runs until `token` is cancelled, then delivers whatever was already
    /// published before exiting.
    fn subscriber_listener(&self, token: &CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        })
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::ToggleBroker => {
                if self.status.is_running() {
                    self.stop_broker().await;
                } else {
                    self.start_broker().await;
                }
            }
            Command::SetTopic(topic) => {
                if self.session.set_topic(&topic).await {
                    self.status.set_topic(&topic);
                    self.bus
                        .publish(Event::now(EventKind::TopicChanged).with_text(topic));
                }
            }
            Command::SetExecPath(path) => {
                if self.status.exec_path() == path {
                    return;
                }
                self.status.set_exec_path(&path);
                self.history
                    .trace(format!("Broker executable changed to: {path}"))
                    .await;
                self.bus
                    .publish(Event::now(EventKind::ExecPathChanged).with_text(path));
            }
            Command::SetViewLocked(locked) => {
                self.history.set_locked(locked).await;
            }
            Command::ToggleViewLock => {
                self.history.toggle_locked().await;
            }
            Command::ClearHistory => {
                self.history.clear().await;
            }
        }
    }

    async fn on_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected => {
                if self.session.on_connected().await {
                    self.set_running(true);
                }
            }
            ClientEvent::Disconnected => {
                // Session loss does not clear the running flag; only an
                // explicit stop does.
                self.session.on_disconnected().await;
            }
            ClientEvent::Message { topic, payload } => {
                self.history.ingest(topic.clone(), payload.clone()).await;
                self.bus.publish(
                    Event::now(EventKind::MessageReceived)
                        .with_topic(topic)
                        .with_payload(payload),
                );
            }
            ClientEvent::Error { code } => {
                self.session.on_error(code).await;
            }
        }
    }

    async fn start_broker(&mut self) {
        let path = self.status.exec_path();
        if self.process.start(&path).await {
            self.connect_at = Some(Instant::now() + self.cfg.connect_delay);
        }
    }

    async fn stop_broker(&mut self) {
        self.history.trace("Stopping MQTT broker").await;
        self.connect_at = None;
        self.session.disconnect().await;
        self.process.stop().await;
        self.set_running(false);
    }

    fn set_running(&self, running: bool) {
        if self.status.set_running(running) {
            self.bus
                .publish(Event::now(EventKind::RunningChanged).with_flag(running));
        }
    }

    async fn sleep_until(deadline: Option<Instant>) {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    /// Records transport calls and lets the test inject client events.
    #[derive(Default)]
    struct ScriptedTransport {
        calls: Mutex<Vec<String>>,
        events: Mutex<Option<mpsc::Sender<ClientEvent>>>,
        fail_subscribe: AtomicBool,
    }

    impl ScriptedTransport {
        fn record(&self, call: String) {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(call);
        }

        fn has_call(&self, call: &str) -> bool {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .any(|c| c == call)
        }

        async fn push(&self, ev: ClientEvent) {
            let tx = self
                .events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .expect("transport connected");
            tx.send(ev).await.expect("coordinator loop alive");
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), TransportError> {
            self.record("connect".to_string());
            *self.events.lock().unwrap_or_else(|e| e.into_inner()) = Some(events);
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.record("disconnect".to_string());
            Ok(())
        }

        async fn subscribe(&self, filter: &str, qos: u8) -> Result<(), TransportError> {
            self.record(format!("subscribe {filter} qos={qos}"));
            if self.fail_subscribe.load(Ordering::Relaxed) {
                return Err(TransportError::Client("refused".to_string()));
            }
            Ok(())
        }

        async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError> {
            self.record(format!("unsubscribe {filter}"));
            Ok(())
        }
    }

    /// Collects event kinds seen through the subscriber fan-out.
    #[derive(Default)]
    struct RecordingSubscriber {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait::async_trait]
    impl Subscribe for RecordingSubscriber {
        async fn on_event(&self, event: &Event) {
            self.seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Harness {
        handle: BrokerHandle,
        transport: Arc<ScriptedTransport>,
        token: CancellationToken,
        join: JoinHandle<()>,
    }

    impl Harness {
        fn spawn(cfg: BrokerConfig) -> Self {
            let transport = Arc::new(ScriptedTransport::default());
            let coordinator = Coordinator::builder(cfg)
                .with_transport(transport.clone() as Arc<dyn Transport>)
                .build();
            let handle = coordinator.handle();
            let token = CancellationToken::new();
            let join = tokio::spawn(coordinator.run(token.clone()));
            Self {
                handle,
                transport,
                token,
                join,
            }
        }

        async fn shutdown(self) {
            self.token.cancel();
            timeout(Duration::from_secs(10), self.join)
                .await
                .expect("loop exits in time")
                .expect("loop task joins");
        }
    }

    fn config(exec_path: &str, connect_delay: Duration) -> BrokerConfig {
        BrokerConfig {
            exec_path: exec_path.to_string(),
            connect_delay,
            stop_grace: Duration::from_millis(500),
            ..BrokerConfig::default()
        }
    }

    async fn eventually(what: &str, f: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !f() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn eventually_trace(handle: &BrokerHandle, needle: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let found = handle
                .history()
                .await
                .iter()
                .any(|r| r.is_trace() && r.raw == needle);
            if found {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for trace: {needle}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn next_event_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event in time")
                .expect("bus open");
            if ev.kind == kind {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn test_settings_commands_update_state_and_publish() {
        let harness = Harness::spawn(config("nanomq", Duration::from_secs(60)));
        let mut rx = harness.handle.events();

        harness.handle.set_topic("sensors/#").await.expect("queued");
        let ev = next_event_of(&mut rx, EventKind::TopicChanged).await;
        assert_eq!(ev.text.as_deref(), Some("sensors/#"));
        assert_eq!(harness.handle.topic(), "sensors/#");

        harness
            .handle
            .set_exec_path("/usr/local/bin/nanomq")
            .await
            .expect("queued");
        let ev = next_event_of(&mut rx, EventKind::ExecPathChanged).await;
        assert_eq!(ev.text.as_deref(), Some("/usr/local/bin/nanomq"));
        assert_eq!(harness.handle.exec_path(), "/usr/local/bin/nanomq");
        eventually_trace(
            &harness.handle,
            "Broker executable changed to: /usr/local/bin/nanomq",
        )
        .await;

        // Unchanged values are ignored: the next event must be the topic
        // change below, not a duplicate path change.
        harness
            .handle
            .set_exec_path("/usr/local/bin/nanomq")
            .await
            .expect("queued");
        harness.handle.set_topic("other/#").await.expect("queued");
        let ev = next_event_of(&mut rx, EventKind::TopicChanged).await;
        assert_eq!(ev.text.as_deref(), Some("other/#"));

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_flushes_subscribers_before_returning() {
        let recorder = Arc::new(RecordingSubscriber::default());
        let transport = Arc::new(ScriptedTransport::default());
        let coordinator = Coordinator::builder(config("nanomq", Duration::from_secs(60)))
            .with_transport(transport as Arc<dyn Transport>)
            .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
            .build();
        let handle = coordinator.handle();
        let token = CancellationToken::new();
        let join = tokio::spawn(coordinator.run(token.clone()));

        handle.set_topic("sensors/#").await.expect("queued");
        eventually("topic applied", || handle.topic() == "sensors/#").await;

        // Cancelling immediately must not lose the event: run() forwards
        // what is already on the bus and joins the workers before exiting.
        token.cancel();
        timeout(Duration::from_secs(10), join)
            .await
            .expect("loop exits in time")
            .expect("loop task joins");

        assert!(
            recorder
                .seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(&EventKind::TopicChanged)
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("fake-broker.sh");
            std::fs::write(&path, body).expect("write script");
            let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).expect("chmod script");
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn test_toggle_runs_full_start_and_stop_sequence() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nsleep 30\n");
            let harness = Harness::spawn(config(&path, Duration::from_millis(20)));
            let mut rx = harness.handle.events();

            harness.handle.toggle_broker().await.expect("queued");
            eventually("connect call", || harness.transport.has_call("connect")).await;

            harness.transport.push(ClientEvent::Connected).await;
            let ev = next_event_of(&mut rx, EventKind::RunningChanged).await;
            assert_eq!(ev.flag, Some(true));
            assert!(harness.handle.is_running());
            assert!(harness.transport.has_call("subscribe # qos=0"));

            eventually_trace(&harness.handle, "MQTT client connected to broker").await;
            eventually_trace(&harness.handle, "Subscribed to MQTT topic: #").await;

            // Messages arriving over the wire land in the history and on the bus.
            harness
                .transport
                .push(ClientEvent::Message {
                    topic: "sensors/temp".to_string(),
                    payload: "21.5".to_string(),
                })
                .await;
            let ev = next_event_of(&mut rx, EventKind::MessageReceived).await;
            assert_eq!(ev.topic.as_deref(), Some("sensors/temp"));
            // Ingest completes before the bus publish, so the record is visible.
            let records = harness.handle.history().await;
            assert!(records.iter().any(|r| r.topic == "sensors/temp"));

            harness.handle.toggle_broker().await.expect("queued");
            let ev = next_event_of(&mut rx, EventKind::RunningChanged).await;
            assert_eq!(ev.flag, Some(false));
            assert!(!harness.handle.is_running());
            assert!(harness.transport.has_call("unsubscribe #"));
            assert!(harness.transport.has_call("disconnect"));
            eventually_trace(&harness.handle, "Stopping MQTT broker").await;

            harness.shutdown().await;
        }

        #[tokio::test]
        async fn test_cancel_before_deadline_suppresses_connect() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nsleep 30\n");
            let harness = Harness::spawn(config(&path, Duration::from_secs(60)));

            harness.handle.toggle_broker().await.expect("queued");
            eventually_trace(&harness.handle, "Broker process state: Running").await;

            let handle = harness.handle.clone();
            let transport = harness.transport.clone();
            harness.shutdown().await;

            // Teardown stopped the process without ever connecting.
            assert!(!transport.has_call("connect"));
            let records = handle.history().await;
            assert!(
                records
                    .iter()
                    .any(|r| r.is_trace() && r.raw == "Stopping MQTT broker"),
                "teardown must run the stop sequence"
            );
        }

        #[tokio::test]
        async fn test_subscribe_failure_leaves_running_flag_clear() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nsleep 30\n");
            let harness = Harness::spawn(config(&path, Duration::from_millis(20)));
            harness
                .transport
                .fail_subscribe
                .store(true, Ordering::Relaxed);

            harness.handle.toggle_broker().await.expect("queued");
            eventually("connect call", || harness.transport.has_call("connect")).await;
            harness.transport.push(ClientEvent::Connected).await;

            eventually_trace(&harness.handle, "Failed to subscribe to MQTT topic: #").await;
            assert!(!harness.handle.is_running());

            harness.shutdown().await;
        }

        #[tokio::test]
        async fn test_spontaneous_exit_keeps_connect_deadline_armed() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nexit 0\n");
            let harness = Harness::spawn(config(&path, Duration::from_millis(100)));

            harness.handle.toggle_broker().await.expect("queued");

            // The child dies immediately; the loop records the exit, and the
            // armed deadline still fires a connect attempt afterwards.
            eventually_trace(&harness.handle, "Broker process state: NotRunning").await;
            eventually("connect call", || harness.transport.has_call("connect")).await;
            eventually_trace(&harness.handle, "Connecting to MQTT broker").await;

            harness.shutdown().await;
        }

        #[tokio::test]
        async fn test_view_lock_buffers_messages_until_unlock() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nsleep 30\n");
            let harness = Harness::spawn(config(&path, Duration::from_millis(20)));
            let mut rx = harness.handle.events();

            harness.handle.toggle_broker().await.expect("queued");
            eventually("connect call", || harness.transport.has_call("connect")).await;
            harness.transport.push(ClientEvent::Connected).await;
            next_event_of(&mut rx, EventKind::RunningChanged).await;

            harness.handle.set_view_locked(true).await.expect("queued");
            let ev = next_event_of(&mut rx, EventKind::ViewLockChanged).await;
            assert_eq!(ev.flag, Some(true));

            let visible_before = harness.handle.history().await.len();
            harness
                .transport
                .push(ClientEvent::Message {
                    topic: "a".to_string(),
                    payload: "1".to_string(),
                })
                .await;
            let ev = next_event_of(&mut rx, EventKind::BufferedCountChanged).await;
            assert_eq!(ev.count, Some(1));
            assert_eq!(harness.handle.history().await.len(), visible_before);
            assert_eq!(harness.handle.buffered_count().await, 1);

            harness.handle.toggle_view_lock().await.expect("queued");
            let ev = next_event_of(&mut rx, EventKind::ViewLockChanged).await;
            assert_eq!(ev.flag, Some(false));
            // The flush happens under the store's write lock before the
            // transition is published, so the merge is already visible.
            assert_eq!(harness.handle.buffered_count().await, 0);
            let records = harness.handle.history().await;
            assert!(records.iter().any(|r| r.topic == "a"));

            harness.shutdown().await;
        }
    }
}
