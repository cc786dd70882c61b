//! Broker child-process lifecycle.
//!
//! [`ProcessSupervisor`] owns the spawned broker: it starts the executable
//! with piped output, forwards every stdout/stderr line into the coordinator
//! loop as a [`ProcessEvent`], and stops the child politely (SIGTERM, then
//! kill after a grace period).
//!
//! ## Rules
//! - At most one child at a time; a second start is rejected with a
//!   diagnostic record instead of spawning.
//! - State transitions (`NotRunning -> Starting -> Running -> NotRunning`)
//!   are traced into the history exactly once per change.
//! - `stop` is idempotent and always reaps the child before returning.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::records::HistoryStore;

/// Lifecycle state of the supervised broker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessState {
    /// No child process exists.
    NotRunning,
    /// The executable is being spawned.
    Starting,
    /// The child process is alive.
    Running,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::NotRunning => write!(f, "NotRunning"),
            ProcessState::Starting => write!(f, "Starting"),
            ProcessState::Running => write!(f, "Running"),
        }
    }
}

/// One line of broker output, tagged by stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProcessEvent {
    Stdout(String),
    Stderr(String),
}

impl ProcessEvent {
    /// Renders the line as a history trace.
    pub(crate) fn trace_text(&self) -> String {
        match self {
            ProcessEvent::Stdout(line) => format!("Broker: {line}"),
            ProcessEvent::Stderr(line) => format!("Broker ERROR: {line}"),
        }
    }
}

/// Owns the broker child process and its output forwarding tasks.
pub(crate) struct ProcessSupervisor {
    state: ProcessState,
    child: Option<Child>,
    out_tx: mpsc::Sender<ProcessEvent>,
    stop_grace: Duration,
    history: Arc<HistoryStore>,
}

impl ProcessSupervisor {
    pub(crate) fn new(
        out_tx: mpsc::Sender<ProcessEvent>,
        stop_grace: Duration,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            state: ProcessState::NotRunning,
            child: None,
            out_tx,
            stop_grace,
            history,
        }
    }

    pub(crate) fn state(&self) -> ProcessState {
        self.state
    }

    /// Whether a child process is currently owned.
    pub(crate) fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawns the broker executable. Returns `true` when a child was started.
    ///
    /// Rejections (empty path, already running, spawn failure) are traced
    /// into the history and return `false`.
    pub(crate) async fn start(&mut self, path: &str) -> bool {
        if path.trim().is_empty() {
            self.history
                .trace("Cannot start broker: executable path is empty")
                .await;
            return false;
        }
        if self.child.is_some() {
            self.history.trace("Broker process already running").await;
            return false;
        }

        self.history
            .trace(format!("Starting MQTT broker using: {path}"))
            .await;
        self.transition(ProcessState::Starting).await;

        let mut command = Command::new(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.history
                    .trace(format!("Failed to start broker process: {err}"))
                    .await;
                self.transition(ProcessState::NotRunning).await;
                return false;
            }
        };

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, self.out_tx.clone(), ProcessEvent::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, self.out_tx.clone(), ProcessEvent::Stderr));
        }

        self.child = Some(child);
        self.transition(ProcessState::Running).await;
        true
    }

    /// Stops the child: SIGTERM first, SIGKILL once `stop_grace` expires.
    ///
    /// No-op when nothing is running. The child is reaped before returning.
    pub(crate) async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        terminate(&mut child);
        if timeout(self.stop_grace, child.wait()).await.is_err() {
            let _ = child.kill().await;
        }

        self.transition(ProcessState::NotRunning).await;
    }

    /// Resolves when the child exits on its own.
    ///
    /// Pends forever while no child exists, so it is safe as a `select!` arm.
    /// Observing an exit does not change state; call [`Self::on_exited`] for that.
    pub(crate) async fn wait(&mut self) -> Option<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await.ok(),
            None => std::future::pending().await,
        }
    }

    /// Records a spontaneous child exit observed via [`Self::wait`].
    pub(crate) async fn on_exited(&mut self) {
        self.child = None;
        self.transition(ProcessState::NotRunning).await;
    }

    async fn transition(&mut self, next: ProcessState) {
        if self.state == next {
            return;
        }
        self.state = next;
        self.history
            .trace(format!("Broker process state: {next}"))
            .await;
    }
}

/// Forwards non-empty output lines into the coordinator loop.
async fn forward_lines<R>(
    reader: R,
    tx: mpsc::Sender<ProcessEvent>,
    wrap: fn(String) -> ProcessEvent,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if tx.send(wrap(trimmed.to_string())).await.is_err() {
            return;
        }
    }
}

/// Asks the child to exit politely (SIGTERM on unix).
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            return;
        }
    }
    #[cfg(not(unix))]
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;

    fn history() -> Arc<HistoryStore> {
        Arc::new(HistoryStore::new(100, Bus::new(16)))
    }

    fn supervisor(
        stop_grace: Duration,
        history: Arc<HistoryStore>,
    ) -> (ProcessSupervisor, mpsc::Receiver<ProcessEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (ProcessSupervisor::new(tx, stop_grace, history), rx)
    }

    async fn traces(history: &HistoryStore) -> Vec<String> {
        history
            .snapshot()
            .await
            .into_iter()
            .filter(|r| r.is_trace())
            .map(|r| r.raw)
            .collect()
    }

    #[test]
    fn test_trace_text_tags_streams() {
        assert_eq!(
            ProcessEvent::Stdout("listening on 1883".to_string()).trace_text(),
            "Broker: listening on 1883"
        );
        assert_eq!(
            ProcessEvent::Stderr("bind failed".to_string()).trace_text(),
            "Broker ERROR: bind failed"
        );
    }

    #[tokio::test]
    async fn test_start_rejects_empty_path() {
        let history = history();
        let (mut sup, _rx) = supervisor(Duration::from_secs(1), history.clone());

        assert!(!sup.start("   ").await);
        assert!(!sup.is_running());
        assert_eq!(sup.state(), ProcessState::NotRunning);

        let traces = traces(&history).await;
        assert!(
            traces.contains(&"Cannot start broker: executable path is empty".to_string()),
            "missing diagnostic, got: {traces:?}"
        );
    }

    #[tokio::test]
    async fn test_start_traces_spawn_failure() {
        let history = history();
        let (mut sup, _rx) = supervisor(Duration::from_secs(1), history.clone());

        assert!(!sup.start("/definitely/not/a/real/broker").await);
        assert!(!sup.is_running());
        assert_eq!(sup.state(), ProcessState::NotRunning);

        let traces = traces(&history).await;
        assert!(
            traces
                .iter()
                .any(|t| t.starts_with("Failed to start broker process:")),
            "missing diagnostic, got: {traces:?}"
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
        async fn test_start_forwards_output_lines() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(
                &dir,
                "#!/bin/sh\necho started\necho oops >&2\nsleep 30\n",
            );

            let history = history();
            let (mut sup, mut rx) = supervisor(Duration::from_millis(200), history.clone());
            assert!(sup.start(&path).await);
            assert_eq!(sup.state(), ProcessState::Running);

            let mut got = Vec::new();
            for _ in 0..2 {
                let ev = timeout(Duration::from_secs(5), rx.recv())
                    .await
                    .expect("output line in time")
                    .expect("channel open");
                got.push(ev);
            }
            assert!(got.contains(&ProcessEvent::Stdout("started".to_string())));
            assert!(got.contains(&ProcessEvent::Stderr("oops".to_string())));

            sup.stop().await;
            assert!(!sup.is_running());
        }

        #[tokio::test]
        async fn test_stop_escalates_when_term_is_ignored() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(
                &dir,
                "#!/bin/sh\ntrap '' TERM\nwhile true; do sleep 0.1; done\n",
            );

            let history = history();
            let (mut sup, _rx) = supervisor(Duration::from_millis(200), history.clone());
            assert!(sup.start(&path).await);

            // Give the trap a moment to install before signalling.
            tokio::time::sleep(Duration::from_millis(200)).await;

            timeout(Duration::from_secs(5), sup.stop())
                .await
                .expect("stop must escalate and return");
            assert!(!sup.is_running());
            assert_eq!(sup.state(), ProcessState::NotRunning);
        }

        #[tokio::test]
        async fn test_second_start_is_rejected() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nsleep 30\n");

            let history = history();
            let (mut sup, _rx) = supervisor(Duration::from_millis(200), history.clone());
            assert!(sup.start(&path).await);
            assert!(!sup.start(&path).await);

            let traces = traces(&history).await;
            assert!(
                traces.contains(&"Broker process already running".to_string()),
                "missing diagnostic, got: {traces:?}"
            );

            sup.stop().await;
        }

        #[tokio::test]
        async fn test_wait_observes_spontaneous_exit() {
            let dir = TempDir::new().expect("tempdir");
            let path = script(&dir, "#!/bin/sh\nexit 7\n");

            let history = history();
            let (mut sup, _rx) = supervisor(Duration::from_millis(200), history.clone());
            assert!(sup.start(&path).await);

            let status = timeout(Duration::from_secs(5), sup.wait())
                .await
                .expect("exit observed in time")
                .expect("exit status available");
            assert_eq!(status.code(), Some(7));

            sup.on_exited().await;
            assert!(!sup.is_running());
            assert_eq!(sup.state(), ProcessState::NotRunning);

            let traces = traces(&history).await;
            assert!(
                traces.contains(&"Broker process state: NotRunning".to_string()),
                "missing state trace, got: {traces:?}"
            );
        }
    }
}
