//! Control surface for a running coordinator.
//!
//! [`BrokerHandle`] is a cheap, cloneable facade: commands are fire-and-forget
//! sends into the coordinator loop, state reads go straight to the shared
//! [`Status`] / [`HistoryStore`] without entering the loop.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use super::status::Status;
use crate::error::HandleError;
use crate::events::{Bus, Event};
use crate::records::{HistoryStore, MessageRecord};

/// Requests processed by the coordinator loop, one at a time, in order.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    /// Start the broker when stopped, stop it when running.
    ToggleBroker,
    /// Change the subscription topic filter.
    SetTopic(String),
    /// Change the broker executable used for the next start.
    SetExecPath(String),
    /// Lock or unlock the history view.
    SetViewLocked(bool),
    /// Invert the view lock.
    ToggleViewLock,
    /// Drop all visible history records.
    ClearHistory,
}

/// Cloneable handle to a running [`Coordinator`](super::Coordinator).
///
/// Command submission is asynchronous and returns once the request is queued;
/// effects become observable through [`BrokerHandle::events`] and the read
/// accessors.
#[derive(Clone)]
pub struct BrokerHandle {
    tx: mpsc::Sender<Command>,
    bus: Bus,
    history: Arc<HistoryStore>,
    status: Arc<Status>,
}

impl BrokerHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        bus: Bus,
        history: Arc<HistoryStore>,
        status: Arc<Status>,
    ) -> Self {
        Self {
            tx,
            bus,
            history,
            status,
        }
    }

    /// Starts the broker if it is stopped, stops it if it is running.
    pub async fn toggle_broker(&self) -> Result<(), HandleError> {
        self.submit(Command::ToggleBroker).await
    }

    /// Changes the subscription topic filter.
    ///
    /// While connected, the live subscription moves to the new filter.
    pub async fn set_topic(&self, topic: impl Into<String>) -> Result<(), HandleError> {
        self.submit(Command::SetTopic(topic.into())).await
    }

    /// Changes the broker executable. Takes effect on the next start.
    pub async fn set_exec_path(&self, path: impl Into<String>) -> Result<(), HandleError> {
        self.submit(Command::SetExecPath(path.into())).await
    }

    /// Locks or unlocks the history view.
    ///
    /// While locked, arriving messages accumulate in a pending buffer;
    /// unlocking flushes them into the visible history.
    pub async fn set_view_locked(&self, locked: bool) -> Result<(), HandleError> {
        self.submit(Command::SetViewLocked(locked)).await
    }

    /// Inverts the view lock.
    pub async fn toggle_view_lock(&self) -> Result<(), HandleError> {
        self.submit(Command::ToggleViewLock).await
    }

    /// Drops all visible history records (the pending buffer is untouched).
    pub async fn clear_history(&self) -> Result<(), HandleError> {
        self.submit(Command::ClearHistory).await
    }

    /// Whether the broker is running (process up and client connected).
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// The active subscription topic filter.
    pub fn topic(&self) -> String {
        self.status.topic()
    }

    /// The broker executable used for the next start.
    pub fn exec_path(&self) -> String {
        self.status.exec_path()
    }

    /// Snapshot of the visible history, newest record first.
    pub async fn history(&self) -> Vec<MessageRecord> {
        self.history.snapshot().await
    }

    /// Number of records waiting in the locked-view pending buffer.
    pub async fn buffered_count(&self) -> usize {
        self.history.buffered_count().await
    }

    /// Whether the history view is currently locked.
    pub async fn is_view_locked(&self) -> bool {
        self.history.is_locked().await
    }

    /// Subscribes to the runtime event stream.
    ///
    /// The receiver observes every [`Event`] published after this call; slow
    /// receivers may observe `Lagged` and skip older items.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn submit(&self, cmd: Command) -> Result<(), HandleError> {
        self.tx.send(cmd).await.map_err(|_| HandleError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (BrokerHandle, mpsc::Receiver<Command>, Arc<HistoryStore>) {
        let (tx, rx) = mpsc::channel(8);
        let bus = Bus::new(16);
        let history = Arc::new(HistoryStore::new(10, bus.clone()));
        let status = Arc::new(Status::new("#", "nanomq"));
        (BrokerHandle::new(tx, bus, history.clone(), status), rx, history)
    }

    #[tokio::test]
    async fn test_commands_arrive_in_order() {
        let (handle, mut rx, _history) = handle();

        handle.toggle_broker().await.expect("queued");
        handle.set_topic("a/b").await.expect("queued");
        handle.clear_history().await.expect("queued");

        assert!(matches!(rx.recv().await, Some(Command::ToggleBroker)));
        assert!(matches!(rx.recv().await, Some(Command::SetTopic(t)) if t == "a/b"));
        assert!(matches!(rx.recv().await, Some(Command::ClearHistory)));
    }

    #[tokio::test]
    async fn test_submit_after_loop_exit_reports_closed() {
        let (handle, rx, _history) = handle();
        drop(rx);

        let err = handle.toggle_broker().await.expect_err("loop is gone");
        assert_eq!(err, HandleError::Closed);
    }

    #[tokio::test]
    async fn test_reads_go_through_shared_state() {
        let (handle, _rx, history) = handle();

        assert!(!handle.is_running());
        assert_eq!(handle.topic(), "#");
        assert_eq!(handle.exec_path(), "nanomq");

        history.ingest("sensors/a", "1").await;
        let records = handle.history().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "sensors/a");
        assert_eq!(handle.buffered_count().await, 0);
        assert!(!handle.is_view_locked().await);
    }
}
