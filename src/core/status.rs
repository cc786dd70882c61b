//! Shared runtime status readable without entering the coordinator loop.
//!
//! [`Status`] mirrors the coordinator's externally visible state (running
//! flag, active topic filter, configured executable). Handles read it
//! synchronously; only the coordinator writes it.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mirror of coordinator state for synchronous reads.
///
/// Writes go through `pub(crate)` setters so the coordinator loop stays the
/// single writer; reads are cheap and lock-free for the running flag.
#[derive(Debug)]
pub struct Status {
    running: AtomicBool,
    topic: RwLock<String>,
    exec_path: RwLock<String>,
}

impl Status {
    pub(crate) fn new(topic: impl Into<String>, exec_path: impl Into<String>) -> Self {
        Self {
            running: AtomicBool::new(false),
            topic: RwLock::new(topic.into()),
            exec_path: RwLock::new(exec_path.into()),
        }
    }

    /// Whether the broker is considered running (process up and client connected).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The active subscription topic filter.
    pub fn topic(&self) -> String {
        self.topic
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The broker executable used for the next start.
    pub fn exec_path(&self) -> String {
        self.exec_path
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Updates the running flag. Returns `true` if the value changed.
    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel) != running
    }

    pub(crate) fn set_topic(&self, topic: &str) {
        let mut guard = self.topic.write().unwrap_or_else(|e| e.into_inner());
        *guard = topic.to_string();
    }

    pub(crate) fn set_exec_path(&self, path: &str) {
        let mut guard = self.exec_path.write().unwrap_or_else(|e| e.into_inner());
        *guard = path.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_running_reports_change() {
        let status = Status::new("#", "nanomq");
        assert!(!status.is_running());

        assert!(status.set_running(true), "false -> true should report change");
        assert!(!status.set_running(true), "true -> true should not");
        assert!(status.is_running());

        assert!(status.set_running(false));
        assert!(!status.is_running());
    }

    #[test]
    fn test_topic_and_exec_path_round_trip() {
        let status = Status::new("#", "nanomq");
        assert_eq!(status.topic(), "#");
        assert_eq!(status.exec_path(), "nanomq");

        status.set_topic("sensors/+/temp");
        status.set_exec_path("/usr/local/bin/nanomq");
        assert_eq!(status.topic(), "sensors/+/temp");
        assert_eq!(status.exec_path(), "/usr/local/bin/nanomq");
    }
}
