//! # Change notifications emitted by the coordinator and the history store.
//!
//! The [`EventKind`] enum classifies notifications across three categories:
//! - **Lifecycle events**: the observable running flag (running changed)
//! - **History events**: history contents, buffered count, view lock, messages
//! - **Settings events**: subscription topic and broker executable path
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! message topic/payload, changed text values, counts, and boolean flags.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use brokervisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::MessageReceived)
//!     .with_topic("sensors/temp")
//!     .with_payload("21.5");
//!
//! assert_eq!(ev.kind, EventKind::MessageReceived);
//! assert_eq!(ev.topic.as_deref(), Some("sensors/temp"));
//! assert_eq!(ev.payload.as_deref(), Some("21.5"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// The running flag flipped (true only after a successful subscription,
    /// false once the stop sequence completes).
    ///
    /// Sets:
    /// - `flag`: new running state
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RunningChanged,

    // === History events ===
    /// History contents changed (ingest, unlock flush, or clear).
    ///
    /// Observers re-read the snapshot; the event carries no delta.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    HistoryChanged,

    /// Number of records held back by a locked view changed.
    ///
    /// Sets:
    /// - `count`: current pending-buffer size
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    BufferedCountChanged,

    /// View lock toggled.
    ///
    /// Sets:
    /// - `flag`: new lock state
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ViewLockChanged,

    /// A message arrived from the wire (never emitted for diagnostics).
    ///
    /// Sets:
    /// - `topic`: message topic
    /// - `payload`: raw message payload
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    MessageReceived,

    // === Settings events ===
    /// Subscription topic filter changed.
    ///
    /// Sets:
    /// - `text`: new topic filter
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TopicChanged,

    /// Broker executable path changed.
    ///
    /// Sets:
    /// - `text`: new executable path
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ExecPathChanged,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for use in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RunningChanged => "running-changed",
            EventKind::HistoryChanged => "history-changed",
            EventKind::BufferedCountChanged => "buffered-count-changed",
            EventKind::ViewLockChanged => "view-lock-changed",
            EventKind::MessageReceived => "message-received",
            EventKind::TopicChanged => "topic-changed",
            EventKind::ExecPathChanged => "exec-path-changed",
        }
    }
}

/// Change notification with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Message topic, if applicable.
    pub topic: Option<Arc<str>>,
    /// Raw message payload, if applicable.
    pub payload: Option<Arc<str>>,
    /// Changed text value (topic filter, executable path).
    pub text: Option<Arc<str>>,
    /// Pending-buffer size (for `BufferedCountChanged`).
    pub count: Option<usize>,
    /// Boolean state (running flag, view lock).
    pub flag: Option<bool>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            topic: None,
            payload: None,
            text: None,
            count: None,
            flag: None,
            kind,
        }
    }

    /// Attaches a message topic.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a raw message payload.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Arc<str>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attaches a changed text value.
    #[inline]
    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a boolean state.
    #[inline]
    pub fn with_flag(mut self, flag: bool) -> Self {
        self.flag = Some(flag);
        self
    }
}
