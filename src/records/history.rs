//! # HistoryStore: bounded message history with a lockable view.
//!
//! All received messages and all internally generated diagnostics land here.
//! The store keeps two newest-first sequences:
//!
//! ```text
//!                      ingest(topic, payload)
//!                              │
//!                     locked?  │
//!              ┌───── yes ─────┴───── no ──────┐
//!              ▼                               ▼
//!        PendingBuffer                      History
//!     (unbounded, newest-first)     (capped, newest-first)
//!              │                               ▲
//!              └────── unlock: flush ──────────┘
//!                 (oldest pending first, so the
//!                  union stays newest-first)
//! ```
//!
//! ## Rules
//! - History is **newest-first**: new records are prepended, the cap evicts
//!   from the back (oldest) immediately after an insert exceeds it.
//! - While the view is **locked**, every record (messages and diagnostics
//!   alike) goes into the pending buffer; history stays frozen.
//! - **Unlocking** drains the pending buffer oldest-first, prepending each
//!   record, so buffered records end up ahead of prior history in their
//!   chronological order and the union stays newest-first. The cap is
//!   enforced after the merge.
//! - `clear()` empties history only; a locked buffer survives it.
//! - Every record lives in exactly one container; nothing is dropped while
//!   locked, no matter how long the lock holds.
//! - Each mutation publishes its change notification synchronously, after
//!   the state is updated.

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::events::{Bus, Event, EventKind};

use super::record::{MessageRecord, SYSTEM_TRACE_TOPIC};

/// Interior state guarded by one lock so lock/flush transitions are atomic.
struct HistoryState {
    history: VecDeque<MessageRecord>,
    pending: VecDeque<MessageRecord>,
    locked: bool,
}

/// Bounded dual-buffer store for message records.
///
/// Shared between the coordinator loop (writes) and handles (reads).
/// Mutations publish [`Event`]s on the bus after the state change.
pub struct HistoryStore {
    inner: RwLock<HistoryState>,
    cap: usize,
    bus: Bus,
}

impl HistoryStore {
    /// Creates an empty, unlocked store with the given history cap (min 1).
    pub fn new(cap: usize, bus: Bus) -> Self {
        Self {
            inner: RwLock::new(HistoryState {
                history: VecDeque::new(),
                pending: VecDeque::new(),
                locked: false,
            }),
            cap: cap.max(1),
            bus,
        }
    }

    /// Records one message: prepends to history, or to the pending buffer
    /// while the view is locked.
    ///
    /// Publishes `HistoryChanged` (unlocked) or `BufferedCountChanged`
    /// (locked).
    pub async fn ingest(&self, topic: impl Into<String>, payload: impl Into<String>) {
        self.push(MessageRecord::new(topic, payload)).await;
    }

    /// Records one diagnostic on the reserved trace topic.
    ///
    /// Diagnostics obey the same locking and capacity rules as any other
    /// record.
    pub async fn trace(&self, text: impl Into<String>) {
        self.push(MessageRecord::new(SYSTEM_TRACE_TOPIC, text)).await;
    }

    async fn push(&self, rec: MessageRecord) {
        let ev = {
            let mut state = self.inner.write().await;
            if state.locked {
                state.pending.push_front(rec);
                Event::now(EventKind::BufferedCountChanged).with_count(state.pending.len())
            } else {
                state.history.push_front(rec);
                while state.history.len() > self.cap {
                    state.history.pop_back();
                }
                Event::now(EventKind::HistoryChanged)
            }
        };
        self.bus.publish(ev);
    }

    /// Empties the history. The pending buffer is untouched, so records
    /// buffered behind a locked view survive a clear.
    ///
    /// Publishes `HistoryChanged` unconditionally.
    pub async fn clear(&self) {
        {
            let mut state = self.inner.write().await;
            state.history.clear();
        }
        self.bus.publish(Event::now(EventKind::HistoryChanged));
    }

    /// Sets the view lock. A no-op when the value is unchanged.
    ///
    /// Publishes `ViewLockChanged`; unlocking with a non-empty buffer also
    /// flushes it (`BufferedCountChanged` then `HistoryChanged`).
    pub async fn set_locked(&self, locked: bool) {
        let events = {
            let mut state = self.inner.write().await;
            if state.locked == locked {
                return;
            }
            state.locked = locked;
            self.transition_events(&mut state, locked)
        };
        for ev in events {
            self.bus.publish(ev);
        }
    }

    /// Inverts the view lock and returns the new state.
    ///
    /// The read-invert-write happens under one write lock, so concurrent
    /// toggles cannot collapse into a no-op.
    pub async fn toggle_locked(&self) -> bool {
        let (locked, events) = {
            let mut state = self.inner.write().await;
            let locked = !state.locked;
            state.locked = locked;
            (locked, self.transition_events(&mut state, locked))
        };
        for ev in events {
            self.bus.publish(ev);
        }
        locked
    }

    /// Builds the notifications for a lock transition, flushing the pending
    /// buffer when the view just unlocked.
    fn transition_events(&self, state: &mut HistoryState, locked: bool) -> Vec<Event> {
        let mut events = vec![Event::now(EventKind::ViewLockChanged).with_flag(locked)];
        if !locked && !state.pending.is_empty() {
            // Drain oldest-first so each prepend lands the record ahead of
            // prior history but behind newer buffered ones.
            while let Some(rec) = state.pending.pop_back() {
                state.history.push_front(rec);
            }
            while state.history.len() > self.cap {
                state.history.pop_back();
            }
            events.push(Event::now(EventKind::BufferedCountChanged).with_count(0));
            events.push(Event::now(EventKind::HistoryChanged));
        }
        events
    }

    /// Returns a newest-first copy of the history.
    pub async fn snapshot(&self) -> Vec<MessageRecord> {
        let state = self.inner.read().await;
        state.history.iter().cloned().collect()
    }

    /// Number of records currently in the history.
    pub async fn len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    /// True when the history holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.history.is_empty()
    }

    /// Number of records held back by the locked view.
    pub async fn buffered_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    /// Current view-lock state.
    pub async fn is_locked(&self) -> bool {
        self.inner.read().await.locked
    }
}
