//! # Event subscribers for the broker runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Coordinator/HistoryStore ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                                   ┌─────────┬─────────┐
//!                                                                   ▼         ▼         ▼
//!                                                            [queue S1] [queue S2] ... [queue SN]
//!                                                                   │         │         │
//!                                                            worker S1  worker S2 ... worker SN
//!                                                                   │         │         │
//!                                                           sub.on_event(&Event) (per subscriber)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use brokervisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct MessageCounter;
//!
//! #[async_trait]
//! impl Subscribe for MessageCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::MessageReceived {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
