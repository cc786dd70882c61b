//! Change notifications: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to change notifications emitted by the coordinator and
//! the history store.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Coordinator` (running flag, topic, exec path, messages),
//!   `HistoryStore` (history, buffered count, view lock).
//! - **Consumers**: the subscriber listener spawned by `Coordinator::run`
//!   (fans out to `SubscriberSet`), and any `BrokerHandle::events()` receiver.
//!
//! See the crate-level docs for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
