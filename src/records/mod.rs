//! Message data model: records and the bounded history store.
//!
//! ## Contents
//! - [`MessageRecord`] immutable message snapshot with structured-JSON detection
//! - [`HistoryStore`] newest-first capped history with a lockable view
//! - [`SYSTEM_TRACE_TOPIC`] reserved topic for internal diagnostics
//! - [`format_timestamp`] millisecond display format for record timestamps

mod history;
mod record;

pub use history::HistoryStore;
pub use record::{MessageRecord, SYSTEM_TRACE_TOPIC, format_timestamp};
