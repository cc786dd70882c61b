//! # Message records: immutable snapshots of received messages.
//!
//! Every message entering the system (from the wire or generated internally)
//! becomes a [`MessageRecord`]: arrival timestamp, topic, raw payload, and a
//! structured-content rendering for payloads that parse as JSON.
//!
//! ## Rules
//! - Records are immutable after construction; containers own them exclusively.
//! - A payload counts as structured only when it parses as a JSON **object or
//!   array**; bare scalars and malformed payloads keep an empty pretty form.
//! - Diagnostics use the reserved topic [`SYSTEM_TRACE_TOPIC`]; nothing in the
//!   data model treats that topic specially.

use chrono::{DateTime, Local};

/// Reserved topic for internally generated diagnostic records.
pub const SYSTEM_TRACE_TOPIC: &str = "system_trace";

/// Renders a timestamp as `yyyy-MM-dd HH:mm:ss.fff` (millisecond precision).
///
/// ## Example
/// ```rust
/// use chrono::{Local, TimeZone};
/// use brokervisor::format_timestamp;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 3).unwrap();
/// assert_eq!(format_timestamp(at), "2024-03-07 09:05:03.000");
/// ```
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// One received (or internally generated) message.
#[derive(Clone, Debug)]
pub struct MessageRecord {
    /// Arrival timestamp (local wall clock).
    pub at: DateTime<Local>,
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw payload exactly as received.
    pub raw: String,
    /// True when the payload parsed as a JSON object or array.
    pub structured: bool,
    /// Indented JSON rendering of the payload (empty when not structured).
    pub pretty: String,
}

impl MessageRecord {
    /// Creates a record stamped with the current local time.
    ///
    /// The payload is parsed once, at construction. Only JSON objects and
    /// arrays count as structured; scalars and parse failures leave the
    /// record unstructured with an empty pretty form.
    pub fn new(topic: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (structured, pretty) = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
                (true, pretty)
            }
            _ => (false, String::new()),
        };

        Self {
            at: Local::now(),
            topic: topic.into(),
            raw,
            structured,
            pretty,
        }
    }

    /// Creates a diagnostic record on the reserved trace topic.
    pub fn trace(text: impl Into<String>) -> Self {
        Self::new(SYSTEM_TRACE_TOPIC, text)
    }

    /// True when the record is an internally generated diagnostic.
    #[inline]
    pub fn is_trace(&self) -> bool {
        self.topic == SYSTEM_TRACE_TOPIC
    }

    /// Arrival timestamp rendered as `yyyy-MM-dd HH:mm:ss.fff`.
    #[inline]
    pub fn formatted_at(&self) -> String {
        format_timestamp(self.at)
    }
}
