//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [running-changed] running=true
//! [message-received] topic=sensors/temp payload="21.5"
//! [history-changed]
//! [buffered-count-changed] count=3
//! [view-lock-changed] locked=true
//! [topic-changed] topic=sensors/#
//! [exec-path-changed] path=/usr/local/bin/nanomq
//! ```
//!
//! Not intended for production use - implement a custom [`Subscribe`] for
//! structured logging or metrics collection.

use async_trait::async_trait;

use super::Subscribe;
use crate::events::{Event, EventKind};

/// Simple stdout logging subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::RunningChanged => {
                println!("[running-changed] running={:?}", e.flag);
            }
            EventKind::HistoryChanged => {
                println!("[history-changed]");
            }
            EventKind::BufferedCountChanged => {
                if let Some(count) = e.count {
                    println!("[buffered-count-changed] count={count}");
                }
            }
            EventKind::ViewLockChanged => {
                println!("[view-lock-changed] locked={:?}", e.flag);
            }
            EventKind::MessageReceived => {
                if let (Some(topic), Some(payload)) = (&e.topic, &e.payload) {
                    println!("[message-received] topic={topic} payload={payload:?}");
                }
            }
            EventKind::TopicChanged => {
                if let Some(text) = &e.text {
                    println!("[topic-changed] topic={text}");
                }
            }
            EventKind::ExecPathChanged => {
                if let Some(text) = &e.text {
                    println!("[exec-path-changed] path={text}");
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
