//! Error types used at the crate's fallible seams.
//!
//! This module defines two main error enums:
//!
//! - [`TransportError`] — errors raised by the wire-level MQTT transport.
//! - [`HandleError`] — errors raised when submitting commands through a handle.
//!
//! Everything else in the crate is deliberately non-fatal: failed subscribes,
//! dropped connections, and rejected start/stop requests surface as diagnostic
//! records in the message history rather than as `Err` values.

use thiserror::Error;

/// # Errors produced by the MQTT transport.
///
/// These represent failures of individual transport operations (connect,
/// subscribe, unsubscribe, disconnect). The coordinator converts them into
/// diagnostic history records; they never abort the event loop.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// An operation was issued while no session is established.
    #[error("no active MQTT session")]
    NoSession,

    /// The underlying client rejected or failed the request.
    #[error("mqtt client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use brokervisor::TransportError;
    ///
    /// let err = TransportError::NoSession;
    /// assert_eq!(err.as_label(), "transport_no_session");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::NoSession => "transport_no_session",
            TransportError::Client(_) => "transport_client",
        }
    }
}

/// # Errors produced when submitting commands through a handle.
///
/// Commands are fire-and-forget sends into the coordinator loop, so the
/// only possible failure is the loop no longer running.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The coordinator loop has exited and no longer accepts commands.
    #[error("coordinator loop closed")]
    Closed,
}

impl HandleError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use brokervisor::HandleError;
    ///
    /// assert_eq!(HandleError::Closed.as_label(), "handle_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandleError::Closed => "handle_closed",
        }
    }
}
