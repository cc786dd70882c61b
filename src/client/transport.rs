//! Transport seam between the coordinator and the wire-level MQTT client.
//!
//! The coordinator never talks to an MQTT library directly. It drives a
//! [`Transport`] and consumes the [`ClientEvent`]s the transport pushes back
//! through a channel. This keeps the session state machine testable with an
//! in-memory fake and keeps the wire library swappable.
//!
//! ## Rules
//! - The transport owns the network session and its background I/O task.
//! - `connect` is asynchronous: success means the session was *started*, not
//!   that the broker accepted us. Acceptance arrives later as
//!   [`ClientEvent::Connected`].
//! - A transport reports loss of connection exactly once per session via
//!   [`ClientEvent::Disconnected`]; it never reconnects on its own.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Quality-of-service level 0: fire-and-forget delivery.
///
/// The history pipeline tolerates loss and never needs acknowledged delivery,
/// so every subscription in this crate uses this level.
pub const AT_MOST_ONCE: u8 = 0;

/// Events pushed from the transport's I/O task into the coordinator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The broker accepted the connection.
    Connected,
    /// The session ended (clean disconnect, broker loss, or fatal I/O error).
    Disconnected,
    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message was published on.
        topic: String,
        /// Payload decoded as UTF-8 (lossy).
        payload: String,
    },
    /// The transport hit an error worth surfacing to the user.
    Error {
        /// Stable classification of the failure.
        code: ErrorCode,
    },
}

/// Stable classification of client-side MQTT failures.
///
/// Codes 0-5 mirror the MQTT 3.1.1 CONNACK return codes; codes 256+ cover
/// transport-level failures that have no CONNACK equivalent. [`ErrorCode::Other`]
/// preserves unrecognized numeric codes so they survive a round trip through
/// [`ErrorCode::code`] / [`ErrorCode::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error occurred.
    NoError,
    /// The broker does not support the requested protocol version.
    InvalidProtocolVersion,
    /// The broker rejected the client identifier.
    IdRejected,
    /// The broker is unavailable.
    ServerUnavailable,
    /// The broker rejected the supplied credentials.
    BadUsernameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// The underlying network transport failed.
    TransportInvalid,
    /// The broker or client violated the protocol.
    ProtocolViolation,
    /// An unclassified error occurred.
    UnknownError,
    /// A numeric code with no named variant.
    Other(u32),
}

impl ErrorCode {
    /// Maps a numeric code back to its variant.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ErrorCode::NoError,
            1 => ErrorCode::InvalidProtocolVersion,
            2 => ErrorCode::IdRejected,
            3 => ErrorCode::ServerUnavailable,
            4 => ErrorCode::BadUsernameOrPassword,
            5 => ErrorCode::NotAuthorized,
            256 => ErrorCode::TransportInvalid,
            257 => ErrorCode::ProtocolViolation,
            258 => ErrorCode::UnknownError,
            other => ErrorCode::Other(other),
        }
    }

    /// Returns the numeric code for this variant.
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::NoError => 0,
            ErrorCode::InvalidProtocolVersion => 1,
            ErrorCode::IdRejected => 2,
            ErrorCode::ServerUnavailable => 3,
            ErrorCode::BadUsernameOrPassword => 4,
            ErrorCode::NotAuthorized => 5,
            ErrorCode::TransportInvalid => 256,
            ErrorCode::ProtocolViolation => 257,
            ErrorCode::UnknownError => 258,
            ErrorCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::NoError => write!(f, "No Error"),
            ErrorCode::InvalidProtocolVersion => write!(f, "Invalid Protocol Version"),
            ErrorCode::IdRejected => write!(f, "ID Rejected"),
            ErrorCode::ServerUnavailable => write!(f, "Server Unavailable"),
            ErrorCode::BadUsernameOrPassword => write!(f, "Bad Username or Password"),
            ErrorCode::NotAuthorized => write!(f, "Not Authorized"),
            ErrorCode::TransportInvalid => write!(f, "Transport Invalid"),
            ErrorCode::ProtocolViolation => write!(f, "Protocol Violation"),
            ErrorCode::UnknownError => write!(f, "Unknown Error"),
            ErrorCode::Other(code) => write!(f, "Error code: {code}"),
        }
    }
}

/// Wire-level MQTT client abstraction.
///
/// Implementations own the network session. The production implementation is
/// [`RumqttTransport`](crate::RumqttTransport); tests use in-memory fakes.
///
/// All methods take `&self`: implementations guard their session state
/// internally so the coordinator can hold the transport behind an `Arc`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Starts a new session and its background I/O task.
    ///
    /// Session events are delivered through `events`. Any previous session
    /// is torn down first.
    async fn connect(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), TransportError>;

    /// Tears down the active session, if any.
    ///
    /// Idempotent: disconnecting without a session is a no-op.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Subscribes to a topic filter at the given QoS level.
    async fn subscribe(&self, filter: &str, qos: u8) -> Result<(), TransportError>;

    /// Removes a subscription previously created with [`Transport::subscribe`].
    async fn unsubscribe(&self, filter: &str) -> Result<(), TransportError>;
}
