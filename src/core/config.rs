//! # Global runtime configuration.
//!
//! Provides [`BrokerConfig`], centralized settings for the broker runtime.
//!
//! The config is consumed once, at construction time:
//! `Coordinator::builder(config)` wires every component (process supervisor,
//! MQTT transport, history store, event bus) from these values.

use std::time::Duration;

/// Global configuration for the broker runtime.
///
/// Defines:
/// - **Process control**: broker executable and stop grace period
/// - **MQTT endpoint**: host, port, credentials, initial topic filter
/// - **History**: retained message capacity
/// - **Plumbing**: event bus and internal channel capacities
///
/// ## Field semantics
/// - `connect_delay`: wait after process start before connecting the client
/// - `stop_grace`: wait for the broker to exit after SIGTERM before killing it
/// - `history_cap`: retained history records (min 1; clamped by the store)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `queue_capacity`: coordinator-internal channel size (min 1)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the clamped accessors to
/// avoid sprinkling minimum checks across the codebase.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Path to the broker executable to supervise.
    ///
    /// Resolved through `PATH` when not absolute. May be changed at runtime
    /// through the handle; the new path applies to the next start.
    pub exec_path: String,

    /// Hostname the MQTT client connects to.
    pub host: String,

    /// Port the MQTT client connects to.
    pub port: u16,

    /// Username presented on connect.
    pub username: String,

    /// Password presented on connect.
    pub password: String,

    /// Initial topic filter to subscribe to once connected.
    ///
    /// `"#"` captures every topic. May be changed at runtime through the
    /// handle; an active subscription is moved to the new filter.
    pub topic: String,

    /// Delay between a successful process start and the connection attempt.
    ///
    /// Gives the broker time to open its listening socket. A stop request
    /// arriving inside this window cancels the pending attempt.
    pub connect_delay: Duration,

    /// Maximum time to wait for the broker to exit after a polite SIGTERM.
    ///
    /// When the deadline passes, the process is killed outright.
    pub stop_grace: Duration,

    /// Maximum number of message records retained in the visible history.
    ///
    /// The oldest records are evicted first. The locked-view pending buffer
    /// is not capped; the limit is re-applied when it flushes into history.
    pub history_cap: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Capacity of the coordinator's internal channels (commands, client
    /// events, process output).
    ///
    /// Senders await free slots, so this bounds how far producers can run
    /// ahead of the coordinator loop.
    pub queue_capacity: usize,
}

impl BrokerConfig {
    /// Returns the history capacity clamped to a minimum of 1.
    #[inline]
    pub fn history_cap_clamped(&self) -> usize {
        self.history_cap.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    ///
    /// The `Bus` should use this value to avoid constructing an invalid channel.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the internal channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for BrokerConfig {
    /// Default configuration:
    ///
    /// - `exec_path = "nanomq"` (resolved through `PATH`)
    /// - `host = "localhost"`, `port = 1883`
    /// - `username = "user"`, `password = "pass"`
    /// - `topic = "#"` (all topics)
    /// - `connect_delay = 1s`, `stop_grace = 3s`
    /// - `history_cap = 1000`
    /// - `bus_capacity = 1024`, `queue_capacity = 64`
    fn default() -> Self {
        Self {
            exec_path: "nanomq".to_string(),
            host: "localhost".to_string(),
            port: 1883,
            username: "user".to_string(),
            password: "pass".to_string(),
            topic: "#".to_string(),
            connect_delay: Duration::from_secs(1),
            stop_grace: Duration::from_secs(3),
            history_cap: 1000,
            bus_capacity: 1024,
            queue_capacity: 64,
        }
    }
}
