//! Wire-level MQTT client layer.
//!
//! [`Transport`] is the seam the coordinator programs against;
//! [`RumqttTransport`] is the production implementation.

mod rumqtt;
mod transport;

pub use rumqtt::RumqttTransport;
pub use transport::{AT_MOST_ONCE, ClientEvent, ErrorCode, Transport};
