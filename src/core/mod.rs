//! Runtime core: orchestration and lifecycle.
//!
//! This module contains the embedded implementation of the broker runtime.
//! The public API from this module is [`Coordinator`] (plus its builder and
//! config) and [`BrokerHandle`], the control surface for a running loop.
//!
//! Internal modules:
//! - [`coordinator`]: the single event loop owning all mutation;
//! - [`process`]: child-process lifecycle (spawn, output capture, stop);
//! - [`session`]: MQTT session state machine over the transport seam;
//! - [`status`]: shared mirror of externally visible state;
//! - [`handle`]: command submission and synchronous reads.

mod config;
mod coordinator;
mod handle;
mod process;
mod session;
mod status;

pub use config::BrokerConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use handle::BrokerHandle;
