//! # brokervisor
//!
//! **Brokervisor** supervises a local MQTT broker process and keeps an
//! observable, bounded history of the messages flowing through it.
//!
//! It owns the whole loop: start/stop of the broker executable, the client
//! connection and subscription, message capture, diagnostics, and change
//! notifications. The crate is designed as the headless engine behind a
//! monitoring UI or an embedded test rig.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌─────────────────┐          ┌─────────────────┐
//!            │  BrokerHandle   │  ... N   │  BrokerHandle   │   (cloneable)
//!            └───────┬─────────┘          └───────┬─────────┘
//!                    │  Command (mpsc)            │  sync reads (Status)
//!                    ▼                            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (single event loop, owns all mutation)               │
//! │  - ProcessSupervisor (broker child: spawn / output / stop)        │
//! │  - SessionController (MQTT session state machine)                 │
//! │  - connect deadline  (armed `connect_delay` after a start)        │
//! └──────┬──────────────────────┬─────────────────────────┬──────────┘
//!        │ spawn/SIGTERM        │ connect/subscribe       │ records
//!        ▼                      ▼                         ▼
//! ┌──────────────┐      ┌────────────────┐      ┌──────────────────────┐
//! │ broker child │      │ Transport      │      │ HistoryStore         │
//! │ (executable) │      │ (rumqttc I/O   │      │  history  (≤ cap)    │
//! │ stdout/stderr│      │  polling task) │      │  pending  (locked    │
//! └──────┬───────┘      └───────┬────────┘      │           view)      │
//!        │ ProcessEvent         │ ClientEvent   └─────────┬────────────┘
//!        └──────────► coordinator loop ◄───────┘          │ publishes
//!                                                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: BrokerConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │   (in Coordinator)     │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                            (per-sub queues)
//!                          ┌─────────┼─────────┐
//!                          ▼         ▼         ▼
//!                          worker1  worker2  workerN
//!                          ▼         ▼         ▼
//!                     sub1.on   sub2.on   subN.on
//!                      _event()  _event()  _event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! handle.toggle_broker()
//!   │
//!   ├─ stopped ──► ProcessSupervisor::start(exec_path)
//!   │                ├─ spawn child (stdout/stderr piped, lines → history)
//!   │                └─ arm connect deadline (now + connect_delay)
//!   │                     └─ deadline fires ──► SessionController::connect()
//!   │                          └─ broker accepts ──► subscribe(topic, QoS 0)
//!   │                               ├─ ok   ──► running = true  ─► RunningChanged
//!   │                               └─ fail ──► diagnostic, running stays false
//!   │
//!   └─ running ──► stop sequence
//!                    ├─ disarm connect deadline
//!                    ├─ disconnect client (unsubscribe first)
//!                    ├─ stop child (SIGTERM, kill after stop_grace)
//!                    └─ running = false ─► RunningChanged
//!
//! message arrives ──► HistoryStore::ingest
//!   ├─ view unlocked ──► prepend to history (evict oldest past cap) ─► HistoryChanged
//!   └─ view locked  ──► prepend to pending buffer ─► BufferedCountChanged
//!                         └─ unlock ──► flush pending into history
//! ```
//!
//! ## Features
//! | Area               | Description                                                          | Key types / traits                    |
//! |--------------------|----------------------------------------------------------------------|----------------------------------------|
//! | **Control**        | Start/stop the broker, change topic/executable, manage the view lock. | [`Coordinator`], [`BrokerHandle`]      |
//! | **History**        | Bounded newest-first message log with a locked-view pending buffer.   | [`HistoryStore`], [`MessageRecord`]    |
//! | **Transport**      | Wire-level MQTT seam; swappable for tests.                            | [`Transport`], [`RumqttTransport`]     |
//! | **Subscriber API** | Hook into runtime events (logging, metrics, custom subscribers).      | [`Subscribe`], [`LogWriter`]           |
//! | **Errors**         | Typed errors for the transport and handle seams.                      | [`TransportError`], [`HandleError`]    |
//! | **Configuration**  | Centralize runtime settings.                                          | [`BrokerConfig`]                       |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use brokervisor::{BrokerConfig, Coordinator, LogWriter, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = BrokerConfig::default();
//!     cfg.exec_path = "/usr/local/bin/nanomq".to_string();
//!     cfg.topic = "#".to_string();
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let coordinator = Coordinator::builder(cfg)
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let handle = coordinator.handle();
//!     let token = CancellationToken::new();
//!     let loop_task = tokio::spawn(coordinator.run(token.clone()));
//!
//!     // Start the broker; the client connects one second later.
//!     handle.toggle_broker().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     token.cancel();
//!     let _ = loop_task.await;
//!
//!     for record in handle.history().await.iter().rev() {
//!         println!("{} [{}] {}", record.formatted_at(), record.topic, record.raw);
//!     }
//!     Ok(())
//! }
//! ```
mod client;
mod core;
mod error;
mod events;
mod records;
mod subscribers;

// ---- Public re-exports ----

pub use client::{AT_MOST_ONCE, ClientEvent, ErrorCode, RumqttTransport, Transport};
pub use core::{BrokerConfig, BrokerHandle, Coordinator, CoordinatorBuilder};
pub use error::{HandleError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use records::{HistoryStore, MessageRecord, SYSTEM_TRACE_TOPIC, format_timestamp};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
