//! # Broker Monitor Example
//!
//! Starts a local MQTT broker, connects to it, and prints every runtime
//! event while messages flow. On Ctrl-C the broker is torn down and the
//! captured history is dumped, oldest record first.
//!
//! ## Run
//! ```bash
//! cargo run --example monitor -- /usr/local/bin/nanomq
//! ```
//! The argument is the broker executable; it defaults to `nanomq` on PATH.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = brokervisor::BrokerConfig::default();
    if let Some(path) = std::env::args().nth(1) {
        cfg.exec_path = path;
    }

    let subs: Vec<Arc<dyn brokervisor::Subscribe>> =
        vec![Arc::new(brokervisor::LogWriter::new())];
    let coordinator = brokervisor::Coordinator::builder(cfg)
        .with_subscribers(subs)
        .build();

    let handle = coordinator.handle();
    let token = CancellationToken::new();
    let loop_task = tokio::spawn(coordinator.run(token.clone()));

    handle.toggle_broker().await?;
    println!("broker starting; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    token.cancel();
    let _ = loop_task.await;

    let records = handle.history().await;
    println!();
    println!("History ({} records, oldest first):", records.len());
    for record in records.iter().rev() {
        println!(
            "  {} [{}] {}",
            record.formatted_at(),
            record.topic,
            record.raw
        );
    }
    Ok(())
}
