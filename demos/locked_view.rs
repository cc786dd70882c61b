//! # Locked View Example
//!
//! Demonstrates the pending buffer: while the view is locked, arriving
//! messages accumulate without disturbing the visible history; unlocking
//! flushes them into the history in order.
//!
//! ## Run
//! ```bash
//! cargo run --example locked_view -- /usr/local/bin/nanomq
//! ```
//! Publish a few messages (any topic) while the view is locked to see the
//! buffered count climb.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use brokervisor::{BrokerConfig, Coordinator, EventKind, LogWriter, Subscribe};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = BrokerConfig::default();
    if let Some(path) = std::env::args().nth(1) {
        cfg.exec_path = path;
    }

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let coordinator = Coordinator::builder(cfg).with_subscribers(subs).build();

    let handle = coordinator.handle();
    let mut events = handle.events();
    let token = CancellationToken::new();
    let loop_task = tokio::spawn(coordinator.run(token.clone()));

    handle.toggle_broker().await?;

    // Wait until the subscription is live before locking the view.
    while let Ok(ev) = events.recv().await {
        if ev.kind == EventKind::RunningChanged && ev.flag == Some(true) {
            break;
        }
    }

    handle.set_view_locked(true).await?;
    println!("view locked for 10s; publish some messages now");
    tokio::time::sleep(Duration::from_secs(10)).await;

    println!("buffered while locked: {}", handle.buffered_count().await);
    println!("visible history:       {}", handle.history().await.len());

    handle.set_view_locked(false).await?;
    while let Ok(ev) = events.recv().await {
        if ev.kind == EventKind::ViewLockChanged && ev.flag == Some(false) {
            break;
        }
    }
    println!("unlocked; history now: {}", handle.history().await.len());

    token.cancel();
    let _ = loop_task.await;
    Ok(())
}
