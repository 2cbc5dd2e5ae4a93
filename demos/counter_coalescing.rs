//! Counter Coalescing Example
//!
//! Many small counter increments are submitted from concurrent producers.
//! The executor groups them by counter name and applies each group as one
//! summed update:
//! - bursty counters flush as soon as `max_item` increments are buffered
//! - quiet counters flush on the next timer tick
//! - whatever is left flushes when the executor stops
//!
//! Usage:
//!   RUST_LOG=bulk_executor=debug cargo run --example counter_coalescing

use bulk_executor::{Executor, ExecutorConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Increment {
    counter: String,
    delta: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_target(false)
        .try_init();

    let totals: Arc<Mutex<HashMap<String, i64>>> = Arc::new(Mutex::new(HashMap::new()));
    let store = totals.clone();

    let config = ExecutorConfig::new()
        .with_max_item(8)
        .with_timeout(Duration::from_millis(200));
    let executor = Executor::new(
        move |batch: Vec<Increment>| {
            let store = store.clone();
            async move {
                let counter = batch[0].counter.clone();
                let sum: i64 = batch.iter().map(|i| i.delta).sum();
                tracing::info!(%counter, updates = batch.len(), sum, "applying batch");
                *store.lock().unwrap().entry(counter).or_default() += sum;
            }
        },
        config,
    )
    .group_by(|inc: &Increment| inc.counter.clone());
    let executor = Arc::new(executor);
    executor.start()?;

    // A hot counter and a cold one.
    let hot = {
        let executor = executor.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let inc = Increment {
                    counter: "page_views".into(),
                    delta: 1,
                };
                if executor.submit(inc).await.is_err() {
                    break;
                }
            }
        })
    };
    let cold = {
        let executor = executor.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                let inc = Increment {
                    counter: "signups".into(),
                    delta: 1,
                };
                if executor.submit(inc).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
        })
    };
    hot.await?;
    cold.await?;

    let stopped = executor.stop().await;
    // Handlers run detached; give the last batches a moment to land.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snap = executor.snapshot();
    println!("stopped: {stopped}");
    println!(
        "submitted {} increments in {} batches",
        snap.submitted, snap.batches_dispatched
    );
    for (counter, total) in totals.lock().unwrap().iter() {
        println!("  {counter}: {total}");
    }
    Ok(())
}
