//! 批量延迟合并执行模块：按分组收集任务，按数量、超时或停止时批量执行。
//!
//! # Delayed Batch Execution
//!
//! Producers submit items one at a time; the executor coalesces them per
//! group and hands each group to a batch handler as a single `Vec`.
//!
//! ## Flush triggers
//!
//! | Trigger | When |
//! |---------|------|
//! | Threshold | A group reaches `max_item` right after an item arrives |
//! | Tick | The periodic timer fires and the group is non-empty |
//! | Drain | [`Executor::stop`] runs, or every handle to the executor is dropped |
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Executor`] | Lifecycle: start, submit, stop, wait |
//! | [`BatchHandler`] | Consumer of one flushed batch, implemented for async closures |
//! | [`Dispatcher`] | Spawns one detached task per batch |
//! | [`ExecutorSnapshot`] | Counters and state for observation |
//!
//! ## Guarantees
//!
//! - Items in one batch share a group key and keep their submission order.
//! - No item is delivered twice and none accepted by `submit` is lost, including
//!   items still in the submission queue when `stop` is called.
//! - An item that never fills its group is flushed within one `timeout`.
//! - Batches run concurrently with each other and with the collector; there is
//!   no ordering between batches, even for the same group.
//! - The handler's outcome is never observed. A panicking handler only ends
//!   its own task.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bulk_executor::batch::Executor;
//! use bulk_executor::config::ExecutorConfig;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> bulk_executor::Result<()> {
//!     let config = ExecutorConfig::new()
//!         .with_max_item(3)
//!         .with_timeout(Duration::from_secs(1));
//!     let executor = Executor::new(
//!         |batch: Vec<(String, i64)>| async move {
//!             println!("flushing {} increments", batch.len());
//!         },
//!         config,
//!     )
//!     .group_by(|(key, _): &(String, i64)| key.clone());
//!
//!     executor.start()?;
//!     for n in 0..10 {
//!         let key = if n % 2 == 0 { "even" } else { "odd" };
//!         executor.submit((key.to_string(), n)).await.ok();
//!     }
//!     executor.stop().await;
//!     Ok(())
//! }
//! ```

mod collector;
mod dispatcher;
mod executor;
mod group;
mod stats;

pub use collector::FlushReason;
pub use dispatcher::{BatchHandler, Dispatcher};
pub use executor::Executor;
pub use group::GroupFn;
pub use stats::{ExecutorSnapshot, ExecutorState};
