//! # bulk-executor
//!
//! 批量延迟合并执行器：把零散任务按分组合并后批量执行。
//!
//! Delayed, grouped batch execution for tokio applications.
//!
//! ## Overview
//!
//! Producers submit discrete items; the executor buffers them per group and
//! invokes a batch handler once per group when the group fills up, when a
//! periodic timer fires, or when the executor shuts down. This trades a
//! bounded amount of latency for larger batches (coalesced writes, counter
//! increments, log flushes).
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Executor, collector loop, dispatcher |
//! | [`config`] | Flush thresholds and queue sizing |
//! | [`error`] | Error types |
//!
//! ## Logging
//!
//! The crate emits `tracing` events (flushes at `debug`, lifecycle at `info`)
//! and never installs a subscriber.

pub mod batch;
pub mod config;
pub mod error;

pub use batch::{BatchHandler, Executor, ExecutorSnapshot, ExecutorState, FlushReason};
pub use config::{ExecutorConfig, DEFAULT_GROUP, GROUP_HIGH_WATER_MARK};
pub use error::{Error, ErrorContext, SubmitError, TrySubmitError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
