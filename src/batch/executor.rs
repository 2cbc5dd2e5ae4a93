//! Executor lifecycle: start, submit, stop, wait.

use super::collector::Collector;
use super::dispatcher::{BatchHandler, Dispatcher};
use super::group::GroupFn;
use super::stats::{ExecutorSnapshot, ExecutorState, ExecutorStats};
use crate::config::{ExecutorConfig, MAX_QUEUE_CAPACITY};
use crate::error::{SubmitError, TrySubmitError};
use crate::{Error, ErrorContext, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Delayed, grouped batch executor.
///
/// Items submitted to the executor are buffered per group and handed to the
/// batch handler when a group reaches `max_item`, when the periodic timer
/// fires, or when the executor stops. See the [module docs](super) for the
/// full set of guarantees.
pub struct Executor<T> {
    config: ExecutorConfig,
    dispatcher: Dispatcher<T>,
    group_fn: Option<GroupFn<T>>,
    sender: mpsc::Sender<T>,
    receiver: Mutex<Option<mpsc::Receiver<T>>>,
    shutdown: CancellationToken,
    done: CancellationToken,
    stats: Arc<ExecutorStats>,
}

impl<T: Send + 'static> Executor<T> {
    /// Create an executor in the `Created` state.
    ///
    /// The config is checked in [`start`](Self::start), not here; the queue
    /// capacity is clamped to `1..=MAX_QUEUE_CAPACITY` so construction never panics.
    pub fn new<H: BatchHandler<T>>(handler: H, config: ExecutorConfig) -> Self {
        let capacity = config
            .effective_queue_capacity()
            .clamp(1, MAX_QUEUE_CAPACITY);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            config,
            dispatcher: Dispatcher::new(handler),
            group_fn: None,
            sender,
            receiver: Mutex::new(Some(receiver)),
            shutdown: CancellationToken::new(),
            done: CancellationToken::new(),
            stats: Arc::new(ExecutorStats::new()),
        }
    }

    /// Create an executor with `max_item = 20` and a 3 second timeout.
    pub fn with_defaults<H: BatchHandler<T>>(handler: H) -> Self {
        Self::new(handler, ExecutorConfig::default())
    }

    /// Install the function mapping an item to its group key.
    ///
    /// Without one, every item lands in [`DEFAULT_GROUP`](crate::config::DEFAULT_GROUP).
    /// The collector captures the function at [`start`](Self::start); installing
    /// a new one afterwards does not affect a running loop.
    pub fn group_by<F>(mut self, group_fn: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.group_fn = Some(Arc::new(group_fn));
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Spawn the collector loop on the current tokio runtime. Returns immediately.
    pub fn start(&self) -> Result<()> {
        self.config.validate()?;
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::lifecycle_with_context(
                "start must be called within a tokio runtime",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("executor"),
            )
        })?;
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| {
                Error::lifecycle_with_context(
                    "executor lock poisoned",
                    ErrorContext::new().with_source("executor"),
                )
            })?
            .take()
            .ok_or_else(|| {
                Error::lifecycle_with_context(
                    "executor already started",
                    ErrorContext::new().with_source("executor"),
                )
            })?;

        self.stats
            .transition(ExecutorState::Created, ExecutorState::Running);
        let collector = Collector::new(
            self.config.clone(),
            self.group_fn.clone(),
            self.dispatcher.clone(),
            receiver,
            self.shutdown.clone(),
            self.done.clone(),
            Arc::clone(&self.stats),
        );
        handle.spawn(collector.run());
        info!(
            max_item = self.config.max_item,
            timeout_ms = self.config.timeout.as_millis() as u64,
            grouped = self.group_fn.is_some(),
            "executor started"
        );
        Ok(())
    }

    /// Queue one item, waiting while the submission queue is full.
    ///
    /// Items accepted before [`stop`](Self::stop) are always flushed. Once
    /// stop has begun the item is handed back in the error.
    pub async fn submit(&self, item: T) -> std::result::Result<(), SubmitError<T>> {
        if self.shutdown.is_cancelled() {
            return Err(SubmitError(item));
        }
        self.sender
            .send(item)
            .await
            .map_err(|e| SubmitError(e.0))?;
        self.stats.record_submitted();
        Ok(())
    }

    /// Alias for [`submit`](Self::submit).
    pub async fn execute(&self, item: T) -> std::result::Result<(), SubmitError<T>> {
        self.submit(item).await
    }

    /// Queue one item without waiting.
    pub fn try_submit(&self, item: T) -> std::result::Result<(), TrySubmitError<T>> {
        if self.shutdown.is_cancelled() {
            return Err(TrySubmitError::Closed(item));
        }
        self.sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(item) => TrySubmitError::Full(item),
            mpsc::error::TrySendError::Closed(item) => TrySubmitError::Closed(item),
        })?;
        self.stats.record_submitted();
        Ok(())
    }

    /// Queue one item from a thread outside the runtime, blocking it while
    /// the queue is full.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_submit(&self, item: T) -> std::result::Result<(), SubmitError<T>> {
        if self.shutdown.is_cancelled() {
            return Err(SubmitError(item));
        }
        self.sender
            .blocking_send(item)
            .map_err(|e| SubmitError(e.0))?;
        self.stats.record_submitted();
        Ok(())
    }

    /// Signal shutdown and wait until every buffered item has been handed to
    /// the handler.
    ///
    /// Does not wait for the handler invocations themselves. Returns `false`
    /// if the executor was never started, or if the collector task ended
    /// without completing its drain (e.g. the group function panicked).
    pub async fn stop(&self) -> bool {
        if self.stats.state() == ExecutorState::Created {
            return false;
        }
        self.stats
            .transition(ExecutorState::Running, ExecutorState::Stopping);
        self.shutdown.cancel();
        self.done.cancelled().await;
        self.stats.state() == ExecutorState::Stopped
    }

    /// Wait for the final drain without initiating it.
    pub async fn wait(&self) {
        self.done.cancelled().await;
    }

    pub fn state(&self) -> ExecutorState {
        self.stats.state()
    }

    pub fn snapshot(&self) -> ExecutorSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recording_executor(
        config: ExecutorConfig,
    ) -> (Executor<u32>, Arc<std::sync::Mutex<Vec<Vec<u32>>>>) {
        let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = batches.clone();
        let executor = Executor::new(
            move |batch: Vec<u32>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(batch);
                }
            },
            config,
        );
        (executor, batches)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        assert_eq!(executor.state(), ExecutorState::Created);
        executor.start().unwrap();
        assert_eq!(executor.state(), ExecutorState::Running);
        assert!(executor.stop().await);
        assert_eq!(executor.state(), ExecutorState::Stopped);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        executor.start().unwrap();
        let err = executor.start().unwrap_err();
        assert!(matches!(err, Error::Lifecycle { .. }));
        assert!(executor.stop().await);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let (executor, _) = recording_executor(ExecutorConfig::new().with_max_item(0));
        assert!(matches!(
            executor.start(),
            Err(Error::Configuration { .. })
        ));
        assert_eq!(executor.state(), ExecutorState::Created);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        assert!(matches!(executor.start(), Err(Error::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn test_stop_without_start_returns_false() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        assert!(!executor.stop().await);
    }

    #[tokio::test]
    async fn test_submit_after_stop_returns_item() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        executor.start().unwrap();
        assert!(executor.stop().await);
        let err = executor.submit(5).await.unwrap_err();
        assert_eq!(err.into_inner(), 5);
        let err = executor.try_submit(6).unwrap_err();
        assert!(!err.is_full());
        assert_eq!(err.into_inner(), 6);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_queue() {
        let (executor, _) = recording_executor(
            ExecutorConfig::new()
                .with_max_item(10)
                .with_queue_capacity(2),
        );
        // Not started, so nothing drains the queue.
        executor.try_submit(1).unwrap();
        executor.try_submit(2).unwrap();
        let err = executor.try_submit(3).unwrap_err();
        assert!(err.is_full());
        assert_eq!(executor.snapshot().submitted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_queued_before_start_are_flushed_on_stop() {
        let (executor, batches) = recording_executor(
            ExecutorConfig::new()
                .with_max_item(100)
                .with_timeout(Duration::from_secs(60)),
        );
        for n in 0..5 {
            executor.submit(n).await.unwrap();
        }
        executor.start().unwrap();
        assert!(executor.stop().await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*batches.lock().unwrap(), vec![vec![0, 1, 2, 3, 4]]);
        let snap = executor.snapshot();
        assert_eq!(snap.submitted, 5);
        assert_eq!(snap.items_dispatched, 5);
        assert_eq!(snap.pending_items, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_when_group_fn_panics() {
        let (executor, _) = recording_executor(ExecutorConfig::new().with_max_item(100));
        let executor = executor.group_by(|n: &u32| {
            if *n == 13 {
                panic!("unlucky item");
            }
            n.to_string()
        });
        executor.start().unwrap();
        executor.submit(1).await.unwrap();
        executor.submit(13).await.unwrap();

        let stopped = tokio::time::timeout(Duration::from_secs(2), executor.stop())
            .await
            .expect("stop must not hang after the collector dies");
        assert!(!stopped);
        tokio::time::timeout(Duration::from_secs(2), executor.wait())
            .await
            .expect("wait must not hang after the collector dies");
        assert_ne!(executor.state(), ExecutorState::Stopped);
    }

    #[tokio::test]
    async fn test_new_with_oversized_queue_does_not_panic() {
        let config = ExecutorConfig::new().with_max_item(usize::MAX);
        let (executor, _) = recording_executor(config);
        assert!(matches!(
            executor.start(),
            Err(Error::Configuration { .. })
        ));

        let config = ExecutorConfig::new().with_queue_capacity(usize::MAX);
        let (executor, _) = recording_executor(config);
        executor.try_submit(1).unwrap();
        assert_eq!(executor.snapshot().submitted, 1);
    }

    #[tokio::test]
    async fn test_second_stop_and_wait_return_immediately() {
        let (executor, _) = recording_executor(ExecutorConfig::default());
        executor.start().unwrap();
        assert!(executor.stop().await);
        assert!(executor.stop().await);
        tokio::time::timeout(Duration::from_millis(100), executor.wait())
            .await
            .expect("wait should return after stop");
    }
}
