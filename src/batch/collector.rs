//! The collector loop: groups queued items and decides when to flush.

use super::dispatcher::Dispatcher;
use super::group::{GroupFn, GroupStore};
use super::stats::{ExecutorState, ExecutorStats};
use crate::config::{ExecutorConfig, DEFAULT_GROUP};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a group was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The group reached `max_item`.
    Threshold,
    /// Periodic timer tick.
    Tick,
    /// Final drain during shutdown.
    Drain,
}

/// Single owner of the group store. Runs as one task until stopped.
pub(crate) struct Collector<T> {
    config: ExecutorConfig,
    store: GroupStore<T>,
    group_fn: Option<GroupFn<T>>,
    dispatcher: Dispatcher<T>,
    queue: mpsc::Receiver<T>,
    shutdown: CancellationToken,
    done: CancellationToken,
    stats: Arc<ExecutorStats>,
}

impl<T: Send + 'static> Collector<T> {
    pub(crate) fn new(
        config: ExecutorConfig,
        group_fn: Option<GroupFn<T>>,
        dispatcher: Dispatcher<T>,
        queue: mpsc::Receiver<T>,
        shutdown: CancellationToken,
        done: CancellationToken,
        stats: Arc<ExecutorStats>,
    ) -> Self {
        Self {
            config,
            store: GroupStore::new(),
            group_fn,
            dispatcher,
            queue,
            shutdown,
            done,
            stats,
        }
    }

    pub(crate) async fn run(mut self) {
        // Raised on every exit, including a panic in the group function.
        let _done = self.done.clone().drop_guard();
        let period = self.config.timeout;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.queue.recv() => match received {
                    Some(item) => self.collect(item),
                    None => {
                        warn!("submission queue closed without stop, draining");
                        break;
                    }
                },
                _ = ticker.tick() => self.on_tick(),
                _ = self.shutdown.cancelled() => break,
            }
            self.publish();
        }
        drop(ticker);
        self.stats.advance(ExecutorState::Stopping);

        // Items already accepted into the queue still belong to this executor.
        self.queue.close();
        while let Some(item) = self.queue.recv().await {
            self.collect(item);
        }
        self.drain();
        self.publish();

        self.stats.advance(ExecutorState::Stopped);
        let snap = self.stats.snapshot();
        info!(
            batches = snap.batches_dispatched,
            items = snap.items_dispatched,
            "executor drained"
        );
    }

    fn group_key(&self, item: &T) -> Cow<'static, str> {
        match &self.group_fn {
            Some(f) => Cow::Owned(f(item)),
            None => Cow::Borrowed(DEFAULT_GROUP),
        }
    }

    fn collect(&mut self, item: T) {
        let key = self.group_key(&item);
        let len = self.store.push(&key, item);
        if len >= self.config.max_item {
            self.flush(&key, FlushReason::Threshold);
        }
    }

    fn flush(&mut self, key: &str, reason: FlushReason) {
        if let Some(batch) = self.store.take(key) {
            self.dispatch(key, batch, reason);
        }
    }

    fn on_tick(&mut self) {
        let reclaimed = self.store.reclaim_empty(self.config.group_high_water_mark);
        if reclaimed > 0 {
            debug!(
                reclaimed,
                remaining = self.store.group_count(),
                "reclaimed empty groups"
            );
        }
        for (key, batch) in self.store.take_all() {
            self.dispatch(&key, batch, FlushReason::Tick);
        }
    }

    fn drain(&mut self) {
        for (key, batch) in self.store.take_all() {
            self.dispatch(&key, batch, FlushReason::Drain);
        }
    }

    fn dispatch(&self, key: &str, batch: Vec<T>, reason: FlushReason) {
        debug!(group = key, size = batch.len(), ?reason, "flushing group");
        self.stats.record_dispatch(batch.len());
        self.dispatcher.dispatch(batch);
    }

    fn publish(&self) {
        self.stats
            .publish_store(self.store.pending(), self.store.group_count());
    }
}
