use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Lifecycle of an executor. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl ExecutorState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ExecutorState::Created,
            1 => ExecutorState::Running,
            2 => ExecutorState::Stopping,
            _ => ExecutorState::Stopped,
        }
    }
}

/// Point-in-time view of an executor.
///
/// Group and pending counts are published by the collector loop after each
/// event it handles, so they may trail the queue slightly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSnapshot {
    pub state: ExecutorState,
    /// Items accepted by `submit` and friends.
    pub submitted: u64,
    /// Handler invocations spawned.
    pub batches_dispatched: u64,
    /// Items handed to the handler across all batches.
    pub items_dispatched: u64,
    /// Items buffered in groups, not yet flushed.
    pub pending_items: usize,
    /// Groups currently held, including empty ones awaiting reclaim.
    pub group_count: usize,
}

/// Counters shared between the executor handle and its collector loop.
#[derive(Debug)]
pub(crate) struct ExecutorStats {
    state: AtomicU8,
    submitted: AtomicU64,
    batches_dispatched: AtomicU64,
    items_dispatched: AtomicU64,
    pending_items: AtomicUsize,
    group_count: AtomicUsize,
}

impl ExecutorStats {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ExecutorState::Created as u8),
            submitted: AtomicU64::new(0),
            batches_dispatched: AtomicU64::new(0),
            items_dispatched: AtomicU64::new(0),
            pending_items: AtomicUsize::new(0),
            group_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` if currently in `from`. Returns whether the move happened.
    pub(crate) fn transition(&self, from: ExecutorState, to: ExecutorState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move forward to `to`; never moves backwards.
    pub(crate) fn advance(&self, to: ExecutorState) {
        self.state.fetch_max(to as u8, Ordering::AcqRel);
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self, items: usize) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.items_dispatched
            .fetch_add(items as u64, Ordering::Relaxed);
    }

    pub(crate) fn publish_store(&self, pending_items: usize, group_count: usize) {
        self.pending_items.store(pending_items, Ordering::Relaxed);
        self.group_count.store(group_count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ExecutorSnapshot {
        ExecutorSnapshot {
            state: self.state(),
            submitted: self.submitted.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            pending_items: self.pending_items.load(Ordering::Relaxed),
            group_count: self.group_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions_move_forward() {
        let stats = ExecutorStats::new();
        assert_eq!(stats.state(), ExecutorState::Created);
        assert!(!stats.transition(ExecutorState::Running, ExecutorState::Stopping));
        assert!(stats.transition(ExecutorState::Created, ExecutorState::Running));
        stats.advance(ExecutorState::Stopped);
        stats.advance(ExecutorState::Stopping);
        assert_eq!(stats.state(), ExecutorState::Stopped);
    }

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ExecutorStats::new();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_dispatch(2);
        stats.publish_store(0, 1);
        let snap = stats.snapshot();
        assert_eq!(snap.submitted, 2);
        assert_eq!(snap.batches_dispatched, 1);
        assert_eq!(snap.items_dispatched, 2);
        assert_eq!(snap.pending_items, 0);
        assert_eq!(snap.group_count, 1);
    }
}
