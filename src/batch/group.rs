//! Per-key buffers of pending items.

use std::collections::HashMap;
use std::sync::Arc;

/// Maps an item to the key of the group it is batched with.
pub type GroupFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Pending items keyed by group, in arrival order.
///
/// Not synchronized: the collector loop owns the only instance and nothing
/// else ever holds a reference to it.
pub(crate) struct GroupStore<T> {
    groups: HashMap<String, Vec<T>>,
    pending: usize,
}

impl<T> GroupStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            groups: HashMap::new(),
            pending: 0,
        }
    }

    /// Append an item, creating the group on first use. Returns the group's new length.
    pub(crate) fn push(&mut self, key: &str, item: T) -> usize {
        self.pending += 1;
        match self.groups.get_mut(key) {
            Some(buf) => {
                buf.push(item);
                buf.len()
            }
            None => {
                self.groups.insert(key.to_owned(), vec![item]);
                1
            }
        }
    }

    /// Move a group's items out, leaving it empty. `None` if absent or empty.
    pub(crate) fn take(&mut self, key: &str) -> Option<Vec<T>> {
        let buf = self.groups.get_mut(key)?;
        if buf.is_empty() {
            return None;
        }
        let batch = std::mem::take(buf);
        self.pending -= batch.len();
        Some(batch)
    }

    /// Move every non-empty group's items out, leaving all groups in place.
    pub(crate) fn take_all(&mut self) -> Vec<(String, Vec<T>)> {
        let mut batches = Vec::new();
        for (key, buf) in self.groups.iter_mut() {
            if buf.is_empty() {
                continue;
            }
            batches.push((key.clone(), std::mem::take(buf)));
        }
        self.pending = 0;
        batches
    }

    /// Drop empty groups when more than `high_water_mark` groups exist.
    /// Returns how many were removed.
    pub(crate) fn reclaim_empty(&mut self, high_water_mark: usize) -> usize {
        if self.groups.len() <= high_water_mark {
            return 0;
        }
        let before = self.groups.len();
        self.groups.retain(|_, buf| !buf.is_empty());
        before - self.groups.len()
    }

    pub(crate) fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    #[cfg(test)]
    pub(crate) fn group_len(&self, key: &str) -> Option<usize> {
        self.groups.get(key).map(Vec::len)
    }
}
