//! Executor configuration.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of buffered items that triggers a flush of one group.
pub const DEFAULT_MAX_ITEM: usize = 20;

/// Default flush interval.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Group count above which empty groups are reclaimed on a timer tick.
pub const GROUP_HIGH_WATER_MARK: usize = 1000;

/// Largest submission queue an executor will allocate.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 24;

/// Key used for every item when no group function is installed.
pub const DEFAULT_GROUP: &str = "default";

/// Flush thresholds and queue sizing for an [`Executor`](crate::batch::Executor).
///
/// The executor copies the config when it starts; later edits to the
/// caller's value have no effect on a running loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum items per flushed batch.
    pub max_item: usize,
    /// Flush interval; every buffered item is flushed within one interval.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Submission queue capacity. `None` means `2 * max_item`.
    pub queue_capacity: Option<usize>,
    /// Empty groups are dropped on a tick once the group count exceeds this.
    pub group_high_water_mark: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_item: DEFAULT_MAX_ITEM,
            timeout: DEFAULT_TIMEOUT,
            queue_capacity: None,
            group_high_water_mark: GROUP_HIGH_WATER_MARK,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_item(mut self, max_item: usize) -> Self {
        self.max_item = max_item;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_group_high_water_mark(mut self, mark: usize) -> Self {
        self.group_high_water_mark = mark;
        self
    }

    /// Capacity of the submission queue after applying the default.
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| self.max_item.saturating_mul(2))
    }

    /// Reject values the collector loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_item == 0 {
            return Err(invalid("max_item", "max_item must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout_ms", "timeout must be non-zero"));
        }
        if self.effective_queue_capacity() == 0 {
            return Err(invalid(
                "queue_capacity",
                "queue capacity must be at least 1",
            ));
        }
        if self.effective_queue_capacity() > MAX_QUEUE_CAPACITY {
            return Err(invalid(
                "queue_capacity",
                "queue capacity exceeds MAX_QUEUE_CAPACITY",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("config"),
    )
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Rounds up to whole milliseconds so a non-zero timeout stays non-zero.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = value.as_nanos().div_ceil(1_000_000);
        serializer.serialize_u64(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
