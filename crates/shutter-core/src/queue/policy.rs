//! Queue policy: attempt budget and timer intervals.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Tunable constants of the upload queue.
///
/// Missing fields fall back to the defaults when deserialized, so a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Permanent failures allowed before a task is given up.
    pub max_attempts: u32,

    /// Fixed delay before re-running a pass that left work behind.
    pub retry_delay_ms: u64,

    /// Period of the safety-net pass that runs even without triggers.
    pub heartbeat_interval_ms: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 15_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl QueuePolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.retry_delay_ms == 0 {
            return Err(ConfigError::Invalid("retry_delay_ms must be positive".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
