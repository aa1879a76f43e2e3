use crate::error::BatcherError;
use std::time::Duration;

pub const DEFAULT_MAX_WEIGHT: usize = 100;
pub const DEFAULT_MAX_QUIET_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_FINAL_FLUSH_GRACE: Duration = Duration::from_secs(1);

/// Immutable flush policy of a batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatcherConfig {
    /// Accumulated weight at which the buffer is flushed.
    pub max_weight: usize,
    /// Time since the last flush after which a non-empty buffer is flushed.
    pub max_quiet_period: Duration,
    /// Upper bound on waiting for sink capacity when flushing on the way out.
    /// Zero delivers the last batch only if the sink can take it immediately.
    pub final_flush_grace: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_weight: DEFAULT_MAX_WEIGHT,
            max_quiet_period: DEFAULT_MAX_QUIET_PERIOD,
            final_flush_grace: DEFAULT_FINAL_FLUSH_GRACE,
        }
    }
}

impl BatcherConfig {
    pub fn new(max_weight: usize, max_quiet_period: Duration) -> Self {
        Self {
            max_weight,
            max_quiet_period,
            ..Self::default()
        }
    }

    pub fn with_final_flush_grace(mut self, grace: Duration) -> Self {
        self.final_flush_grace = grace;
        self
    }

    pub fn validate(&self) -> Result<(), BatcherError> {
        if self.max_weight == 0 {
            return Err(BatcherError::InvalidConfiguration(
                "max_weight must be positive".to_string(),
            ));
        }
        if self.max_quiet_period.is_zero() {
            return Err(BatcherError::InvalidConfiguration(
                "max_quiet_period must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
