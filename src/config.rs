use crate::calculations::Algorithm;
use crate::task::DEFAULT_MIN_BLOCK_MINUTES;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub algorithm: Algorithm,
    /// How many days ahead the engine searches for availability.
    pub days_ahead: u32,
    /// Chunk size applied to tasks that do not override it.
    pub default_min_block_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Parallel,
            days_ahead: 14,
            default_min_block_minutes: DEFAULT_MIN_BLOCK_MINUTES,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchedulerConfigError {
    ZeroHorizon,
    BadMinBlock(i64),
}

impl fmt::Display for SchedulerConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerConfigError::ZeroHorizon => {
                write!(f, "scheduler horizon must cover at least one day")
            }
            SchedulerConfigError::BadMinBlock(minutes) => {
                write!(f, "default min_block must be positive, got {minutes} minutes")
            }
        }
    }
}

impl std::error::Error for SchedulerConfigError {}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerConfigError> {
        if self.days_ahead == 0 {
            return Err(SchedulerConfigError::ZeroHorizon);
        }
        if self.default_min_block_minutes <= 0 {
            return Err(SchedulerConfigError::BadMinBlock(
                self.default_min_block_minutes,
            ));
        }
        Ok(())
    }
}
