use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// How drivers poll load jobs until they complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadJobConfig {
    /// Delay between two polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Number of polls after which a driver stops waiting for the job.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl LoadJobConfig {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

    pub const DEFAULT_MAX_POLLS: u32 = 120;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "load.poll_interval_ms",
                constraint: "must be greater than 0",
            });
        }

        if self.max_polls == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "load.max_polls",
                constraint: "must be greater than 0",
            });
        }

        Ok(())
    }
}

impl Default for LoadJobConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    LoadJobConfig::DEFAULT_POLL_INTERVAL_MS
}

fn default_max_polls() -> u32 {
    LoadJobConfig::DEFAULT_MAX_POLLS
}
