use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Streaming insert settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InsertConfig {
    /// Retry once without the rows BigQuery reports as invalid.
    #[serde(default)]
    pub ignore_invalid_rows: bool,
    /// Maximum number of rows sent in a single `insertAll` request.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl InsertConfig {
    /// Default number of rows per request, the size BigQuery recommends.
    pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

    /// Maximum number of rows BigQuery accepts in a single request.
    pub const MAX_ROWS_PER_REQUEST: usize = 50_000;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_batch_size == 0 || self.max_batch_size > Self::MAX_ROWS_PER_REQUEST {
            return Err(ValidationError::InvalidFieldValue {
                field: "insert.max_batch_size",
                constraint: "must be between 1 and 50000",
            });
        }

        Ok(())
    }
}

impl Default for InsertConfig {
    fn default() -> Self {
        Self {
            ignore_invalid_rows: false,
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    InsertConfig::DEFAULT_MAX_BATCH_SIZE
}
