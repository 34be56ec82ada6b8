use serde::Deserialize;

use crate::shared::{BigQueryConfig, InsertConfig, LoadJobConfig, ValidationError};

/// Top-level configuration of the ingestion binaries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IngestConfig {
    pub bigquery: BigQueryConfig,
    #[serde(default)]
    pub insert: InsertConfig,
    #[serde(default)]
    pub load: LoadJobConfig,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.bigquery.validate()?;
        self.insert.validate()?;
        self.load.validate()?;

        Ok(())
    }
}
