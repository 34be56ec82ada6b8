use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::shared::ValidationError;

/// Destination dataset and credentials.
///
/// Not [`serde::Serialize`] so the service account key cannot leak into serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BigQueryConfig {
    /// Google Cloud project billed for requests and owning the dataset.
    pub project_id: String,
    pub dataset_id: String,
    /// Service account key, as the JSON document downloaded from Google Cloud.
    pub service_account_key: SecretString,
}

impl BigQueryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("bigquery.project_id"));
        }

        if self.dataset_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("bigquery.dataset_id"));
        }

        if self.service_account_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::EmptyField("bigquery.service_account_key"));
        }

        Ok(())
    }
}
