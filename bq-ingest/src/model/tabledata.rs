use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ErrorPayload;

/// A row sent to `tabledata.insertAll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRow {
    pub json: Value,
    /// Idempotency token BigQuery uses to de-duplicate retried rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<String>,
}

/// Body of a `tabledata.insertAll` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllRequest {
    pub rows: Vec<InsertRow>,
}

/// Response of a `tabledata.insertAll` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_errors: Option<Vec<InsertError>>,
}

impl InsertAllResponse {
    /// Returns the per-row errors, or an empty slice when the insert succeeded.
    pub fn insert_errors(&self) -> &[InsertError] {
        self.insert_errors.as_deref().unwrap_or_default()
    }
}

/// Errors reported for the row at `index` of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertError {
    pub index: usize,
    #[serde(default)]
    pub errors: Vec<ErrorPayload>,
}

impl InsertError {
    /// Returns `true` if any error for this row has the given reason.
    pub fn has_reason(&self, reason: &str) -> bool {
        self.errors
            .iter()
            .any(|error| error.reason.as_deref() == Some(reason))
    }
}
