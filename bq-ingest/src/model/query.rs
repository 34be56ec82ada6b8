use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ErrorPayload, JobRef};

/// Optional parameters of `jobs.getQueryResults`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultsParams {
    /// How long to wait for the query to complete before returning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u32>,
    /// Token of the page to fetch, as returned by a previous call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    /// Zero-based index of the first row to read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<String>,
}

/// Response of `jobs.getQueryResults`.
///
/// Rows and schema are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<JobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorPayload>>,
}
