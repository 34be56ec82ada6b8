use serde::{Deserialize, Serialize};

use crate::model::{ErrorPayload, JobRef, TableReference};

/// The job resource used by `jobs.insert` and `jobs.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_reference: Option<JobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<JobConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<JobConfigurationLoad>,
}

/// Configuration of a load job reading files from Cloud Storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfigurationLoad {
    pub source_format: SourceFormat,
    pub write_disposition: WriteDisposition,
    pub source_uris: Vec<String>,
    pub destination_table: TableReference,
}

/// Format of the files read by a load job.
///
/// Formats not listed here are kept verbatim in [`SourceFormat::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceFormat {
    NewlineDelimitedJson,
    Csv,
    Avro,
    Parquet,
    Other(String),
}

impl SourceFormat {
    pub fn as_str(&self) -> &str {
        match self {
            SourceFormat::NewlineDelimitedJson => "NEWLINE_DELIMITED_JSON",
            SourceFormat::Csv => "CSV",
            SourceFormat::Avro => "AVRO",
            SourceFormat::Parquet => "PARQUET",
            SourceFormat::Other(format) => format,
        }
    }
}

impl From<String> for SourceFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NEWLINE_DELIMITED_JSON" => SourceFormat::NewlineDelimitedJson,
            "CSV" => SourceFormat::Csv,
            "AVRO" => SourceFormat::Avro,
            "PARQUET" => SourceFormat::Parquet,
            _ => SourceFormat::Other(value),
        }
    }
}

impl From<SourceFormat> for String {
    fn from(value: SourceFormat) -> Self {
        match value {
            SourceFormat::Other(format) => format,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WriteDisposition {
    WriteAppend,
    WriteTruncate,
    WriteEmpty,
    Other(String),
}

impl WriteDisposition {
    pub fn as_str(&self) -> &str {
        match self {
            WriteDisposition::WriteAppend => "WRITE_APPEND",
            WriteDisposition::WriteTruncate => "WRITE_TRUNCATE",
            WriteDisposition::WriteEmpty => "WRITE_EMPTY",
            WriteDisposition::Other(disposition) => disposition,
        }
    }
}

impl From<String> for WriteDisposition {
    fn from(value: String) -> Self {
        match value.as_str() {
            "WRITE_APPEND" => WriteDisposition::WriteAppend,
            "WRITE_TRUNCATE" => WriteDisposition::WriteTruncate,
            "WRITE_EMPTY" => WriteDisposition::WriteEmpty,
            _ => WriteDisposition::Other(value),
        }
    }
}

impl From<WriteDisposition> for String {
    fn from(value: WriteDisposition) -> Self {
        match value {
            WriteDisposition::Other(disposition) => disposition,
            known => known.as_str().to_string(),
        }
    }
}

/// Lifecycle state reported for a job.
///
/// Only [`JobState::Done`] is terminal; every other state means the job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Done,
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        self == JobState::Done
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    /// Final error of a failed job. Its presence means the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_result: Option<ErrorPayload>,
    /// All errors encountered while the job ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorPayload>>,
}

impl JobStatus {
    /// Returns the reported state, treating a missing state as [`JobState::Unknown`].
    pub fn state(&self) -> JobState {
        self.state.unwrap_or(JobState::Unknown)
    }

    /// Returns the errors encountered while the job ran, or an empty slice.
    pub fn errors(&self) -> &[ErrorPayload] {
        self.errors.as_deref().unwrap_or_default()
    }
}
