//! BigQuery client for streaming rows and loading files from Cloud Storage.
//!
//! The client talks to BigQuery through a [`service::TableService`], turns the errors
//! BigQuery reports into typed [`error::BqError`]s and implements two workflows on top:
//!
//! - [`insert::RowInserter`] streams rows and can retry once without the invalid ones.
//! - [`job::LoadJobs`] submits load jobs and checks on their progress.
//!
//! [`client::BigQueryClient`] exposes both behind a single facade. With the `bigquery`
//! feature, [`gcp::GcpTableService`] implements the service on top of the REST API.

pub mod classify;
pub mod client;
pub mod error;
#[cfg(feature = "bigquery")]
pub mod gcp;
pub mod insert;
pub mod job;
mod macros;
pub mod model;
pub mod naming;
pub mod schema;
pub mod service;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
