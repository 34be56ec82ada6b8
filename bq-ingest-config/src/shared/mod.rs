//! Configuration types shared by the ingestion binaries.

mod base;
mod bigquery;
mod ingest;
mod insert;
mod load_job;

pub use base::ValidationError;
pub use bigquery::BigQueryConfig;
pub use ingest::IngestConfig;
pub use insert::InsertConfig;
pub use load_job::LoadJobConfig;
