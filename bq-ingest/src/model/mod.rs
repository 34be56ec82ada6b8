//! Wire models exchanged with the BigQuery REST API.
//!
//! Field names follow the REST resources (camelCase on the wire). Only the fields the
//! client reads or writes are modelled; unknown fields are ignored when deserializing.

mod error;
mod job;
mod query;
mod table;
mod tabledata;

pub use error::{ErrorPayload, JobRef};
pub use job::{
    Job, JobConfiguration, JobConfigurationLoad, JobState, JobStatus, SourceFormat,
    WriteDisposition,
};
pub use query::{QueryResults, QueryResultsParams};
pub use table::{Table, TableReference, TableSchema};
pub use tabledata::{InsertAllRequest, InsertAllResponse, InsertError, InsertRow};
