use std::future::Future;

use crate::error::BqResult;
use crate::model::{InsertAllRequest, InsertAllResponse, Job, QueryResults, QueryResultsParams, Table};

/// Remote BigQuery operations the client depends on.
///
/// [`TableService`] is the single seam between the client and the network. Every method
/// performs exactly one request and returns the decoded response, or a [`crate::error::BqError`]
/// already classified from the failed response. Implementations must not retry on their own,
/// retry decisions belong to the callers.
///
/// The crate ships a production implementation backed by `gcp-bigquery-client` behind the
/// `bigquery` feature and a scripted in-memory implementation behind `test-utils`.
pub trait TableService: Send + Sync {
    /// Creates a table (`tables.insert`).
    fn insert_table(
        &self,
        project_id: &str,
        dataset_id: &str,
        table: Table,
    ) -> impl Future<Output = BqResult<Table>> + Send;

    /// Streams rows into a table (`tabledata.insertAll`).
    ///
    /// Per-row failures are reported in the response, not as an error.
    fn insert_rows(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        request: InsertAllRequest,
    ) -> impl Future<Output = BqResult<InsertAllResponse>> + Send;

    /// Submits a job (`jobs.insert`).
    fn insert_job(&self, project_id: &str, job: Job) -> impl Future<Output = BqResult<Job>> + Send;

    /// Fetches the current state of a job (`jobs.get`).
    fn get_job(&self, project_id: &str, job_id: &str)
    -> impl Future<Output = BqResult<Job>> + Send;

    /// Reads the results of a query job (`jobs.getQueryResults`).
    fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        params: QueryResultsParams,
    ) -> impl Future<Output = BqResult<QueryResults>> + Send;
}
