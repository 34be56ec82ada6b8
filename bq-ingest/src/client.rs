use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::{BqResult, ErrorKind};
use crate::insert::{InsertOutcome, RowBatch, RowInserter};
use crate::job::LoadJobs;
use crate::model::{Job, JobState, QueryResults, QueryResultsParams, Table, TableReference, TableSchema};
use crate::schema::TableFieldSchema;
use crate::service::TableService;

/// Optional settings of [`BigQueryClient::create_table`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateTableOptions {
    /// Treat an already existing table as success instead of failing with
    /// [`ErrorKind::Duplicate`].
    pub ignore_existing: bool,
    pub description: Option<String>,
    pub friendly_name: Option<String>,
    /// When the table is deleted by BigQuery.
    pub expiration: Option<DateTime<Utc>>,
}

/// BigQuery client for creating tables, streaming rows and running load jobs.
///
/// Every failure is logged before being returned unchanged.
#[derive(Debug, Clone)]
pub struct BigQueryClient<S> {
    service: S,
}

impl<S> BigQueryClient<S>
where
    S: TableService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Creates the table `table_id` with the given schema `fields`.
    ///
    /// Returns the created table, or `None` when the table already exists and
    /// [`CreateTableOptions::ignore_existing`] is set.
    pub async fn create_table(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        fields: Vec<TableFieldSchema>,
        options: CreateTableOptions,
    ) -> BqResult<Option<Table>> {
        let table_reference = TableReference::new(project_id, dataset_id, table_id);
        info!(table = %table_reference, "creating table");

        let table = Table {
            table_reference,
            schema: Some(TableSchema { fields }),
            friendly_name: options.friendly_name,
            description: options.description,
            expiration_time: options
                .expiration
                .map(|expiration| expiration.timestamp_millis().to_string()),
            creation_time: None,
        };

        match self
            .service
            .insert_table(project_id, dataset_id, table)
            .await
        {
            Ok(table) => {
                info!(table = %table.table_reference, "created table");
                Ok(Some(table))
            }
            Err(err) if options.ignore_existing && err.kind() == ErrorKind::Duplicate => {
                info!(project_id, dataset_id, table_id, "table already exists");
                Ok(None)
            }
            Err(err) => {
                error!(project_id, dataset_id, table_id, error = %err, "failed to create table");
                Err(err)
            }
        }
    }

    /// Streams `rows` into `table_id`, see [`RowInserter::insert_rows`].
    pub async fn insert_rows(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        rows: impl Into<RowBatch>,
        ignore_invalid_rows: bool,
    ) -> BqResult<InsertOutcome> {
        let table = TableReference::new(project_id, dataset_id, table_id);

        RowInserter::new(&self.service)
            .insert_rows(&table, rows.into(), ignore_invalid_rows)
            .await
            .inspect_err(|err| error!(%table, error = %err, "failed to insert rows"))
    }

    /// Submits a job appending the JSON files at `source_uris` to `table_id`.
    pub async fn create_insert_job(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        source_uris: &[String],
    ) -> BqResult<Job> {
        let table = TableReference::new(project_id, dataset_id, table_id);

        LoadJobs::new(&self.service)
            .submit_load_job(&table, source_uris)
            .await
            .inspect_err(|err| error!(%table, error = %err, "failed to create load job"))
    }

    /// Checks once on a load job, failing if it completed with an error.
    pub async fn monitor_insert_job(&self, project_id: &str, job_id: &str) -> BqResult<()> {
        self.insert_job_state(project_id, job_id).await.map(|_| ())
    }

    /// Checks once on a load job and returns its state, failing like
    /// [`BigQueryClient::monitor_insert_job`].
    pub async fn insert_job_state(&self, project_id: &str, job_id: &str) -> BqResult<JobState> {
        LoadJobs::new(&self.service)
            .poll_job_state(project_id, job_id)
            .await
            .inspect_err(|err| error!(project_id, job_id, error = %err, "failed to monitor job"))
    }

    pub async fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        params: QueryResultsParams,
    ) -> BqResult<QueryResults> {
        self.service
            .get_query_results(project_id, job_id, params)
            .await
            .inspect_err(|err| {
                error!(project_id, job_id, error = %err, "failed to get query results")
            })
    }
}
