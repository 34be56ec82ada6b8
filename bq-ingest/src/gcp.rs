//! [`TableService`] backed by the BigQuery REST API through `gcp-bigquery-client`.

use std::collections::HashMap;

use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::job::Job as GcpJob;
use gcp_bigquery_client::model::table::Table as GcpTable;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::bq_error;
use crate::classify::classify;
use crate::error::{BqError, BqResult, ErrorKind};
use crate::model::{
    ErrorPayload, InsertAllRequest, InsertAllResponse, Job, QueryResults, QueryResultsParams, Table,
};
use crate::service::TableService;

/// [`TableService`] issuing requests with an authenticated [`Client`].
#[derive(Clone)]
pub struct GcpTableService {
    client: Client,
}

impl GcpTableService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Authenticates with a service account key given as JSON.
    ///
    /// A key that cannot be parsed fails with [`ErrorKind::Configuration`].
    pub async fn from_service_account_key(sa_key: &str) -> BqResult<Self> {
        let sa_key = parse_service_account_key(sa_key)?;
        let client = ClientBuilder::new()
            .build_from_service_account_key(sa_key, false)
            .await
            .map_err(bq_error_to_bq_error)?;

        Ok(Self { client })
    }

    /// Authenticates with the service account key stored at `sa_key_path`.
    ///
    /// A missing or unreadable key file fails with [`ErrorKind::Configuration`].
    pub async fn from_service_account_key_path(sa_key_path: &str) -> BqResult<Self> {
        let client = ClientBuilder::new()
            .build_from_service_account_key_file(sa_key_path)
            .await
            .map_err(bq_error_to_bq_error)?;

        Ok(Self { client })
    }
}

impl TableService for GcpTableService {
    async fn insert_table(
        &self,
        project_id: &str,
        dataset_id: &str,
        table: Table,
    ) -> BqResult<Table> {
        debug!(project_id, dataset_id, "tables.insert");
        let table: GcpTable = convert(&table)?;

        let created = self
            .client
            .table()
            .create(table)
            .await
            .map_err(bq_error_to_bq_error)?;

        convert(&created)
    }

    async fn insert_rows(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        request: InsertAllRequest,
    ) -> BqResult<InsertAllResponse> {
        debug!(project_id, dataset_id, table_id, rows = request.rows.len(), "tabledata.insertAll");

        let mut insert_request = TableDataInsertAllRequest::new();
        for row in request.rows {
            insert_request
                .add_row(row.insert_id, row.json)
                .map_err(bq_error_to_bq_error)?;
        }

        let response = self
            .client
            .tabledata()
            .insert_all(project_id, dataset_id, table_id, insert_request)
            .await
            .map_err(bq_error_to_bq_error)?;

        convert(&response)
    }

    async fn insert_job(&self, project_id: &str, job: Job) -> BqResult<Job> {
        debug!(project_id, "jobs.insert");
        let job: GcpJob = convert(&job)?;

        let created = self
            .client
            .job()
            .insert(project_id, job)
            .await
            .map_err(bq_error_to_bq_error)?;

        convert(&created)
    }

    async fn get_job(&self, project_id: &str, job_id: &str) -> BqResult<Job> {
        debug!(project_id, job_id, "jobs.get");

        let job = self
            .client
            .job()
            .get_job(project_id, job_id, None)
            .await
            .map_err(bq_error_to_bq_error)?;

        convert(&job)
    }

    async fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        params: QueryResultsParams,
    ) -> BqResult<QueryResults> {
        debug!(project_id, job_id, "jobs.getQueryResults");
        let params: GetQueryResultsParameters = convert(&params)?;

        let results = self
            .client
            .job()
            .get_query_results(project_id, job_id, params)
            .await
            .map_err(bq_error_to_bq_error)?;

        convert(&results)
    }
}

/// Converts between the wire models of this crate and the ones of `gcp-bigquery-client`.
///
/// Both describe the same REST resources, so they are converted through their JSON form.
fn convert<T, U>(value: &T) -> BqResult<U>
where
    T: Serialize,
    U: DeserializeOwned,
{
    let value = serde_json::to_value(value)?;

    Ok(serde_json::from_value(value)?)
}

/// Converts `gcp-bigquery-client` errors into classified [`BqError`]s.
///
/// Error responses of the API are classified from their error entries, failed requests
/// become [`ErrorKind::Communication`] errors and unreadable service account keys become
/// [`ErrorKind::Configuration`] errors.
///
/// `gcp-bigquery-client` only exposes the raw body of error responses it could decode as
/// JSON. For any other failed request the HTTP body is lost: the communication error
/// carries the `reqwest` error message instead, and no status when the request failed
/// while decoding the body.
fn bq_error_to_bq_error(err: BQError) -> BqError {
    match err {
        BQError::ResponseError { error } => {
            let error_list = error
                .error
                .errors
                .iter()
                .map(error_entry_to_payload)
                .collect::<Vec<_>>();
            let server_error = json!({
                "error": {
                    "code": error.error.code,
                    "message": error.error.message,
                    "status": error.error.status,
                    "errors": error.error.errors,
                }
            });
            let primary = error_list.first().cloned().unwrap_or_default();

            classify(&primary, Some(&server_error), &error_list, None)
        }
        BQError::RequestError(err) => {
            let status = err.status().map(|status| status.as_u16());
            BqError::communication(status, err.to_string())
        }
        BQError::InvalidServiceAccountKey(_) => bq_error!(
            ErrorKind::Configuration,
            "Invalid BigQuery service account key",
            err.to_string(),
            source: err
        ),
        BQError::InvalidServiceAccountAuthenticator(_)
        | BQError::AuthError(_)
        | BQError::YupAuthError(_)
        | BQError::NoToken => bq_error!(
            ErrorKind::Authorization,
            "BigQuery authentication failed",
            err.to_string(),
            source: err
        ),
        err => bq_error!(
            ErrorKind::Client,
            "BigQuery client error",
            err.to_string(),
            source: err
        ),
    }
}

fn error_entry_to_payload(entry: &HashMap<String, String>) -> ErrorPayload {
    ErrorPayload {
        reason: entry.get("reason").cloned(),
        message: entry.get("message").cloned(),
        location: entry.get("location").cloned(),
        debug_info: entry.get("debugInfo").cloned(),
        error: entry.get("error").cloned(),
    }
}
