use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::BqResult;
use crate::model::{
    InsertAllRequest, InsertAllResponse, Job, JobRef, JobState, QueryResults, QueryResultsParams,
    Table, TableReference,
};
use crate::service::TableService;
use crate::test_utils::responses;

/// A request received by [`FakeTableService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    InsertTable {
        project_id: String,
        dataset_id: String,
        table: Table,
    },
    InsertRows {
        table: TableReference,
        request: InsertAllRequest,
    },
    InsertJob {
        project_id: String,
        job: Job,
    },
    GetJob {
        project_id: String,
        job_id: String,
    },
    GetQueryResults {
        project_id: String,
        job_id: String,
        params: QueryResultsParams,
    },
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<ServiceCall>,
    insert_table: VecDeque<BqResult<Table>>,
    insert_rows: VecDeque<BqResult<InsertAllResponse>>,
    insert_job: VecDeque<BqResult<Job>>,
    get_job: VecDeque<BqResult<Job>>,
    get_query_results: VecDeque<BqResult<QueryResults>>,
}

/// In-memory [`TableService`] replaying scripted responses.
///
/// Responses are returned in the order they were pushed, per operation. Once an operation
/// runs out of scripted responses it succeeds: tables and jobs are echoed back, inserts
/// report no row errors, jobs are reported done and query results are empty.
#[derive(Debug, Clone, Default)]
pub struct FakeTableService {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTableService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_insert_table(&self, response: BqResult<Table>) {
        self.inner.lock().await.insert_table.push_back(response);
    }

    pub async fn push_insert_rows(&self, response: BqResult<InsertAllResponse>) {
        self.inner.lock().await.insert_rows.push_back(response);
    }

    pub async fn push_insert_job(&self, response: BqResult<Job>) {
        self.inner.lock().await.insert_job.push_back(response);
    }

    pub async fn push_get_job(&self, response: BqResult<Job>) {
        self.inner.lock().await.get_job.push_back(response);
    }

    pub async fn push_get_query_results(&self, response: BqResult<QueryResults>) {
        self.inner.lock().await.get_query_results.push_back(response);
    }

    /// Returns every request received so far, in order.
    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Returns the bodies of every `insertAll` request received so far, in order.
    pub async fn insert_rows_requests(&self) -> Vec<InsertAllRequest> {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::InsertRows { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TableService for FakeTableService {
    async fn insert_table(
        &self,
        project_id: &str,
        dataset_id: &str,
        table: Table,
    ) -> BqResult<Table> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ServiceCall::InsertTable {
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            table: table.clone(),
        });

        inner.insert_table.pop_front().unwrap_or(Ok(table))
    }

    async fn insert_rows(
        &self,
        project_id: &str,
        dataset_id: &str,
        table_id: &str,
        request: InsertAllRequest,
    ) -> BqResult<InsertAllResponse> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ServiceCall::InsertRows {
            table: TableReference::new(project_id, dataset_id, table_id),
            request,
        });

        inner
            .insert_rows
            .pop_front()
            .unwrap_or_else(|| Ok(responses::insert_success()))
    }

    async fn insert_job(&self, project_id: &str, job: Job) -> BqResult<Job> {
        let mut inner = self.inner.lock().await;
        let job_id = format!("job_{}", inner.calls.len());
        inner.calls.push(ServiceCall::InsertJob {
            project_id: project_id.to_string(),
            job: job.clone(),
        });

        inner.insert_job.pop_front().unwrap_or_else(|| {
            let mut created = responses::job(project_id, &job_id, JobState::Pending);
            created.configuration = job.configuration;
            Ok(created)
        })
    }

    async fn get_job(&self, project_id: &str, job_id: &str) -> BqResult<Job> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ServiceCall::GetJob {
            project_id: project_id.to_string(),
            job_id: job_id.to_string(),
        });

        inner
            .get_job
            .pop_front()
            .unwrap_or_else(|| Ok(responses::job(project_id, job_id, JobState::Done)))
    }

    async fn get_query_results(
        &self,
        project_id: &str,
        job_id: &str,
        params: QueryResultsParams,
    ) -> BqResult<QueryResults> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(ServiceCall::GetQueryResults {
            project_id: project_id.to_string(),
            job_id: job_id.to_string(),
            params,
        });

        inner.get_query_results.pop_front().unwrap_or_else(|| {
            Ok(QueryResults {
                job_reference: Some(JobRef::new(project_id, job_id)),
                job_complete: Some(true),
                total_rows: Some("0".to_string()),
                ..Default::default()
            })
        })
    }
}
