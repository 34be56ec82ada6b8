//! Load jobs importing newline-delimited JSON files from Cloud Storage.

use tracing::{debug, error, info};

use crate::bail;
use crate::classify::classify;
use crate::error::{BqError, BqResult, ErrorKind};
use crate::model::{
    Job, JobConfiguration, JobConfigurationLoad, JobRef, JobState, SourceFormat, TableReference,
    WriteDisposition,
};
use crate::service::TableService;

const GCS_SCHEME: &str = "gs://";

/// Returns `location` as a `gs://` URI.
///
/// Locations already carrying the scheme are returned unchanged, otherwise leading slashes
/// are trimmed so that `/bucket/file.json` and `bucket/file.json` name the same object.
pub fn normalize_source_uri(location: &str) -> String {
    if location.starts_with(GCS_SCHEME) {
        return location.to_string();
    }

    format!("{GCS_SCHEME}{}", location.trim_start_matches('/'))
}

/// Builds the job resource appending the files at `source_uris` to `table`.
pub fn load_job_spec(table: &TableReference, source_uris: &[String]) -> Job {
    let load = JobConfigurationLoad {
        source_format: SourceFormat::NewlineDelimitedJson,
        write_disposition: WriteDisposition::WriteAppend,
        source_uris: source_uris
            .iter()
            .map(|location| normalize_source_uri(location))
            .collect(),
        destination_table: table.clone(),
    };

    Job {
        job_reference: None,
        configuration: Some(JobConfiguration { load: Some(load) }),
        status: None,
    }
}

/// Submits load jobs and checks on their progress.
///
/// Polling is single-shot: callers decide how often to poll and when to give up.
#[derive(Debug)]
pub struct LoadJobs<'a, S> {
    service: &'a S,
}

impl<'a, S> LoadJobs<'a, S>
where
    S: TableService,
{
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Submits a job loading `source_uris` into `table` and returns the created job.
    ///
    /// A job rejected at submission fails with its classified error result.
    pub async fn submit_load_job(
        &self,
        table: &TableReference,
        source_uris: &[String],
    ) -> BqResult<Job> {
        if source_uris.is_empty() {
            bail!(
                ErrorKind::Client,
                "Load job requires at least one source URI",
                table
            );
        }

        let spec = load_job_spec(table, source_uris);
        info!(%table, sources = source_uris.len(), "submitting load job");
        debug!(?spec, "load job");

        let job = self.service.insert_job(&table.project_id, spec).await?;

        if let Some(err) = job_failure(&job, job.job_reference.as_ref())? {
            error!(%table, error = %err, "load job rejected");
            return Err(err);
        }

        Ok(job)
    }

    /// Checks once on the job `job_id`.
    ///
    /// Returns normally while the job runs and once it completed successfully. A job that
    /// completed with an error result fails with the classified error.
    pub async fn poll_job(&self, project_id: &str, job_id: &str) -> BqResult<()> {
        self.poll_job_state(project_id, job_id).await.map(|_| ())
    }

    /// Checks once on the job `job_id` and returns its observed state.
    ///
    /// Fails like [`LoadJobs::poll_job`]. A missing or unrecognized state is reported as
    /// [`JobState::Unknown`], which is not terminal.
    pub async fn poll_job_state(&self, project_id: &str, job_id: &str) -> BqResult<JobState> {
        let job = self.service.get_job(project_id, job_id).await?;

        let state = job
            .status
            .as_ref()
            .map(|status| status.state())
            .unwrap_or(JobState::Unknown);
        if !state.is_terminal() {
            debug!(project_id, job_id, ?state, "job still running");
            return Ok(state);
        }

        let job_ref = JobRef::new(project_id, job_id);
        if let Some(err) = job_failure(&job, Some(&job_ref))? {
            error!(%job_ref, error = %err, "job failed");
            return Err(err);
        }

        info!(%job_ref, "job done");

        Ok(state)
    }
}

/// Classifies the error result of `job`, if it has one.
fn job_failure(job: &Job, job_ref: Option<&JobRef>) -> BqResult<Option<BqError>> {
    let Some(status) = &job.status else {
        return Ok(None);
    };
    let Some(error_result) = &status.error_result else {
        return Ok(None);
    };

    let server_error = serde_json::to_value(status)?;

    Ok(Some(classify(
        error_result,
        Some(&server_error),
        status.errors(),
        job_ref,
    )))
}
