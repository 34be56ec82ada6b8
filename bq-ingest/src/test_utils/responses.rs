use crate::model::{ErrorPayload, InsertAllResponse, InsertError, Job, JobRef, JobState, JobStatus};

/// Kind BigQuery reports in `insertAll` responses.
pub const INSERT_ALL_RESPONSE_KIND: &str = "bigquery#tableDataInsertAllResponse";

/// Returns the response of an `insertAll` request without row errors.
pub fn insert_success() -> InsertAllResponse {
    InsertAllResponse {
        kind: Some(INSERT_ALL_RESPONSE_KIND.to_string()),
        insert_errors: None,
    }
}

/// Returns the response of an `insertAll` request reporting `insert_errors`.
pub fn insert_failure(insert_errors: Vec<InsertError>) -> InsertAllResponse {
    InsertAllResponse {
        kind: Some(INSERT_ALL_RESPONSE_KIND.to_string()),
        insert_errors: Some(insert_errors),
    }
}

/// Returns the errors of a row rejected for `reason`.
pub fn row_error(index: usize, reason: &str, message: &str) -> InsertError {
    InsertError {
        index,
        errors: vec![ErrorPayload::new(reason, message)],
    }
}

/// Returns the errors BigQuery reports for a batch in which the rows at `invalid` are
/// invalid: those rows with reason `invalid`, every other row with reason `stopped`.
pub fn batch_errors(row_count: usize, invalid: &[usize]) -> Vec<InsertError> {
    (0..row_count)
        .map(|index| {
            if invalid.contains(&index) {
                row_error(index, "invalid", "no such field: unknown")
            } else {
                row_error(index, "stopped", "")
            }
        })
        .collect()
}

/// Returns a job in `state` without errors.
pub fn job(project_id: &str, job_id: &str, state: JobState) -> Job {
    Job {
        job_reference: Some(JobRef::new(project_id, job_id)),
        configuration: None,
        status: Some(JobStatus {
            state: Some(state),
            error_result: None,
            errors: None,
        }),
    }
}

/// Returns a job that finished with `error_result`, reporting `errors` as well.
pub fn failed_job(
    project_id: &str,
    job_id: &str,
    error_result: ErrorPayload,
    errors: Vec<ErrorPayload>,
) -> Job {
    let mut job = job(project_id, job_id, JobState::Done);
    if let Some(status) = job.status.as_mut() {
        status.error_result = Some(error_result);
        status.errors = Some(errors);
    }

    job
}
