//! Streaming inserts with an optional second pass that skips invalid rows.
//!
//! BigQuery rejects a whole `insertAll` batch when any row in it is invalid: offending
//! rows are reported with reason `invalid` and every other row as `stopped`. When the
//! caller opts in, [`RowInserter`] retries once with the invalid rows removed.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::bail;
use crate::error::{BqResult, ErrorKind};
use crate::model::{InsertAllRequest, InsertAllResponse, InsertError, InsertRow, TableReference};
use crate::service::TableService;

/// Text BigQuery uses in row errors when a row is larger than the streaming limit.
pub const MAXIMUM_ROW_SIZE_EXCEEDED: &str = "Maximum allowed row size exceeded";

/// Reason of row errors caused by the row itself, as opposed to `stopped` rows.
const INVALID_ROW_REASON: &str = "invalid";

/// Rows ready to be sent in a single `insertAll` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    rows: Vec<InsertRow>,
}

impl RowBatch {
    /// Creates a batch from JSON records, without insert ids.
    pub fn new(records: Vec<Value>) -> Self {
        let rows = records
            .into_iter()
            .map(|json| InsertRow {
                json,
                insert_id: None,
            })
            .collect();

        Self { rows }
    }

    /// Creates a batch whose insert ids are computed by `insert_id` from each record.
    ///
    /// `insert_id` is called exactly once per record, in order.
    pub fn with_insert_ids<F>(records: Vec<Value>, mut insert_id: F) -> Self
    where
        F: FnMut(&Value) -> String,
    {
        let rows = records
            .into_iter()
            .map(|json| {
                let insert_id = insert_id(&json);
                InsertRow {
                    json,
                    insert_id: Some(insert_id),
                }
            })
            .collect();

        Self { rows }
    }

    /// Serializes typed records into a batch.
    pub fn from_records<T: Serialize>(records: &[T]) -> BqResult<Self> {
        let records = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[InsertRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<InsertRow> {
        self.rows
    }
}

impl From<Value> for RowBatch {
    /// A JSON array becomes one row per element, any other value a single row.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(records) => RowBatch::new(records),
            record => RowBatch::new(vec![record]),
        }
    }
}

impl From<Vec<Value>> for RowBatch {
    fn from(records: Vec<Value>) -> Self {
        RowBatch::new(records)
    }
}

/// Result of a streaming insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// A single request was issued. Its response may still report row errors when invalid
    /// rows were not ignored.
    Single(InsertAllResponse),
    /// The first request reported row errors and the valid rows were sent again.
    TwoPass {
        first_pass: InsertAllResponse,
        second_pass: InsertAllResponse,
        /// Number of rows excluded from the second pass.
        invalid_row_count: usize,
        /// Number of rows sent in the second pass.
        accepted_row_count: usize,
    },
}

impl InsertOutcome {
    /// Returns the response of the first request.
    pub fn first_pass(&self) -> &InsertAllResponse {
        match self {
            InsertOutcome::Single(response) => response,
            InsertOutcome::TwoPass { first_pass, .. } => first_pass,
        }
    }

    /// Returns the response of the second request, if one was issued.
    pub fn second_pass(&self) -> Option<&InsertAllResponse> {
        match self {
            InsertOutcome::Single(_) => None,
            InsertOutcome::TwoPass { second_pass, .. } => Some(second_pass),
        }
    }
}

/// Returns `true` when any row was rejected for exceeding the maximum row size.
///
/// BigQuery has no reason code for this condition, so the serialized errors are searched
/// for the message it reports.
pub fn exceeds_maximum_row_size(insert_errors: &[InsertError]) -> BqResult<bool> {
    let insert_errors = serde_json::to_string(insert_errors)?;

    Ok(insert_errors.contains(MAXIMUM_ROW_SIZE_EXCEEDED))
}

/// Returns the indices of rows rejected because they are invalid themselves.
pub fn invalid_row_indices(insert_errors: &[InsertError]) -> BTreeSet<usize> {
    insert_errors
        .iter()
        .filter(|insert_error| insert_error.has_reason(INVALID_ROW_REASON))
        .map(|insert_error| insert_error.index)
        .collect()
}

/// Streams row batches into a table through a [`TableService`].
#[derive(Debug)]
pub struct RowInserter<'a, S> {
    service: &'a S,
}

impl<'a, S> RowInserter<'a, S>
where
    S: TableService,
{
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Inserts `batch` into `table`.
    ///
    /// Row errors are returned in the response unless `ignore_invalid_rows` is set, in
    /// which case the rows not reported as invalid are inserted again, once, and both
    /// responses are returned. Rows exceeding the maximum row size always fail the insert
    /// with [`ErrorKind::StreamingRowTooLarge`].
    pub async fn insert_rows(
        &self,
        table: &TableReference,
        batch: RowBatch,
        ignore_invalid_rows: bool,
    ) -> BqResult<InsertOutcome> {
        let rows = batch.into_rows();
        info!(%table, rows = rows.len(), "inserting rows");

        let first_pass = self.send(table, rows.clone()).await?;

        let Some(insert_errors) = first_pass.insert_errors.as_deref() else {
            info!(%table, rows = rows.len(), "inserted rows");
            return Ok(InsertOutcome::Single(first_pass));
        };

        if exceeds_maximum_row_size(insert_errors)? {
            bail!(
                ErrorKind::StreamingRowTooLarge,
                "Streaming insert rejected a row exceeding the maximum allowed row size",
                table
            );
        }

        error!(%table, failed_rows = insert_errors.len(), "failed to insert rows");
        debug!(?insert_errors, "row errors");

        if !ignore_invalid_rows {
            return Ok(InsertOutcome::Single(first_pass));
        }

        let invalid_rows = invalid_row_indices(insert_errors);
        let retried_rows = rows
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !invalid_rows.contains(index))
            .map(|(_, row)| row)
            .collect::<Vec<_>>();

        let invalid_row_count = invalid_rows.len();
        let accepted_row_count = retried_rows.len();
        warn!(
            %table,
            invalid_rows = invalid_row_count,
            retried_rows = accepted_row_count,
            "retrying insert without invalid rows"
        );

        let second_pass = self.send(table, retried_rows).await?;

        Ok(InsertOutcome::TwoPass {
            first_pass,
            second_pass,
            invalid_row_count,
            accepted_row_count,
        })
    }

    async fn send(
        &self,
        table: &TableReference,
        rows: Vec<InsertRow>,
    ) -> BqResult<InsertAllResponse> {
        self.service
            .insert_rows(
                &table.project_id,
                &table.dataset_id,
                &table.table_id,
                InsertAllRequest { rows },
            )
            .await
    }
}
