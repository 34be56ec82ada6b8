use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use bq_ingest::client::{BigQueryClient, CreateTableOptions};
use bq_ingest::insert::{InsertOutcome, RowBatch};
use bq_ingest::naming::daily_table_names;
use bq_ingest::schema::TableFieldSchema;
use bq_ingest::service::TableService;
use bq_ingest_config::shared::IngestConfig;
use clap::Args;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct CreateTableArgs {
    /// Table id, or table id prefix when `--days` is set
    #[arg(long)]
    table: String,

    /// JSON file holding the list of schema fields
    #[arg(long)]
    schema: PathBuf,

    /// Create one table per day, starting today, suffixed with the date
    #[arg(long)]
    days: Option<u32>,

    /// Fail when the table already exists
    #[arg(long)]
    fail_if_exists: bool,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
pub struct InsertArgs {
    #[arg(long)]
    table: String,

    /// JSON file holding an object or an array of objects, or newline-delimited JSON
    #[arg(long)]
    rows: PathBuf,

    /// Field of each row used as its insert id
    #[arg(long)]
    insert_id_field: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[arg(long)]
    table: String,

    /// Cloud Storage locations of the files, as `bucket/path` or `gs://bucket/path`
    #[arg(required = true)]
    sources: Vec<String>,
}

pub async fn create_table<S: TableService>(
    client: &BigQueryClient<S>,
    config: &IngestConfig,
    args: CreateTableArgs,
) -> anyhow::Result<()> {
    let schema = fs::read_to_string(&args.schema)
        .with_context(|| format!("failed to read schema file {}", args.schema.display()))?;
    let fields: Vec<TableFieldSchema> =
        serde_json::from_str(&schema).context("failed to parse schema fields")?;

    let table_ids = match args.days {
        Some(days) => daily_table_names(&args.table, days),
        None => vec![args.table],
    };

    for table_id in table_ids {
        let options = CreateTableOptions {
            ignore_existing: !args.fail_if_exists,
            description: args.description.clone(),
            ..Default::default()
        };

        let created = client
            .create_table(
                &config.bigquery.project_id,
                &config.bigquery.dataset_id,
                &table_id,
                fields.clone(),
                options,
            )
            .await?;

        match created {
            Some(_) => info!(%table_id, "table created"),
            None => info!(%table_id, "table already exists"),
        }
    }

    Ok(())
}

pub async fn insert<S: TableService>(
    client: &BigQueryClient<S>,
    config: &IngestConfig,
    args: InsertArgs,
) -> anyhow::Result<()> {
    let contents = fs::read_to_string(&args.rows)
        .with_context(|| format!("failed to read rows file {}", args.rows.display()))?;
    let rows = parse_rows(&contents)?;

    for chunk in rows.chunks(config.insert.max_batch_size) {
        let batch = match &args.insert_id_field {
            Some(field) => RowBatch::with_insert_ids(chunk.to_vec(), |row| insert_id(row, field)),
            None => chunk.to_vec().into(),
        };

        let outcome = client
            .insert_rows(
                &config.bigquery.project_id,
                &config.bigquery.dataset_id,
                &args.table,
                batch,
                config.insert.ignore_invalid_rows,
            )
            .await?;

        match outcome {
            InsertOutcome::Single(response) if response.insert_errors.is_some() => {
                bail!(
                    "{} rows were rejected, set `insert.ignore_invalid_rows` to skip invalid rows",
                    response.insert_errors().len()
                );
            }
            InsertOutcome::Single(_) => info!(rows = chunk.len(), "rows inserted"),
            InsertOutcome::TwoPass {
                second_pass,
                invalid_row_count,
                accepted_row_count,
                ..
            } => {
                warn!(
                    invalid_rows = invalid_row_count,
                    retried_rows = accepted_row_count,
                    second_pass_errors = second_pass.insert_errors().len(),
                    "inserted rows without invalid ones"
                );
            }
        }
    }

    Ok(())
}

pub async fn load<S: TableService>(
    client: &BigQueryClient<S>,
    config: &IngestConfig,
    args: LoadArgs,
) -> anyhow::Result<()> {
    let project_id = &config.bigquery.project_id;

    let job = client
        .create_insert_job(project_id, &config.bigquery.dataset_id, &args.table, &args.sources)
        .await?;
    let Some(job_ref) = job.job_reference else {
        bail!("BigQuery did not return a reference for the load job");
    };
    info!(%job_ref, "load job submitted");

    let poll_interval = Duration::from_millis(config.load.poll_interval_ms);
    for _ in 0..config.load.max_polls {
        let state = client.insert_job_state(project_id, &job_ref.job_id).await?;
        if state.is_terminal() {
            info!(%job_ref, "load job done");
            return Ok(());
        }

        tokio::time::sleep(poll_interval).await;
    }

    bail!(
        "load job {job_ref} did not complete after {} polls",
        config.load.max_polls
    )
}

/// Returns the value of `field` in `row`, unquoted when it is a string.
fn insert_id(row: &Value, field: &str) -> String {
    match row.get(field) {
        Some(Value::String(id)) => id.clone(),
        Some(id) => id.to_string(),
        None => String::new(),
    }
}

/// Parses a JSON document, falling back to one JSON value per line.
fn parse_rows(contents: &str) -> anyhow::Result<Vec<Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(contents) {
        return Ok(match value {
            Value::Array(rows) => rows,
            row => vec![row],
        });
    }

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid JSON on row {index}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_are_read_from_json_and_ndjson() {
        assert_eq!(parse_rows(r#"{"a": 1}"#).unwrap(), vec![json!({"a": 1})]);
        assert_eq!(
            parse_rows(r#"[{"a": 1}, {"a": 2}]"#).unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
        assert_eq!(
            parse_rows("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap(),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
        assert!(parse_rows("{\"a\": 1}\nnot json\n").is_err());
    }

    #[test]
    fn insert_ids_are_read_from_fields() {
        let row = json!({"uuid": "abc", "seq": 7});

        assert_eq!(insert_id(&row, "uuid"), "abc");
        assert_eq!(insert_id(&row, "seq"), "7");
        assert_eq!(insert_id(&row, "missing"), "");
    }
}
