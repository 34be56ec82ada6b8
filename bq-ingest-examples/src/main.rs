/*
BigQuery ingestion example

Streams JSON rows into a table, creates tables and runs load jobs importing
newline-delimited JSON files from Cloud Storage. Credentials and defaults are
read from the `configuration` directory (see `configuration/base.yaml`).

Usage:
    cargo run -p bq-ingest-examples -- create-table --table events --schema schema.json --days 7
    cargo run -p bq-ingest-examples -- insert --table events20240131 --rows rows.json
    cargo run -p bq-ingest-examples -- load --table events bucket/2024/01/31/part-0.json
*/

mod commands;

use anyhow::{Context, anyhow};
use bq_ingest::client::BigQueryClient;
use bq_ingest::gcp::GcpTableService;
use bq_ingest_config::load_config;
use bq_ingest_config::shared::IngestConfig;
use bq_ingest_telemetry::tracing::init_tracing;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing::error;

use crate::commands::{CreateTableArgs, InsertArgs, LoadArgs};

const APP_NAME: &str = "bq-ingest";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about, arg_required_else_help = true)]
struct AppArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a table, or one table per day
    CreateTable(CreateTableArgs),
    /// Stream rows from a JSON file into a table
    Insert(InsertArgs),
    /// Load JSON files from Cloud Storage into a table and wait for the job
    Load(LoadArgs),
}

#[tokio::main]
async fn main() {
    // Without a subscriber, errors can only be reported on stderr.
    if let Err(err) = init_tracing(APP_NAME) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    if let Err(err) = main_impl().await {
        error!("{err:?}");
        std::process::exit(1);
    }
}

async fn main_impl() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install default crypto provider"))?;

    let args = AppArgs::parse();

    let config: IngestConfig = load_config().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let service =
        GcpTableService::from_service_account_key(config.bigquery.service_account_key.expose_secret())
            .await?;
    let client = BigQueryClient::new(service);

    match args.command {
        Command::CreateTable(args) => commands::create_table(&client, &config, args).await,
        Command::Insert(args) => commands::insert(&client, &config, args).await,
        Command::Load(args) => commands::load(&client, &config, args).await,
    }
}
