use std::sync::Once;

use ::tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable enabling log output in tests.
const ENABLE_TRACING_ENV: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

/// Installs a global subscriber printing events to stdout.
///
/// Filtering follows `RUST_LOG`, defaulting to `info` for `app_name` and the client crate.
/// Fails if a global subscriber is already installed.
pub fn init_tracing(app_name: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let default_filter = format!("{}=info,bq_ingest=info", app_name.replace('-', "_"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    debug!(app_name, "tracing initialized");

    Ok(())
}

/// Installs a test subscriber once per process when `ENABLE_TRACING` is set.
///
/// Output goes through the test writer so it is captured per test.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV).is_err() {
            return;
        }

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}
