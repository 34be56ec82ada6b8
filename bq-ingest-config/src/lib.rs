//! Configuration of the BigQuery ingestion binaries.
//!
//! Settings are read from the `configuration` directory and can be overridden through
//! `APP_`-prefixed environment variables, see [`load_config`].

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config, load_config_from};
