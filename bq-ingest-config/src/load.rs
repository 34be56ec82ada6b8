use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for the base and environment files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of the environment variables overriding file settings.
const ENV_PREFIX: &str = "APP";

/// Separator between [`ENV_PREFIX`] and the first key segment.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator of nested keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Configuration file being merged, used to name it in errors.
#[derive(Debug, Clone, Copy)]
enum ConfigFileKind {
    /// Settings shared by every environment.
    Base,
    /// Overrides for a single environment.
    Environment(Environment),
}

impl ConfigFileKind {
    /// File name of the configuration file without its extension.
    fn stem(&self) -> &'static str {
        match self {
            ConfigFileKind::Base => "base",
            ConfigFileKind::Environment(env) => env.as_str(),
        }
    }
}

impl fmt::Display for ConfigFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileKind::Base => f.write_str("base configuration"),
            ConfigFileKind::Environment(env) => write!(f, "{env} environment configuration"),
        }
    }
}

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The working directory could not be read.
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// The directory expected to hold the configuration files is missing.
    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    /// Neither extension of the base or environment file exists.
    #[error("could not locate {kind_description} in `{directory}`; attempted: {attempted}")]
    ConfigurationFileMissing {
        kind_description: String,
        directory: PathBuf,
        attempted: String,
    },

    /// A configuration file exists but is not valid for its format.
    #[error("failed to load {kind_description} from `{path}`: {source}")]
    ConfigurationFileLoad {
        kind_description: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    /// The merged settings do not match the requested configuration type.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),

    /// `APP_ENVIRONMENT` names an unsupported environment.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] io::Error),

    /// Merging the environment variable overrides failed.
    #[error("failed to build configuration: {0}")]
    Builder(#[source] config::ConfigError),
}

/// Loads the configuration from `./configuration` for the environment selected by
/// `APP_ENVIRONMENT`.
///
/// See [`load_config_from`] for the sources that are merged.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    load_config_from(&base_path.join(CONFIGURATION_DIR), environment)
}

/// Loads the configuration from `directory`.
///
/// Merges `base.(yaml|yml|json)`, then `{environment}.(yaml|yml|json)`, then
/// `APP_`-prefixed environment variables. Nested keys are separated by double
/// underscores (`APP_BIGQUERY__PROJECT_ID`).
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let base_file = find_configuration_file(directory, ConfigFileKind::Base)?;
    let environment_file =
        find_configuration_file(directory, ConfigFileKind::Environment(environment))?;

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let builder = config::Config::builder().add_source(config::File::from(base_file.clone()));
    check_source(&builder, ConfigFileKind::Base, &base_file)?;

    let builder = builder.add_source(config::File::from(environment_file.clone()));
    check_source(
        &builder,
        ConfigFileKind::Environment(environment),
        &environment_file,
    )?;

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

/// Returns the first existing file for `kind`, trying each supported extension.
fn find_configuration_file(
    directory: &Path,
    kind: ConfigFileKind,
) -> Result<PathBuf, LoadConfigError> {
    let stem = kind.stem();
    let attempted_paths = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .collect::<Vec<_>>();

    if let Some(path) = attempted_paths.iter().find(|path| path.is_file()) {
        return Ok(path.clone());
    }

    let attempted = attempted_paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::ConfigurationFileMissing {
        kind_description: kind.to_string(),
        directory: directory.to_path_buf(),
        attempted,
    })
}

/// Builds the sources added so far so that parse errors name the offending file.
fn check_source(
    builder: &ConfigBuilder<DefaultState>,
    kind: ConfigFileKind,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::ConfigurationFileLoad {
            kind_description: kind.to_string(),
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::shared::IngestConfig;

    fn config_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let directory = std::env::temp_dir().join(format!(
            "bq-ingest-config-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&directory);
        fs::create_dir_all(&directory).unwrap();

        for (file, contents) in files {
            fs::write(directory.join(file), contents).unwrap();
        }

        directory
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let directory = config_dir(
            "overrides",
            &[
                (
                    "base.yaml",
                    "bigquery:\n  project_id: base-project\n  dataset_id: events\n  service_account_key: '{}'\ninsert:\n  max_batch_size: 200\n",
                ),
                ("prod.json", r#"{"bigquery": {"project_id": "prod-project"}}"#),
            ],
        );

        let config: IngestConfig = load_config_from(&directory, Environment::Prod).unwrap();

        assert_eq!(config.bigquery.project_id, "prod-project");
        assert_eq!(config.bigquery.dataset_id, "events");
        assert_eq!(config.bigquery.service_account_key.expose_secret(), "{}");
        assert_eq!(config.insert.max_batch_size, 200);
        assert!(!config.insert.ignore_invalid_rows);
        config.validate().unwrap();

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn missing_environment_file_is_reported() {
        let directory = config_dir("missing", &[("base.yaml", "bigquery: {}\n")]);

        let err = load_config_from::<IngestConfig>(&directory, Environment::Dev).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::ConfigurationFileMissing { .. }
        ));
        assert!(err.to_string().contains("dev environment configuration"));

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn missing_directory_is_reported() {
        let directory = std::env::temp_dir().join("bq-ingest-config-does-not-exist");

        let err = load_config_from::<IngestConfig>(&directory, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingConfigurationDirectory(_)));
    }
}
