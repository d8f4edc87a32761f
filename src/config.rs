use directories::ProjectDirs;
use log::debug;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EtlError, Result};

pub const ENV_DATA_DIR: &str = "ETL_DATA_DIR";
pub const ENV_SOURCE_WORKBOOK: &str = "ETL_SOURCE_WORKBOOK";
pub const ENV_STAGING_DIR: &str = "ETL_STAGING_DIR";
pub const ENV_PROCESSED_DIR: &str = "ETL_PROCESSED_DIR";
pub const ENV_DATABASE: &str = "ETL_DATABASE";
pub const ENV_RETRIES: &str = "ETL_RETRIES";
pub const ENV_RETRY_DELAY_SECS: &str = "ETL_RETRY_DELAY_SECS";

const DEFAULT_RETRIES: u32 = 1;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Where the pipeline reads and writes, and how stages are retried
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source_workbook: PathBuf,
    pub staging_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub database: PathBuf,
    /// Extra attempts after a stage fails
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Settings {
    /// Default layout under one data directory
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            source_workbook: data_dir.join("raw").join("ciranda_kids.xlsx"),
            staging_dir: data_dir.join("staging"),
            processed_dir: data_dir.join("processed"),
            database: data_dir.join("warehouse.db"),
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Resolve from the process environment
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| env::var(key).ok())
    }

    /// Resolve from any key lookup, falling back to defaults
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let mut settings = Self::with_data_dir(&data_dir);

        if let Some(path) = get(ENV_SOURCE_WORKBOOK) {
            settings.source_workbook = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_STAGING_DIR) {
            settings.staging_dir = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_PROCESSED_DIR) {
            settings.processed_dir = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_DATABASE) {
            settings.database = PathBuf::from(path);
        }
        if let Some(value) = get(ENV_RETRIES) {
            settings.retries = parse_number(ENV_RETRIES, &value)?;
        }
        if let Some(value) = get(ENV_RETRY_DELAY_SECS) {
            settings.retry_delay = Duration::from_secs(parse_number(ENV_RETRY_DELAY_SECS, &value)?);
        }

        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EtlError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// Platform data directory, or `./data` when none can be determined
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "ciranda-etl")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Load a settings file into the environment. Variables already set win.
/// An explicit path must exist; the default `.env` is optional.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| EtlError::Config(format!("cannot read settings file {:?}: {}", path, e)))?;
            debug!("Loaded settings file {:?}", path);
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                debug!("Loaded settings file {:?}", path);
            }
        }
    }
    Ok(())
}
