//! Stage entry points and the sequential runner with bounded retry

use log::{error, info, warn};
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::Duration;

use crate::area::DataArea;
use crate::config::Settings;
use crate::error::{EtlError, Result};
use crate::extract::{extract_file, ExtractReport};
use crate::transform::{transform, TransformReport};
use crate::writer::{load_to_sqlite, LoadReport};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Transform,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Transform => write!(f, "transform"),
            Stage::Load => write!(f, "load"),
        }
    }
}

/// Fixed-delay retry: a failed stage is attempted `retries` more times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retries: settings.retries,
            delay: settings.retry_delay,
        }
    }

    /// Run `attempt` until it succeeds or the attempts are used up
    pub fn run<T, F>(&self, stage: Stage, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let total = self.retries + 1;
        let mut tries = 1;

        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) if tries < total => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        stage, tries, total, e, self.delay
                    );
                    thread::sleep(self.delay);
                    tries += 1;
                }
                Err(e) => {
                    error!("{} failed after {} attempt(s): {}", stage, tries, e);
                    return Err(e);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub extract: ExtractReport,
    pub transform: TransformReport,
    pub load: LoadReport,
}

/// Extraction against explicit settings
pub fn execute_extract(settings: &Settings) -> Result<ExtractReport> {
    let staging = DataArea::open(&settings.staging_dir)?;
    extract_file(&settings.source_workbook, &staging)
}

/// Transformation against explicit settings
pub fn execute_transform(settings: &Settings) -> Result<TransformReport> {
    let staging = DataArea::open(&settings.staging_dir)?;
    let processed = DataArea::open(&settings.processed_dir)?;
    transform(&staging, &processed)
}

/// Loading against explicit settings. Fails if any table was rolled back,
/// after every table has been attempted.
pub fn execute_load(settings: &Settings) -> Result<LoadReport> {
    let processed = DataArea::open(&settings.processed_dir)?;
    let report = load_to_sqlite(&processed, &settings.database)?;

    let failed = report.failed_tables();
    if failed.is_empty() {
        Ok(report)
    } else {
        Err(EtlError::LoadFailed { tables: failed })
    }
}

/// Scheduler entry point for extraction
pub fn run_extract() -> Result<()> {
    execute_extract(&Settings::from_env()?).map(|_| ())
}

/// Scheduler entry point for transformation
pub fn run_transform() -> Result<()> {
    execute_transform(&Settings::from_env()?).map(|_| ())
}

/// Scheduler entry point for loading
pub fn run_load() -> Result<()> {
    execute_load(&Settings::from_env()?).map(|_| ())
}

/// Run extract, transform and load in order, retrying each stage per the
/// settings. The first stage to exhaust its attempts ends the run.
pub fn run_pipeline(settings: &Settings) -> Result<PipelineReport> {
    let policy = RetryPolicy::from_settings(settings);

    info!("Starting {}", Stage::Extract);
    let extract = policy.run(Stage::Extract, || execute_extract(settings))?;

    info!("Starting {}", Stage::Transform);
    let transform = policy.run(Stage::Transform, || execute_transform(settings))?;

    info!("Starting {}", Stage::Load);
    let load = policy.run(Stage::Load, || execute_load(settings))?;

    info!("Pipeline finished");
    Ok(PipelineReport {
        extract,
        transform,
        load,
    })
}
