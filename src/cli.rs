use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "ciranda-etl")]
#[command(version, about = "Load the Ciranda Kids workbook into a SQLite star schema")]
pub struct Cli {
    /// Settings file to load before reading the environment (default: ./.env if present)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Data directory holding raw/, staging/, processed/ and warehouse.db
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Source workbook path
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Warehouse SQLite database path
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run extract, transform and load in sequence with retries
    Run {
        /// Extra attempts per failed stage
        #[arg(short, long)]
        retries: Option<u32>,

        /// Seconds to wait between attempts
        #[arg(long)]
        retry_delay_secs: Option<u64>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate workbook sheets and write the staging area
    Extract,

    /// Derive processed record-sets from the staging area
    Transform,

    /// Upsert the processed area into the warehouse
    Load,

    /// List sheet contracts and warehouse tables in load order
    ListTables,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Apply command-line overrides on top of resolved settings
    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(dir) = &self.data_dir {
            let layout = Settings::with_data_dir(dir);
            settings = Settings {
                retries: settings.retries,
                retry_delay: settings.retry_delay,
                ..layout
            };
        }
        if let Some(source) = &self.source {
            settings.source_workbook = source.clone();
        }
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Commands::Run {
            retries,
            retry_delay_secs,
            ..
        } = &self.command
        {
            if let Some(retries) = retries {
                settings.retries = *retries;
            }
            if let Some(secs) = retry_delay_secs {
                settings.retry_delay = std::time::Duration::from_secs(*secs);
            }
        }
        settings
    }

    /// Settings from the settings file, environment and flags
    pub fn settings(&self) -> Result<Settings> {
        crate::config::load_env_file(self.env_file.as_deref())?;
        Ok(self.apply_overrides(Settings::from_env()?))
    }
}
