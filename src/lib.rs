pub mod area;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod transform;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::Settings;
pub use error::{EtlError, Result};
pub use pipeline::{run_extract, run_load, run_pipeline, run_transform};
