use anyhow::{Context, Result};
use ciranda_etl::{
    cli::{Cli, Commands},
    pipeline::{execute_extract, execute_load, execute_transform, run_pipeline},
    schema::{conflict_policy_for, ALL_TABLES, CONTRACTS},
};
use log::LevelFilter;
use std::env;
use std::time::Instant;

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if env::var("RUST_LOG").is_err() {
        builder.filter_module("ciranda_etl", LevelFilter::Info);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse_args();

    if let Commands::ListTables = cli.command {
        println!("Sheet contracts:\n");
        for contract in CONTRACTS {
            println!("  {:<12} {}", contract.name, contract.required.join(", "));
        }
        println!("\nWarehouse tables (load order):\n");
        for table in ALL_TABLES {
            println!(
                "  {:<16} <- {:<12} on conflict: {:?}",
                table.name,
                table.source_table,
                conflict_policy_for(table.name)
            );
        }
        return Ok(());
    }

    let settings = cli.settings().context("Failed to resolve settings")?;
    let start = Instant::now();

    match cli.command {
        Commands::Run { json, .. } => {
            let report = run_pipeline(&settings).context("Pipeline run failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "\nLoaded {} tables into {:?} in {:.1}s",
                    report.load.tables.len(),
                    settings.database,
                    start.elapsed().as_secs_f64()
                );
            }
        }

        Commands::Extract => {
            let report = execute_extract(&settings).context("Extraction failed")?;
            println!(
                "\nStaged {:?} in {:?}",
                report.exported_tables(),
                settings.staging_dir
            );
        }

        Commands::Transform => {
            let report = execute_transform(&settings).context("Transformation failed")?;
            println!(
                "\nWrote {} tables to {:?} ({} totals derived)",
                report.tables.len(),
                settings.processed_dir,
                report.derived_totals
            );
        }

        Commands::Load => {
            let report = execute_load(&settings).context("Loading failed")?;
            println!(
                "\nLoaded {} tables into {:?} in {:.1}s",
                report.tables.len(),
                settings.database,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::ListTables => {}
    }

    Ok(())
}
