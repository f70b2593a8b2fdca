#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for protected area forest loss indicators.
//!
//! Uses `indicatif-log-bridge` (via [`forest_loss_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the extraction spinner never fight for the terminal.

mod commands;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use forest_loss_cli_utils::MultiProgress;
use forest_loss_pipeline::PipelineError;

#[derive(Parser)]
#[command(
    name = "forest_loss",
    about = "Forest loss indicators for a protected area and its buffer ring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare zones, extract annual forest area, and write the loss report
    Run {
        /// `GeoJSON` Feature or `FeatureCollection` with the protected area
        #[arg(long)]
        input: PathBuf,
        /// TOML analysis configuration
        #[arg(long)]
        config: PathBuf,
        /// Directory of cached indicator tables (`<id>.json`)
        #[arg(long)]
        tables: PathBuf,
        /// Report destination (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Report format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Also write the zone geometries as a `GeoJSON` layer
        #[arg(long)]
        zones_geojson: Option<PathBuf>,
        /// Abort if extraction takes longer than this many seconds
        #[arg(long)]
        extract_timeout_secs: Option<u64>,
    },
    /// Prepare zones only and write them as a `GeoJSON` layer
    Prepare {
        /// `GeoJSON` Feature or `FeatureCollection` with the protected area
        #[arg(long)]
        input: PathBuf,
        /// TOML analysis configuration
        #[arg(long)]
        config: PathBuf,
        /// Layer destination (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Store externally computed indicator tables where `run` reads them
    ImportTables {
        /// JSON array of indicator tables, protected area first
        #[arg(long)]
        input: PathBuf,
        /// TOML analysis configuration the tables were computed under
        #[arg(long)]
        config: PathBuf,
        /// Directory of cached indicator tables (`<id>.json`)
        #[arg(long)]
        tables: PathBuf,
        /// Protected area identifier the tables belong to
        #[arg(long)]
        id: i64,
    },
    /// Validate a configuration file and print the resolved values
    CheckConfig {
        /// TOML analysis configuration
        config: PathBuf,
    },
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full report as JSON
    Json,
    /// Long-form `zone,year,area_ha,loss_ha` rows
    Csv,
}

async fn dispatch(multi: &MultiProgress, command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Run {
            input,
            config,
            tables,
            output,
            format,
            zones_geojson,
            extract_timeout_secs,
        } => {
            commands::run(
                multi,
                commands::RunArgs {
                    input,
                    config,
                    tables,
                    output,
                    format,
                    zones_geojson,
                    extract_timeout_secs,
                },
            )
            .await
        }
        Commands::Prepare {
            input,
            config,
            output,
        } => commands::prepare(&input, &config, output.as_deref()),
        Commands::ImportTables {
            input,
            config,
            tables,
            id,
        } => commands::import_tables(&input, &config, &tables, id),
        Commands::CheckConfig { config } => commands::check_config(&config),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let multi = forest_loss_cli_utils::init_logger();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(dispatch(&multi, cli.command));
    // A timed-out extraction worker may still be blocked; do not join it.
    runtime.shutdown_background();

    if let Err(e) = &result
        && let Some(pipeline_error) = e.downcast_ref::<PipelineError>()
    {
        log::error!(
            "Stage '{}' failed ({}): {pipeline_error}",
            pipeline_error.stage(),
            pipeline_error.kind()
        );
    }

    result
}
