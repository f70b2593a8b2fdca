//! Subcommand implementations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use forest_loss_cli_utils::{IndicatifProgress, MultiProgress};
use forest_loss_config::AnalysisConfig;
use forest_loss_extract::{CachedTableExtractor, IndicatorExtractor};
use forest_loss_pipeline::export::{write_csv, write_json, zones_feature_collection};
use forest_loss_pipeline::{PipelineError, PreparedRun};
use forest_loss_zone_models::{AnalysisUnit, UnitIndicatorTable, Zone};

use crate::OutputFormat;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Arguments for [`run`].
pub struct RunArgs {
    pub input: PathBuf,
    pub config: PathBuf,
    pub tables: PathBuf,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub zones_geojson: Option<PathBuf>,
    pub extract_timeout_secs: Option<u64>,
}

fn load_config(path: &Path) -> Result<AnalysisConfig, PipelineError> {
    Ok(AnalysisConfig::load(path)?)
}

fn load_and_prepare(
    input: &Path,
    config: &AnalysisConfig,
) -> Result<PreparedRun, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {e}", input.display()))?;
    let records = forest_loss_pipeline::load_source(&text, config)?;
    Ok(forest_loss_pipeline::prepare(records, config)?)
}

/// Opens `path` for buffered writing, or stdout when `None`.
fn open_output(path: Option<&Path>) -> std::io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

fn write_zone_layer(prepared: &PreparedRun, path: Option<&Path>) -> CommandResult {
    let layer = zones_feature_collection(&prepared.zones);
    let mut writer = open_output(path)?;
    serde_json::to_writer_pretty(&mut writer, &layer)?;
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = path {
        log::info!("Wrote zone layer to {}", path.display());
    }
    Ok(())
}

/// Runs extraction on a blocking worker, giving up after `limit`.
///
/// A timed-out worker is not cancelled. The runtime must be shut down
/// without joining it, or the process waits for the extractor anyway.
///
/// # Errors
///
/// Returns the extractor's [`PipelineError`], or a message if the worker
/// panicked or the limit elapsed.
pub async fn extract_on_worker(
    units: Vec<AnalysisUnit>,
    extractor: Arc<dyn IndicatorExtractor>,
    config: AnalysisConfig,
    limit: Option<Duration>,
) -> Result<Vec<UnitIndicatorTable>, Box<dyn std::error::Error>> {
    let task = tokio::task::spawn_blocking(move || {
        forest_loss_pipeline::extract(&units, extractor.as_ref(), &config)
    });

    let joined = match limit {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            format!("Extraction timed out after {:.1}s", limit.as_secs_f64())
        })?,
        None => task.await,
    };

    Ok(joined.map_err(|e| format!("Extraction worker failed: {e}"))??)
}

/// Prepares zones, runs the cached table extractor on a blocking worker,
/// and writes the report.
///
/// # Errors
///
/// Returns the first pipeline, I/O, or export error, or a timeout error if
/// extraction exceeds `extract_timeout_secs`.
pub async fn run(multi: &MultiProgress, args: RunArgs) -> CommandResult {
    let start = Instant::now();

    let config = load_config(&args.config)?;
    let prepared = load_and_prepare(&args.input, &config)?;

    if let Some(path) = &args.zones_geojson {
        write_zone_layer(&prepared, Some(path))?;
    }

    let extractor: Arc<dyn IndicatorExtractor> = Arc::new(
        CachedTableExtractor::new(args.tables)
            .with_progress(IndicatifProgress::extraction_bar(multi, "Extracting forest area")),
    );

    let tables = extract_on_worker(
        prepared.units.to_vec(),
        extractor,
        config.clone(),
        args.extract_timeout_secs.map(Duration::from_secs),
    )
    .await?;

    let report = forest_loss_pipeline::summarize(&prepared, &tables, &config)?;

    let mut writer = open_output(args.output.as_deref())?;
    match args.format {
        OutputFormat::Json => write_json(&report, &mut writer)?,
        OutputFormat::Csv => write_csv(&report, &mut writer)?,
    }
    writer.flush()?;

    log::info!(
        "Report for {} complete in {:.1}s",
        report.id,
        start.elapsed().as_secs_f64()
    );
    if let Some(path) = &args.output {
        log::info!("Wrote report to {}", path.display());
    }

    Ok(())
}

/// Prepares zones and writes them as a `GeoJSON` layer.
///
/// # Errors
///
/// Returns the first configuration, geometry, or I/O error.
pub fn prepare(input: &Path, config: &Path, output: Option<&Path>) -> CommandResult {
    let config = load_config(config)?;
    let prepared = load_and_prepare(input, &config)?;
    write_zone_layer(&prepared, output)
}

/// Stores indicator tables computed outside this tool as `<tables>/<id>.json`,
/// stamped with the configured extraction thresholds.
///
/// # Errors
///
/// Returns the first configuration, I/O, or JSON error, or a message if
/// the input does not hold one table per zone.
pub fn import_tables(input: &Path, config: &Path, tables: &Path, id: i64) -> CommandResult {
    let config = load_config(config)?;
    let text = std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {e}", input.display()))?;
    let units: Vec<UnitIndicatorTable> = serde_json::from_str(&text)?;

    if units.len() != Zone::ALL.len() {
        return Err(format!(
            "Expected {} indicator tables in {}, got {}",
            Zone::ALL.len(),
            input.display(),
            units.len()
        )
        .into());
    }

    let path = CachedTableExtractor::new(tables).store(id, &config.extraction(), units)?;
    log::info!("Stored indicator tables for {id} at {}", path.display());

    Ok(())
}

/// Loads and validates a configuration file, then prints it.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if the file is missing, malformed,
/// or out of range.
pub fn check_config(path: &Path) -> CommandResult {
    let config = load_config(path)?;

    println!("Configuration OK: {}", path.display());
    println!("  buffer_distance    = {}", config.buffer_distance);
    println!("  min_patch_size_ha  = {}", config.min_patch_size_ha);
    println!("  min_cover_pct      = {}", config.min_cover_pct);
    println!("  display_order      = {}", config.display_order);
    println!("  coordinate_space   = {}", config.coordinate_space);
    println!("  id_property        = {}", config.id_property);
    println!("  status_property    = {}", config.status_property);
    println!("  excluded_statuses  = {:?}", config.excluded_statuses);

    Ok(())
}
