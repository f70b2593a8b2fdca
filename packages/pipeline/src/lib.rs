#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest loss pipeline for a protected area and its buffer ring.
//!
//! Chains geometry preparation -> zone binding -> indicator extraction ->
//! series reshaping -> loss derivation. Each stage consumes the complete
//! output of the previous one, and the first failure aborts the run with
//! a [`PipelineError`] naming the stage and error kind. No partial report
//! is ever produced.
//!
//! The stages are also exposed individually ([`prepare`], [`extract`],
//! [`summarize`]) so a caller can run the extractor on a worker thread or
//! under a timeout.

pub mod export;
pub mod report;

pub use report::{ForestLossReport, ZoneReport};

use forest_loss_config::{AnalysisConfig, ConfigError};
use forest_loss_extract::{ExtractError, IndicatorExtractor};
use forest_loss_geometry::{
    GeometryError, PrepareOptions, PreparedZones, SourceRecord, SourceSchema, bind_zones,
    parse_source_records, prepare_zones,
};
use forest_loss_series::{SeriesError, derive_losses, reshape_tables};
use forest_loss_zone_models::{AnalysisUnit, UnitIndicatorTable};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Pipeline stage in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Configuration,
    GeometryPreparation,
    Extraction,
    Reshaping,
    LossDerivation,
}

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or multi-record input geometry.
    InvalidInput,
    /// Filtering removed every usable record.
    NoData,
    /// Buffering or differencing produced an invalid or empty geometry.
    Geometry,
    /// Extractor output is missing expected fields.
    Schema,
    /// Missing or out-of-range configuration value.
    Config,
    /// The extractor itself failed.
    Extraction,
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded or validated.
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    /// Source parsing or buffer ring preparation failed.
    #[error("Geometry preparation failed: {0}")]
    Geometry(#[from] GeometryError),

    /// The indicator extractor failed.
    #[error("Indicator extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// Extractor output did not match the expected schema.
    #[error("Reshaping extractor output failed: {0}")]
    Reshape(SeriesError),

    /// An area series could not be turned into a loss series.
    #[error("Loss derivation failed: {0}")]
    LossDerivation(SeriesError),
}

impl PipelineError {
    /// The stage that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Configuration,
            Self::Geometry(_) => Stage::GeometryPreparation,
            Self::Extraction(_) => Stage::Extraction,
            Self::Reshape(_) => Stage::Reshaping,
            Self::LossDerivation(_) => Stage::LossDerivation,
        }
    }

    /// The error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Geometry(GeometryError::InvalidInput { .. }) => ErrorKind::InvalidInput,
            Self::Geometry(GeometryError::NoData { .. }) => ErrorKind::NoData,
            Self::Geometry(GeometryError::InvalidGeometry { .. }) => ErrorKind::Geometry,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Reshape(_) | Self::LossDerivation(_) => ErrorKind::Schema,
        }
    }
}

/// Prepared zone geometries and the analysis units bound from them.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub zones: PreparedZones,
    /// Protected area first, buffer ring second.
    pub units: [AnalysisUnit; 2],
}

/// Property names the configuration says to read source features with.
#[must_use]
pub fn source_schema(config: &AnalysisConfig) -> SourceSchema {
    SourceSchema {
        id_property: config.id_property.clone(),
        status_property: config.status_property.clone(),
    }
}

/// Parses source records from `GeoJSON` text.
///
/// # Errors
///
/// Returns [`PipelineError::Geometry`] if the text is not a usable
/// `GeoJSON` feature or feature collection.
pub fn load_source(
    text: &str,
    config: &AnalysisConfig,
) -> Result<Vec<SourceRecord>, PipelineError> {
    Ok(parse_source_records(text, &source_schema(config))?)
}

/// Builds the buffer ring and binds both zones.
///
/// # Errors
///
/// Returns [`PipelineError::Geometry`] if the input has the wrong record
/// count, is filtered to nothing, or yields an unusable ring.
pub fn prepare(
    records: Vec<SourceRecord>,
    config: &AnalysisConfig,
) -> Result<PreparedRun, PipelineError> {
    log::info!("Preparing zones from {} source record(s)", records.len());

    let options = PrepareOptions {
        buffer_distance: config.buffer_distance,
        coordinate_space: config.coordinate_space,
        excluded_statuses: &config.excluded_statuses,
    };
    let zones = prepare_zones(records, &options)?;
    let units = bind_zones(&zones);

    Ok(PreparedRun { zones, units })
}

/// Runs the extractor over the bound units.
///
/// # Errors
///
/// Returns [`PipelineError::Extraction`] if the extractor fails.
pub fn extract(
    units: &[AnalysisUnit],
    extractor: &dyn IndicatorExtractor,
    config: &AnalysisConfig,
) -> Result<Vec<UnitIndicatorTable>, PipelineError> {
    let extraction = config.extraction();
    log::info!(
        "Extracting annual forest area for {} unit(s) (min patch {} ha, min cover {}%)",
        units.len(),
        extraction.min_patch_size_ha,
        extraction.min_cover_pct
    );
    Ok(extractor.extract(units, &extraction)?)
}

/// Reshapes extractor tables and derives per-zone loss.
///
/// # Errors
///
/// Returns [`PipelineError::Reshape`] if the tables do not match the
/// expected schema, or [`PipelineError::LossDerivation`] if a series
/// cannot be differenced.
pub fn summarize(
    prepared: &PreparedRun,
    tables: &[UnitIndicatorTable],
    config: &AnalysisConfig,
) -> Result<ForestLossReport, PipelineError> {
    let area_series = reshape_tables(&prepared.units, tables).map_err(PipelineError::Reshape)?;
    let loss_series = derive_losses(&area_series).map_err(PipelineError::LossDerivation)?;

    let report = ForestLossReport::new(
        prepared.zones.id,
        config.display_order,
        area_series,
        loss_series,
    );
    for zone in &report.zones {
        log::info!(
            "{}: {} year(s), total loss {} ha",
            zone.zone.label(),
            zone.loss_series.points.len(),
            zone.total_loss_ha
        );
    }

    Ok(report)
}

/// Runs every stage in order.
///
/// # Errors
///
/// Returns the first [`PipelineError`] raised. A geometry failure means
/// the extractor is never called.
pub fn run(
    records: Vec<SourceRecord>,
    config: &AnalysisConfig,
    extractor: &dyn IndicatorExtractor,
) -> Result<ForestLossReport, PipelineError> {
    let prepared = prepare(records, config)?;
    let tables = extract(&prepared.units, extractor, config)?;
    summarize(&prepared, &tables, config)
}

#[cfg(test)]
mod tests {
    use forest_loss_extract::StaticExtractor;
    use forest_loss_zone_models::{CoordinateSpace, DisplayOrder, Zone};
    use geo::{Area, BooleanOps, polygon};
    use serde_json::json;

    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig::from_toml(
            r#"
            buffer_distance = 10000.0
            min_patch_size_ha = 1.0
            min_cover_pct = 30.0
            display_order = "stacked"
            coordinate_space = "projected"
            "#,
        )
        .unwrap()
    }

    fn area_record(id: i64, status: Option<&str>, x0: f64) -> SourceRecord {
        SourceRecord::new(
            id,
            status,
            polygon![
                (x: x0, y: 0.0),
                (x: x0 + 20_000.0, y: 0.0),
                (x: x0 + 20_000.0, y: 20_000.0),
                (x: x0, y: 20_000.0),
                (x: x0, y: 0.0),
            ],
        )
    }

    fn table(zone: Zone, areas: &serde_json::Value) -> UnitIndicatorTable {
        UnitIndicatorTable {
            zone: Some(zone),
            indicators: json!({ "area_ha": areas })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn losses(report: &ForestLossReport, zone: Zone) -> Vec<(i32, u64)> {
        report
            .zone(zone)
            .unwrap()
            .loss_series
            .points
            .iter()
            .map(|p| (p.year, p.loss_ha))
            .collect()
    }

    #[test]
    fn protected_area_115772_end_to_end() {
        let extractor = StaticExtractor::new(vec![
            table(
                Zone::ProtectedArea,
                &json!({ "2001": 500, "2002": 480, "2003": 480 }),
            ),
            table(Zone::BufferRing, &json!({ "2001": 900, "2002": 850 })),
        ]);
        let config = config();

        let prepared = prepare(vec![area_record(115_772, Some("Designated"), 0.0)], &config)
            .unwrap();
        let overlap = prepared
            .zones
            .buffer_ring
            .intersection(&prepared.zones.protected_area)
            .unsigned_area();
        assert_eq!(overlap, 0.0);

        let tables = extract(&prepared.units, &extractor, &config).unwrap();
        let report = summarize(&prepared, &tables, &config).unwrap();

        assert_eq!(report.id, 115_772);
        assert_eq!(report.display_order, DisplayOrder::Stacked);
        assert_eq!(report.zones[0].zone, Zone::ProtectedArea);
        assert_eq!(report.zones[1].zone, Zone::BufferRing);
        assert_eq!(
            losses(&report, Zone::ProtectedArea),
            vec![(2001, 0), (2002, 20), (2003, 0)]
        );
        assert_eq!(
            losses(&report, Zone::BufferRing),
            vec![(2001, 0), (2002, 50)]
        );
        assert_eq!(report.zone(Zone::ProtectedArea).unwrap().total_loss_ha, 20);
        assert_eq!(report.zone(Zone::BufferRing).unwrap().total_loss_ha, 50);
    }

    #[test]
    fn single_year_per_zone_gives_one_zero_entry_each() {
        let extractor = StaticExtractor::new(vec![
            table(Zone::ProtectedArea, &json!({ "2020": 123.4 })),
            table(Zone::BufferRing, &json!({ "2020": 987.6 })),
        ]);
        let report = run(vec![area_record(1, None, 0.0)], &config(), &extractor).unwrap();

        for zone in Zone::ALL {
            assert_eq!(losses(&report, zone), vec![(2020, 0)]);
        }
    }

    #[test]
    fn two_polygons_fail_before_extraction() {
        let extractor = StaticExtractor::new(Vec::new());
        let records = vec![area_record(1, None, 0.0), area_record(2, None, 100_000.0)];

        let err = run(records, &config(), &extractor).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.stage(), Stage::GeometryPreparation);
        assert_eq!(extractor.call_count(), 0);
    }

    #[test]
    fn proposed_only_input_is_no_data() {
        let extractor = StaticExtractor::new(Vec::new());
        let records = vec![area_record(115_772, Some("Proposed"), 0.0)];

        let err = run(records, &config(), &extractor).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoData);
        assert_eq!(extractor.call_count(), 0);
    }

    #[test]
    fn missing_area_field_is_a_schema_error_at_reshaping() {
        let extractor = StaticExtractor::new(vec![
            table(Zone::ProtectedArea, &json!({ "2001": 1.0 })),
            UnitIndicatorTable {
                zone: Some(Zone::BufferRing),
                indicators: serde_json::Map::new(),
            },
        ]);

        let err = run(vec![area_record(1, None, 0.0)], &config(), &extractor).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.stage(), Stage::Reshaping);
        assert_eq!(extractor.call_count(), 1);
    }

    #[test]
    fn extractor_failure_stops_the_run() {
        struct Failing;

        impl IndicatorExtractor for Failing {
            fn extract(
                &self,
                _units: &[AnalysisUnit],
                _config: &forest_loss_zone_models::ExtractionConfig,
            ) -> Result<Vec<UnitIndicatorTable>, ExtractError> {
                Err(ExtractError::Backend {
                    message: "raster store unavailable".to_string(),
                })
            }
        }

        let err = run(vec![area_record(1, None, 0.0)], &config(), &Failing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert_eq!(err.stage(), Stage::Extraction);
    }

    #[test]
    fn geographic_input_is_buffered_in_metres() {
        let mut config = config();
        config.coordinate_space = CoordinateSpace::Geographic;
        let record = SourceRecord::new(
            115_772,
            None,
            polygon![
                (x: 29.0, y: -1.0),
                (x: 29.2, y: -1.0),
                (x: 29.2, y: -0.8),
                (x: 29.0, y: -0.8),
                (x: 29.0, y: -1.0),
            ],
        );

        let prepared = prepare(vec![record], &config).unwrap();

        // 0.2 degrees of source plus about 0.09 degrees of ring on each side.
        let rect = geo::BoundingRect::bounding_rect(&prepared.zones.buffer_ring).unwrap();
        assert!((rect.width() - 0.38).abs() < 0.01, "width {}", rect.width());
    }

    #[test]
    fn error_kinds_render_snake_case() {
        assert_eq!(ErrorKind::NoData.to_string(), "no_data");
        assert_eq!(Stage::GeometryPreparation.as_ref(), "geometry_preparation");
    }
}
