#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Indicator extraction for forest loss analysis.
//!
//! Raster sampling happens outside this workspace. This crate defines the
//! narrow [`IndicatorExtractor`] seam the pipeline calls through, plus
//! extractors that serve precomputed tables: [`CachedTableExtractor`]
//! reads them from an explicit cache directory and [`StaticExtractor`]
//! holds them in memory.

pub mod cached;
pub mod fixed;
pub mod progress;

pub use cached::CachedTableExtractor;
pub use fixed::StaticExtractor;

use forest_loss_zone_models::{AnalysisUnit, ExtractionConfig, UnitIndicatorTable};
use thiserror::Error;

/// Errors that can occur during indicator extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading a cached table failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A cached table is not valid JSON or has the wrong shape.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File that could not be parsed.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The cached table was computed with different thresholds.
    #[error(
        "Cached table {path} was computed with min_patch_size_ha={found_patch}, \
         min_cover_pct={found_cover}; requested {requested_patch}, {requested_cover}"
    )]
    ThresholdMismatch {
        /// File holding the mismatched table.
        path: String,
        /// Patch size the table was computed with.
        found_patch: f64,
        /// Cover threshold the table was computed with.
        found_cover: f64,
        /// Requested patch size.
        requested_patch: f64,
        /// Requested cover threshold.
        requested_cover: f64,
    },

    /// No result is available for a requested unit.
    #[error("No indicator table for {zone} of area {id}")]
    MissingUnit {
        /// Zone of the unit.
        zone: String,
        /// Identifier of the unit.
        id: i64,
    },

    /// The extractor backend failed.
    #[error("Extractor failed: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Batch-extracts annual forest cover area for a set of analysis units.
///
/// Implementations return one [`UnitIndicatorTable`] per requested unit,
/// in the order the units were given, restricted to forest patches of at
/// least `min_patch_size_ha` with canopy cover of at least
/// `min_cover_pct`. Any year range is allowed.
///
/// Calls may be slow and blocking. There is no partial-result contract:
/// an implementation either returns a table for every unit or fails.
pub trait IndicatorExtractor: Send + Sync {
    /// Extracts the annual area tables.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if any unit cannot be served.
    fn extract(
        &self,
        units: &[AnalysisUnit],
        config: &ExtractionConfig,
    ) -> Result<Vec<UnitIndicatorTable>, ExtractError>;
}
