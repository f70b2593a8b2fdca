#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis configuration for forest loss indicators.
//!
//! The configuration is a single TOML bundle. Every required key must be
//! present and in range; the first problem found is reported by key name
//! and nothing is defaulted in its place.
//!
//! ```toml
//! buffer_distance = 10000.0
//! min_patch_size_ha = 1.0
//! min_cover_pct = 30.0
//! display_order = "stacked"
//! ```

use std::path::Path;

use forest_loss_zone_models::{CoordinateSpace, DisplayOrder, ExtractionConfig};
use serde::Deserialize;
use thiserror::Error;

/// Property holding the protected area identifier (WDPA convention).
pub const DEFAULT_ID_PROPERTY: &str = "WDPAID";

/// Property holding the protected area lifecycle status.
pub const DEFAULT_STATUS_PROPERTY: &str = "STATUS";

/// Lifecycle statuses that are not finalized and are excluded by default.
pub const DEFAULT_EXCLUDED_STATUSES: &[&str] = &["proposed"];

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid TOML or has a value of the wrong type.
    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent.
    #[error("Missing required config key '{key}'")]
    Missing {
        /// Name of the missing key.
        key: &'static str,
    },

    /// A key is present but its value is outside the accepted range.
    #[error("Config key '{key}' = {value} is out of range: {expected}")]
    OutOfRange {
        /// Name of the offending key.
        key: &'static str,
        /// The value as written.
        value: String,
        /// Description of the accepted range.
        expected: &'static str,
    },
}

/// Configuration exactly as written, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    buffer_distance: Option<f64>,
    min_patch_size_ha: Option<f64>,
    min_cover_pct: Option<f64>,
    display_order: Option<DisplayOrder>,
    coordinate_space: Option<CoordinateSpace>,
    id_property: Option<String>,
    status_property: Option<String>,
    excluded_statuses: Option<Vec<String>>,
}

/// Validated analysis configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Outward buffer distance. Metres for geographic input, CRS units for
    /// projected input. Always positive.
    pub buffer_distance: f64,
    /// Minimum forest patch size in hectares (>= 0).
    pub min_patch_size_ha: f64,
    /// Minimum canopy cover percentage, within `[0, 100]`.
    pub min_cover_pct: f64,
    /// Chart layout, passed through untouched.
    pub display_order: DisplayOrder,
    pub coordinate_space: CoordinateSpace,
    /// Feature property holding the protected area identifier.
    pub id_property: String,
    /// Feature property holding the lifecycle status.
    pub status_property: String,
    /// Lowercase statuses whose records are dropped before buffering.
    pub excluded_statuses: Vec<String>,
}

impl AnalysisConfig {
    /// Loads and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is malformed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml(&text)
    }

    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed, a required key
    /// is absent, or a value is out of range.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::de::from_str(text)?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let buffer_distance = require(raw.buffer_distance, "buffer_distance")?;
        let min_patch_size_ha = require(raw.min_patch_size_ha, "min_patch_size_ha")?;
        let min_cover_pct = require(raw.min_cover_pct, "min_cover_pct")?;
        let display_order = require(raw.display_order, "display_order")?;

        if !(buffer_distance.is_finite() && buffer_distance > 0.0) {
            return Err(out_of_range(
                "buffer_distance",
                buffer_distance,
                "a finite value greater than 0",
            ));
        }
        if !(min_patch_size_ha.is_finite() && min_patch_size_ha >= 0.0) {
            return Err(out_of_range(
                "min_patch_size_ha",
                min_patch_size_ha,
                "a finite value of at least 0",
            ));
        }
        if !(0.0..=100.0).contains(&min_cover_pct) {
            return Err(out_of_range(
                "min_cover_pct",
                min_cover_pct,
                "a percentage between 0 and 100",
            ));
        }

        let id_property = non_empty(raw.id_property, DEFAULT_ID_PROPERTY, "id_property")?;
        let status_property =
            non_empty(raw.status_property, DEFAULT_STATUS_PROPERTY, "status_property")?;

        let excluded_statuses = raw.excluded_statuses.map_or_else(
            || {
                DEFAULT_EXCLUDED_STATUSES
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            },
            |statuses| {
                statuses
                    .iter()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            },
        );

        Ok(Self {
            buffer_distance,
            min_patch_size_ha,
            min_cover_pct,
            display_order,
            coordinate_space: raw.coordinate_space.unwrap_or_default(),
            id_property,
            status_property,
            excluded_statuses,
        })
    }

    /// The threshold subset handed to indicator extractors.
    #[must_use]
    pub const fn extraction(&self) -> ExtractionConfig {
        ExtractionConfig {
            min_patch_size_ha: self.min_patch_size_ha,
            min_cover_pct: self.min_cover_pct,
        }
    }
}

fn require<T>(value: Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::Missing { key })
}

fn out_of_range(key: &'static str, value: f64, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        key,
        value: value.to_string(),
        expected,
    }
}

fn non_empty(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(ConfigError::OutOfRange {
            key,
            value: format!("{v:?}"),
            expected: "a non-empty property name",
        }),
        Some(v) => Ok(v.trim().to_string()),
    }
}
