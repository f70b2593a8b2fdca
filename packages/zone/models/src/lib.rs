#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zone, analysis unit, and annual series types.
//!
//! These types are shared by every stage of the forest loss pipeline:
//! geometry preparation produces [`AnalysisUnit`]s, extractors return
//! [`UnitIndicatorTable`]s, and the series stage turns those into
//! [`AnnualAreaSeries`] and [`LossSeries`] values.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the two fixed analysis regions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Zone {
    /// The protected area polygon itself.
    ProtectedArea,
    /// The ring around the protected area, excluding the area itself.
    BufferRing,
}

impl Zone {
    /// All zones, in binding order.
    pub const ALL: [Self; 2] = [Self::ProtectedArea, Self::BufferRing];

    /// Human-readable label used for chart legends and map layers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ProtectedArea => "Protected area",
            Self::BufferRing => "Buffer zone",
        }
    }
}

/// How a chart should lay out the per-zone loss bars.
///
/// Consumed only by presentation; the pipeline passes it through.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisplayOrder {
    /// Zones stacked on top of each other per year.
    #[default]
    Stacked,
    /// Zones side by side per year.
    Grouped,
}

/// Coordinate space of the input geometry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinateSpace {
    /// Longitude/latitude in degrees. Buffer distances are in metres.
    #[default]
    Geographic,
    /// Planar coordinates. Buffer distances are in the CRS's linear unit.
    Projected,
}

/// A zone paired with its geometry, ready to hand to an extractor.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUnit {
    zone: Zone,
    id: i64,
    geometry: MultiPolygon<f64>,
}

impl AnalysisUnit {
    #[must_use]
    pub const fn new(zone: Zone, id: i64, geometry: MultiPolygon<f64>) -> Self {
        Self { zone, id, geometry }
    }

    #[must_use]
    pub const fn zone(&self) -> Zone {
        self.zone
    }

    /// Identifier inherited from the source protected area.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub const fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

/// Threshold subset of the analysis configuration sent to extractors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExtractionConfig {
    /// Minimum forest patch size, in hectares.
    pub min_patch_size_ha: f64,
    /// Minimum canopy cover, in percent.
    pub min_cover_pct: f64,
}

/// Raw per-unit result returned by an extractor, before reshaping.
///
/// The `area_ha` indicator may be wide (`{ "2001": 500.0, ... }`) or long
/// (`[{ "year": 2001, "area_ha": 500.0 }, ...]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitIndicatorTable {
    /// Zone label echoed back by the extractor, if it provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    /// Indicator name to nested value.
    #[serde(default)]
    pub indicators: serde_json::Map<String, serde_json::Value>,
}

/// Forest cover area for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearArea {
    pub year: i32,
    pub area_ha: f64,
}

/// Cumulative forest cover area per year for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualAreaSeries {
    pub zone: Zone,
    /// Ascending by year, no duplicates.
    pub points: Vec<YearArea>,
}

impl AnnualAreaSeries {
    #[must_use]
    pub const fn new(zone: Zone, points: Vec<YearArea>) -> Self {
        Self { zone, points }
    }

    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.year).collect()
    }
}

/// Forest loss for one year, in whole hectares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearLoss {
    pub year: i32,
    pub loss_ha: u64,
}

/// Year-over-year forest loss for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LossSeries {
    pub zone: Zone,
    /// Same year domain and ordering as the source area series.
    pub points: Vec<YearLoss>,
}

impl LossSeries {
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.year).collect()
    }

    /// Sum of the per-year losses.
    #[must_use]
    pub fn total_ha(&self) -> u64 {
        self.points.iter().map(|p| p.loss_ha).sum()
    }
}
