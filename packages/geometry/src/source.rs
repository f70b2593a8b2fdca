//! Parses protected area features out of `GeoJSON` input.
//!
//! Records are parsed leniently: identifier, status, and geometry are all
//! optional here. Whether a record is usable is decided by
//! [`prepare_zones`](crate::prepare_zones) after lifecycle filtering, so a
//! proposed record with an odd geometry never fails the run on its own.

use geojson::{Feature, GeoJson, feature::Id};

use crate::GeometryError;

/// Property names used to read source features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    /// Property holding the integer identifier.
    pub id_property: String,
    /// Property holding the lifecycle status.
    pub status_property: String,
}

/// One protected area record from the input.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: Option<i64>,
    /// Lifecycle status as written (e.g. "Designated", "Proposed").
    pub status: Option<String>,
    pub geometry: Option<geo::Geometry<f64>>,
}

impl SourceRecord {
    #[must_use]
    pub fn new(id: i64, status: Option<&str>, geometry: impl Into<geo::Geometry<f64>>) -> Self {
        Self {
            id: Some(id),
            status: status.map(ToString::to_string),
            geometry: Some(geometry.into()),
        }
    }

    /// Whether this record's status is in the (lowercase) excluded set.
    #[must_use]
    pub fn is_excluded(&self, excluded_statuses: &[String]) -> bool {
        self.status.as_deref().is_some_and(|status| {
            let status = status.trim().to_lowercase();
            excluded_statuses.iter().any(|s| *s == status)
        })
    }
}

/// Parses a `GeoJSON` `FeatureCollection` or single `Feature` into source
/// records.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidInput`] if the text is not `GeoJSON`, is a
/// bare geometry without properties, or contains a geometry that cannot
/// be converted.
pub fn parse_source_records(
    text: &str,
    schema: &SourceSchema,
) -> Result<Vec<SourceRecord>, GeometryError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| GeometryError::invalid_input(format!("Unreadable GeoJSON: {e}")))?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(GeometryError::invalid_input(
                "Expected a Feature or FeatureCollection, got a bare geometry",
            ));
        }
    };

    log::debug!("Parsed {} source feature(s)", features.len());

    features
        .into_iter()
        .map(|feature| parse_feature(feature, schema))
        .collect()
}

fn parse_feature(feature: Feature, schema: &SourceSchema) -> Result<SourceRecord, GeometryError> {
    let id = feature
        .property(&schema.id_property)
        .and_then(json_to_id)
        .or_else(|| feature.id.as_ref().and_then(feature_id_to_i64));

    let status = feature
        .property(&schema.status_property)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let geometry = feature
        .geometry
        .map(geo::Geometry::<f64>::try_from)
        .transpose()
        .map_err(|e| {
            GeometryError::invalid_input(format!(
                "Feature {} has an unconvertible geometry: {e}",
                id.map_or_else(|| "without id".to_string(), |id| id.to_string())
            ))
        })?;

    Ok(SourceRecord {
        id,
        status,
        geometry,
    })
}

/// Reads an identifier from a number or numeric string.
fn json_to_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => number_to_i64(n),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn feature_id_to_i64(id: &Id) -> Option<i64> {
    match id {
        Id::Number(n) => number_to_i64(n),
        Id::String(s) => s.trim().parse().ok(),
    }
}

/// WDPA identifiers are sometimes exported as floats (`115772.0`).
#[allow(clippy::cast_possible_truncation)]
fn number_to_i64(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}
