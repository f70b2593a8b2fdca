//! Exports for chart, table, and map consumers.
//!
//! * [`write_json`]: the full report.
//! * [`write_csv`]: one long-form row per zone and year.
//! * [`zones_feature_collection`]: the two zone geometries as a `GeoJSON`
//!   layer.

use std::io::Write;

use forest_loss_geometry::PreparedZones;
use forest_loss_zone_models::Zone;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use thiserror::Error;

use crate::ForestLossReport;

/// Errors that can occur while writing exports.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing to the destination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the long-form CSV export.
#[derive(Debug, Serialize)]
struct SeriesRow {
    zone: Zone,
    year: i32,
    area_ha: f64,
    loss_ha: u64,
}

/// Writes the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization or writing fails.
pub fn write_json<W: Write>(report: &ForestLossReport, mut writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes `zone,year,area_ha,loss_ha` rows, protected area first.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization or writing fails.
pub fn write_csv<W: Write>(report: &ForestLossReport, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);

    for zone in &report.zones {
        for (area, loss) in zone.area_series.points.iter().zip(&zone.loss_series.points) {
            csv.serialize(SeriesRow {
                zone: zone.zone,
                year: loss.year,
                area_ha: area.area_ha,
                loss_ha: loss.loss_ha,
            })?;
        }
    }

    csv.flush()?;
    Ok(())
}

/// Builds a `FeatureCollection` with one feature per zone, carrying
/// `zone`, `id`, and `label` properties for map styling.
#[must_use]
pub fn zones_feature_collection(zones: &PreparedZones) -> FeatureCollection {
    let features = Zone::ALL
        .iter()
        .map(|&zone| {
            let geometry = match zone {
                Zone::ProtectedArea => &zones.protected_area,
                Zone::BufferRing => &zones.buffer_ring,
            };

            let mut properties = JsonObject::new();
            properties.insert("zone".to_string(), zone.as_ref().into());
            properties.insert("id".to_string(), zones.id.into());
            properties.insert("label".to_string(), zone.label().into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use forest_loss_zone_models::{
        AnnualAreaSeries, DisplayOrder, LossSeries, YearArea, YearLoss,
    };
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn report() -> ForestLossReport {
        ForestLossReport::new(
            115_772,
            DisplayOrder::Stacked,
            vec![
                AnnualAreaSeries::new(
                    Zone::ProtectedArea,
                    vec![
                        YearArea {
                            year: 2001,
                            area_ha: 500.0,
                        },
                        YearArea {
                            year: 2002,
                            area_ha: 480.0,
                        },
                    ],
                ),
                AnnualAreaSeries::new(
                    Zone::BufferRing,
                    vec![YearArea {
                        year: 2001,
                        area_ha: 900.0,
                    }],
                ),
            ],
            vec![
                LossSeries {
                    zone: Zone::ProtectedArea,
                    points: vec![
                        YearLoss {
                            year: 2001,
                            loss_ha: 0,
                        },
                        YearLoss {
                            year: 2002,
                            loss_ha: 20,
                        },
                    ],
                },
                LossSeries {
                    zone: Zone::BufferRing,
                    points: vec![YearLoss {
                        year: 2001,
                        loss_ha: 0,
                    }],
                },
            ],
        )
    }

    #[test]
    fn csv_is_long_form() {
        let mut out = Vec::new();
        write_csv(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "zone,year,area_ha,loss_ha\n\
             protected_area,2001,500.0,0\n\
             protected_area,2002,480.0,20\n\
             buffer_ring,2001,900.0,0\n"
        );
    }

    #[test]
    fn json_round_trips_through_serde_value() {
        let mut out = Vec::new();
        write_json(&report(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["id"], 115_772);
        assert_eq!(value["zones"][1]["zone"], "buffer_ring");
    }

    #[test]
    fn zone_layer_has_one_feature_per_zone() {
        let square = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0),
        ]]);
        let zones = PreparedZones {
            id: 7,
            protected_area: square.clone(),
            buffer_ring: square,
        };

        let layer = zones_feature_collection(&zones);

        assert_eq!(layer.features.len(), 2);
        let zone_names: Vec<&str> = layer
            .features
            .iter()
            .filter_map(|f| f.property("zone").and_then(serde_json::Value::as_str))
            .collect();
        assert_eq!(zone_names, vec!["protected_area", "buffer_ring"]);
        assert_eq!(
            layer.features[0].property("id"),
            Some(&serde_json::Value::from(7))
        );
        assert!(layer.features.iter().all(|f| f.geometry.is_some()));
    }
}
