//! Reshapes nested extractor tables into long-form annual area series.
//!
//! Each table carries its annual areas under [`AREA_FIELD`], either wide
//! (`{ "2001": 500.0, "2002": 480.0 }`) or long
//! (`[{ "year": 2001, "area_ha": 500.0 }, ...]`). Years may be integers,
//! numeric strings, ISO dates, or RFC 3339 timestamps.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, NaiveDate};
use forest_loss_zone_models::{
    AnalysisUnit, AnnualAreaSeries, UnitIndicatorTable, YearArea, Zone,
};
use serde_json::Value;

use crate::SeriesError;

/// Indicator field holding the annual forest cover area in hectares.
pub const AREA_FIELD: &str = "area_ha";

/// Year field of a long-form row.
pub const YEAR_FIELD: &str = "year";

const CALENDAR_YEARS: RangeInclusive<i64> = 1..=9999;

/// Converts extractor tables into one series per unit.
///
/// `tables[i]` belongs to `units[i]`; the returned series follow the same
/// order and carry the unit's zone. A table with no years yields an empty
/// series.
///
/// # Errors
///
/// Returns [`SeriesError`] if the table count differs from the unit count,
/// a table is labelled with another zone, the area field is missing or
/// malformed, a year cannot be parsed, an area is negative or not a
/// number, or a year repeats.
pub fn reshape_tables(
    units: &[AnalysisUnit],
    tables: &[UnitIndicatorTable],
) -> Result<Vec<AnnualAreaSeries>, SeriesError> {
    if units.len() != tables.len() {
        return Err(SeriesError::UnitCount {
            expected: units.len(),
            found: tables.len(),
        });
    }

    units
        .iter()
        .zip(tables)
        .enumerate()
        .map(|(index, (unit, table))| reshape_table(index, unit.zone(), table))
        .collect()
}

fn reshape_table(
    index: usize,
    zone: Zone,
    table: &UnitIndicatorTable,
) -> Result<AnnualAreaSeries, SeriesError> {
    if let Some(found) = table.zone
        && found != zone
    {
        return Err(SeriesError::ZoneMismatch {
            index,
            expected: zone.to_string(),
            found: found.to_string(),
        });
    }

    let mut points = match table.indicators.get(AREA_FIELD) {
        Some(Value::Object(wide)) => wide
            .iter()
            .map(|(year, area)| {
                let year = parse_year_str(zone, year)?;
                Ok(YearArea {
                    year,
                    area_ha: parse_area(zone, year, area)?,
                })
            })
            .collect::<Result<Vec<_>, SeriesError>>()?,
        Some(Value::Array(rows)) => rows
            .iter()
            .map(|row| parse_row(zone, row))
            .collect::<Result<Vec<_>, SeriesError>>()?,
        _ => return Err(missing_field(zone, AREA_FIELD)),
    };

    points.sort_by_key(|p| p.year);
    if let Some(pair) = points.windows(2).find(|pair| pair[0].year == pair[1].year) {
        return Err(SeriesError::DuplicateYear {
            zone: zone.to_string(),
            year: pair[0].year,
        });
    }

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        log::debug!(
            "{zone}: reshaped {} year(s), {}-{}",
            points.len(),
            first.year,
            last.year
        );
    } else {
        log::debug!("{zone}: extractor returned no years");
    }

    Ok(AnnualAreaSeries::new(zone, points))
}

fn parse_row(zone: Zone, row: &Value) -> Result<YearArea, SeriesError> {
    let Value::Object(row) = row else {
        return Err(missing_field(zone, AREA_FIELD));
    };
    let year = row
        .get(YEAR_FIELD)
        .ok_or_else(|| missing_field(zone, YEAR_FIELD))?;
    let area = row
        .get(AREA_FIELD)
        .ok_or_else(|| missing_field(zone, AREA_FIELD))?;

    let year = parse_year_value(zone, year)?;
    Ok(YearArea {
        year,
        area_ha: parse_area(zone, year, area)?,
    })
}

fn parse_year_value(zone: Zone, value: &Value) -> Result<i32, SeriesError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(checked_year)
            .ok_or_else(|| invalid_year(zone, &n.to_string())),
        Value::String(s) => parse_year_str(zone, s),
        other => Err(invalid_year(zone, &other.to_string())),
    }
}

fn parse_year_str(zone: Zone, text: &str) -> Result<i32, SeriesError> {
    let trimmed = text.trim();

    let year = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|date| i64::from(date.year()))
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|ts| i64::from(ts.year()))
        });

    year.and_then(checked_year)
        .ok_or_else(|| invalid_year(zone, text))
}

fn checked_year(year: i64) -> Option<i32> {
    if CALENDAR_YEARS.contains(&year) {
        i32::try_from(year).ok()
    } else {
        None
    }
}

fn parse_area(zone: Zone, year: i32, value: &Value) -> Result<f64, SeriesError> {
    value
        .as_f64()
        .filter(|area| area.is_finite() && *area >= 0.0)
        .ok_or_else(|| SeriesError::InvalidArea {
            zone: zone.to_string(),
            year,
            value: value.to_string(),
        })
}

fn missing_field(zone: Zone, field: &str) -> SeriesError {
    SeriesError::MissingField {
        zone: zone.to_string(),
        field: field.to_string(),
    }
}

fn invalid_year(zone: Zone, value: &str) -> SeriesError {
    SeriesError::InvalidYear {
        zone: zone.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;
    use serde_json::json;

    use super::*;

    fn units() -> Vec<AnalysisUnit> {
        Zone::ALL
            .iter()
            .map(|zone| AnalysisUnit::new(*zone, 115_772, MultiPolygon(Vec::new())))
            .collect()
    }

    fn table(zone: Option<Zone>, indicators: &Value) -> UnitIndicatorTable {
        UnitIndicatorTable {
            zone,
            indicators: indicators.as_object().cloned().unwrap_or_default(),
        }
    }

    fn points(series: &AnnualAreaSeries) -> Vec<(i32, f64)> {
        series.points.iter().map(|p| (p.year, p.area_ha)).collect()
    }

    #[test]
    fn wide_tables_become_sorted_series() {
        let tables = vec![
            table(
                None,
                &json!({ "area_ha": { "2003": 480.0, "2001": 500.0, "2002": 480.0 } }),
            ),
            table(None, &json!({ "area_ha": { "2002": 850, "2001": 900 } })),
        ];

        let series = reshape_tables(&units(), &tables).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].zone, Zone::ProtectedArea);
        assert_eq!(
            points(&series[0]),
            vec![(2001, 500.0), (2002, 480.0), (2003, 480.0)]
        );
        assert_eq!(series[1].zone, Zone::BufferRing);
        assert_eq!(points(&series[1]), vec![(2001, 900.0), (2002, 850.0)]);
    }

    #[test]
    fn long_rows_and_date_years_are_accepted() {
        let tables = vec![
            table(
                Some(Zone::ProtectedArea),
                &json!({ "area_ha": [
                    { "year": "2002-01-01", "area_ha": 10.5 },
                    { "year": 2001, "area_ha": 12.0 },
                ] }),
            ),
            table(
                Some(Zone::BufferRing),
                &json!({ "area_ha": [
                    { "year": "2001-01-01T00:00:00Z", "area_ha": 3.0 },
                ] }),
            ),
        ];

        let series = reshape_tables(&units(), &tables).unwrap();

        assert_eq!(points(&series[0]), vec![(2001, 12.0), (2002, 10.5)]);
        assert_eq!(points(&series[1]), vec![(2001, 3.0)]);
    }

    #[test]
    fn empty_table_is_an_empty_series() {
        let tables = vec![
            table(None, &json!({ "area_ha": {} })),
            table(None, &json!({ "area_ha": [] })),
        ];
        let series = reshape_tables(&units(), &tables).unwrap();
        assert!(series.iter().all(|s| s.points.is_empty()));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn missing_area_field_is_a_schema_error() {
        let tables = vec![
            table(None, &json!({ "area_ha": { "2001": 1.0 } })),
            table(None, &json!({ "cover_pct": { "2001": 1.0 } })),
        ];
        match reshape_tables(&units(), &tables) {
            Err(SeriesError::MissingField { zone, field }) => {
                assert_eq!(zone, "buffer_ring");
                assert_eq!(field, AREA_FIELD);
            }
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn long_row_without_year_is_a_schema_error() {
        let tables = vec![
            table(None, &json!({ "area_ha": [{ "area_ha": 1.0 }] })),
            table(None, &json!({ "area_ha": [] })),
        ];
        assert!(matches!(
            reshape_tables(&units(), &tables),
            Err(SeriesError::MissingField { field, .. }) if field == YEAR_FIELD
        ));
    }

    #[test]
    fn unparseable_year_is_a_schema_error() {
        for bad in ["twenty-ten", "2001.5", "-4", "12345"] {
            let mut wide = serde_json::Map::new();
            wide.insert(bad.to_string(), json!(1.0));
            let tables = vec![
                table(None, &json!({ "area_ha": wide })),
                table(None, &json!({ "area_ha": {} })),
            ];
            assert!(
                matches!(
                    reshape_tables(&units(), &tables),
                    Err(SeriesError::InvalidYear { .. })
                ),
                "{bad} should not parse as a year"
            );
        }
    }

    #[test]
    fn negative_or_textual_area_is_a_schema_error() {
        for bad in [json!(-1.0), json!("lots"), json!(null)] {
            let tables = vec![
                table(None, &json!({ "area_ha": { "2001": bad } })),
                table(None, &json!({ "area_ha": {} })),
            ];
            assert!(matches!(
                reshape_tables(&units(), &tables),
                Err(SeriesError::InvalidArea { year: 2001, .. })
            ));
        }
    }

    #[test]
    fn repeated_year_is_a_schema_error() {
        let tables = vec![
            table(
                None,
                &json!({ "area_ha": { "2001": 1.0, "2001-01-01": 2.0 } }),
            ),
            table(None, &json!({ "area_ha": {} })),
        ];
        assert!(matches!(
            reshape_tables(&units(), &tables),
            Err(SeriesError::DuplicateYear { year: 2001, .. })
        ));
    }

    #[test]
    fn dropped_unit_is_a_schema_error() {
        let tables = vec![table(None, &json!({ "area_ha": {} }))];
        assert!(matches!(
            reshape_tables(&units(), &tables),
            Err(SeriesError::UnitCount {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn swapped_zone_labels_are_a_schema_error() {
        let tables = vec![
            table(Some(Zone::BufferRing), &json!({ "area_ha": {} })),
            table(Some(Zone::ProtectedArea), &json!({ "area_ha": {} })),
        ];
        assert!(matches!(
            reshape_tables(&units(), &tables),
            Err(SeriesError::ZoneMismatch { index: 0, .. })
        ));
    }
}
