//! Buffer ring preparation.
//!
//! The ring is the outward buffer of the protected area minus the area
//! itself, so the two zones never share interior area.

use forest_loss_zone_models::CoordinateSpace;
use geo::{Area, BooleanOps, Buffer, MultiPolygon, Validation};

use crate::{GeometryError, SourceRecord, projection::LocalProjection};

/// Parameters for [`prepare_zones`].
#[derive(Debug, Clone, Copy)]
pub struct PrepareOptions<'a> {
    /// Outward buffer distance. Metres for geographic input.
    pub buffer_distance: f64,
    pub coordinate_space: CoordinateSpace,
    /// Lowercase lifecycle statuses to drop before buffering.
    pub excluded_statuses: &'a [String],
}

/// The protected area and its buffer ring, interior-disjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedZones {
    /// Identifier shared by both zones.
    pub id: i64,
    pub protected_area: MultiPolygon<f64>,
    pub buffer_ring: MultiPolygon<f64>,
}

/// Builds the buffer ring for a single protected area record.
///
/// Records with an excluded lifecycle status are dropped first. Exactly
/// one record must remain.
///
/// # Errors
///
/// * [`GeometryError::InvalidInput`] if no records are supplied, more than
///   one record remains after filtering, the distance is negative or not
///   finite, or the remaining record lacks an identifier or a valid
///   polygon geometry.
/// * [`GeometryError::NoData`] if filtering removes every record.
/// * [`GeometryError::InvalidGeometry`] if the ring comes out empty or
///   invalid.
pub fn prepare_zones(
    records: Vec<SourceRecord>,
    options: &PrepareOptions<'_>,
) -> Result<PreparedZones, GeometryError> {
    if records.is_empty() {
        return Err(GeometryError::invalid_input("No source records supplied"));
    }
    if !options.buffer_distance.is_finite() || options.buffer_distance < 0.0 {
        return Err(GeometryError::invalid_input(format!(
            "Buffer distance must be finite and non-negative, got {}",
            options.buffer_distance
        )));
    }

    let supplied = records.len();
    let mut kept: Vec<SourceRecord> = records
        .into_iter()
        .filter(|record| {
            let excluded = record.is_excluded(options.excluded_statuses);
            if excluded {
                log::warn!(
                    "Excluding record {:?} with status {:?}",
                    record.id,
                    record.status
                );
            }
            !excluded
        })
        .collect();

    if kept.is_empty() {
        return Err(GeometryError::NoData {
            message: format!(
                "All {supplied} record(s) have a non-finalized status ({})",
                options.excluded_statuses.join(", ")
            ),
        });
    }
    if kept.len() > 1 {
        return Err(GeometryError::invalid_input(format!(
            "Expected exactly one protected area record, got {}",
            kept.len()
        )));
    }

    let Some(record) = kept.pop() else {
        return Err(GeometryError::invalid_input("No source records supplied"));
    };
    let Some(id) = record.id else {
        return Err(GeometryError::invalid_input(
            "Protected area record has no identifier",
        ));
    };
    let protected_area = to_multipolygon(record.geometry, id)?;

    if options.buffer_distance <= 0.0 {
        return Err(GeometryError::invalid_geometry("Buffer ring at distance 0 is empty"));
    }

    let buffered = match options.coordinate_space {
        CoordinateSpace::Projected => protected_area.buffer(options.buffer_distance),
        CoordinateSpace::Geographic => {
            let projection = LocalProjection::centered_on(&protected_area).ok_or_else(|| {
                GeometryError::invalid_input(format!(
                    "Protected area {id} cannot be projected for buffering"
                ))
            })?;
            let planar = projection.forward(&protected_area);
            projection.inverse(&planar.buffer(options.buffer_distance))
        }
    };
    // Differenced in source coordinates: the ring must share no interior
    // with the source.
    let buffer_ring = build_ring(&buffered, &protected_area, options.buffer_distance)?;

    log::info!(
        "Prepared buffer ring for protected area {id}: {} polygon(s), distance {}",
        buffer_ring.0.len(),
        options.buffer_distance
    );

    Ok(PreparedZones {
        id,
        protected_area,
        buffer_ring,
    })
}

/// Removes `source` from its outward buffer `buffered`.
fn build_ring(
    buffered: &MultiPolygon<f64>,
    source: &MultiPolygon<f64>,
    distance: f64,
) -> Result<MultiPolygon<f64>, GeometryError> {
    let ring = buffered.difference(source);

    if ring.0.is_empty() || ring.unsigned_area() <= 0.0 {
        return Err(GeometryError::invalid_geometry(format!(
            "Buffer ring at distance {distance} is empty"
        )));
    }
    if !ring.is_valid() {
        return Err(GeometryError::invalid_geometry(format!(
            "Buffer ring at distance {distance} is not a valid geometry"
        )));
    }

    Ok(ring)
}

fn to_multipolygon(
    geometry: Option<geo::Geometry<f64>>,
    id: i64,
) -> Result<MultiPolygon<f64>, GeometryError> {
    let multi = match geometry {
        Some(geo::Geometry::Polygon(polygon)) => MultiPolygon(vec![polygon]),
        Some(geo::Geometry::MultiPolygon(multi)) => multi,
        Some(other) => {
            return Err(GeometryError::invalid_input(format!(
                "Protected area {id} must be a polygon or multipolygon, got {}",
                geometry_kind(&other)
            )));
        }
        None => {
            return Err(GeometryError::invalid_input(format!(
                "Protected area {id} has no geometry"
            )));
        }
    };

    if multi.0.is_empty() || multi.unsigned_area() <= 0.0 {
        return Err(GeometryError::invalid_input(format!(
            "Protected area {id} has an empty geometry"
        )));
    }
    if !multi.is_valid() {
        return Err(GeometryError::invalid_input(format!(
            "Protected area {id} has an invalid geometry"
        )));
    }

    Ok(multi)
}

const fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
