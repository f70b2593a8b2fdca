//! Local planar projection for buffering geographic geometries.
//!
//! Buffer distances are given in metres but protected area boundaries
//! usually arrive as longitude/latitude. Geometries are projected into an
//! equirectangular plane centred on the source centroid, buffered there,
//! and projected back. Distortion stays small at protected-area scale;
//! geometries crossing the antimeridian are not supported.

use geo::{Centroid, Coord, MapCoords, MultiPolygon};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Below this the east-west scale factor degenerates (within ~0.06 m of
/// a pole).
const MIN_COS_LAT: f64 = 1.0e-8;

/// Equirectangular projection centred on a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lon: f64,
    origin_lat: f64,
    cos_lat: f64,
}

impl LocalProjection {
    /// Creates a projection centred on `(lon, lat)` in degrees.
    ///
    /// Returns `None` at the poles or for non-finite input.
    #[must_use]
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let cos_lat = lat.to_radians().cos();
        if cos_lat < MIN_COS_LAT {
            return None;
        }
        Some(Self {
            origin_lon: lon,
            origin_lat: lat,
            cos_lat,
        })
    }

    /// Creates a projection centred on the centroid of `geometry`.
    #[must_use]
    pub fn centered_on(geometry: &MultiPolygon<f64>) -> Option<Self> {
        let centroid = geometry.centroid()?;
        Self::new(centroid.x(), centroid.y())
    }

    /// Degrees to metres.
    #[must_use]
    pub fn forward(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|c| self.forward_coord(c))
    }

    /// Metres to degrees.
    #[must_use]
    pub fn inverse(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|c| self.inverse_coord(c))
    }

    fn forward_coord(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.origin_lon).to_radians() * EARTH_RADIUS_M * self.cos_lat,
            y: (c.y - self.origin_lat).to_radians() * EARTH_RADIUS_M,
        }
    }

    fn inverse_coord(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x / (EARTH_RADIUS_M * self.cos_lat)).to_degrees() + self.origin_lon,
            y: (c.y / EARTH_RADIUS_M).to_degrees() + self.origin_lat,
        }
    }
}
