//! Binds prepared geometries into analysis units.

use forest_loss_zone_models::{AnalysisUnit, Zone};

use crate::PreparedZones;

/// Returns the protected area unit followed by the buffer ring unit.
///
/// Downstream stages match extractor output to zones by position, so this
/// order is fixed.
#[must_use]
pub fn bind_zones(prepared: &PreparedZones) -> [AnalysisUnit; 2] {
    Zone::ALL.map(|zone| {
        let geometry = match zone {
            Zone::ProtectedArea => prepared.protected_area.clone(),
            Zone::BufferRing => prepared.buffer_ring.clone(),
        };
        AnalysisUnit::new(zone, prepared.id, geometry)
    })
}
