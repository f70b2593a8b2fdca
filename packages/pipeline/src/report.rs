//! Report types handed to chart and table consumers.

use forest_loss_zone_models::{AnnualAreaSeries, DisplayOrder, LossSeries, Zone};
use serde::Serialize;

/// Annual area and loss for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneReport {
    pub zone: Zone,
    /// Legend label for the zone.
    pub label: &'static str,
    pub area_series: AnnualAreaSeries,
    pub loss_series: LossSeries,
    /// Sum of the per-year losses, in hectares.
    pub total_loss_ha: u64,
}

/// Result of a pipeline run for one protected area.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForestLossReport {
    /// Protected area identifier.
    pub id: i64,
    /// Chart layout requested in the configuration.
    pub display_order: DisplayOrder,
    /// One entry per zone, protected area first.
    pub zones: Vec<ZoneReport>,
}

impl ForestLossReport {
    /// Pairs each area series with the loss series derived from it.
    ///
    /// Both inputs are in binding order; the loss stage never reorders
    /// zones.
    #[must_use]
    pub fn new(
        id: i64,
        display_order: DisplayOrder,
        area_series: Vec<AnnualAreaSeries>,
        loss_series: Vec<LossSeries>,
    ) -> Self {
        let zones = area_series
            .into_iter()
            .zip(loss_series)
            .map(|(area_series, loss_series)| ZoneReport {
                zone: area_series.zone,
                label: area_series.zone.label(),
                total_loss_ha: loss_series.total_ha(),
                area_series,
                loss_series,
            })
            .collect();

        Self {
            id,
            display_order,
            zones,
        }
    }

    /// The report for `zone`, if present.
    #[must_use]
    pub fn zone(&self, zone: Zone) -> Option<&ZoneReport> {
        self.zones.iter().find(|z| z.zone == zone)
    }

    /// The loss series of every zone, in binding order.
    #[must_use]
    pub fn loss_series(&self) -> Vec<&LossSeries> {
        self.zones.iter().map(|z| &z.loss_series).collect()
    }
}
