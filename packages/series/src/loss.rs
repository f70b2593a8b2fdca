//! Year-over-year forest loss derivation.
//!
//! Loss for a year is the magnitude of change in cumulative area since the
//! previous year, rounded to whole hectares. The absolute value is kept
//! on purpose: raster products report the cumulative metric either as
//! remaining cover (decreasing) or as cumulative loss (increasing), and
//! both must give the same loss. The first year has no predecessor and
//! always reports zero.

use forest_loss_zone_models::{AnnualAreaSeries, LossSeries, YearLoss};

use crate::SeriesError;

/// Derives the loss series for one zone.
///
/// The output has the same years, in the same ascending order, as the
/// input. Input that is not sorted by year is sorted first.
///
/// # Errors
///
/// Returns [`SeriesError::DuplicateYear`] if a year repeats, or
/// [`SeriesError::InvalidArea`] if an area is not finite.
pub fn derive_loss(series: &AnnualAreaSeries) -> Result<LossSeries, SeriesError> {
    let zone = series.zone;
    let mut points = series.points.clone();

    if !points.is_sorted_by_key(|p| p.year) {
        log::debug!("{zone}: area series not sorted by year, sorting before derivation");
        points.sort_by_key(|p| p.year);
    }
    if let Some(pair) = points.windows(2).find(|pair| pair[0].year == pair[1].year) {
        return Err(SeriesError::DuplicateYear {
            zone: zone.to_string(),
            year: pair[0].year,
        });
    }
    if let Some(bad) = points.iter().find(|p| !p.area_ha.is_finite()) {
        return Err(SeriesError::InvalidArea {
            zone: zone.to_string(),
            year: bad.year,
            value: bad.area_ha.to_string(),
        });
    }

    let mut previous: Option<f64> = None;
    let points: Vec<YearLoss> = points
        .iter()
        .map(|point| {
            let loss_ha = previous.map_or(0, |prev| whole_hectares(point.area_ha - prev));
            previous = Some(point.area_ha);
            YearLoss {
                year: point.year,
                loss_ha,
            }
        })
        .collect();

    log::debug!(
        "{zone}: derived {} loss value(s), total {} ha",
        points.len(),
        points.iter().map(|p| p.loss_ha).sum::<u64>()
    );

    Ok(LossSeries { zone, points })
}

/// Derives loss for every zone independently, preserving zone order.
///
/// # Errors
///
/// Returns the first [`SeriesError`] raised by [`derive_loss`].
pub fn derive_losses(series: &[AnnualAreaSeries]) -> Result<Vec<LossSeries>, SeriesError> {
    series.iter().map(derive_loss).collect()
}

/// Rounds the magnitude of `delta` half away from zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_hectares(delta: f64) -> u64 {
    delta.abs().round() as u64
}
