//! In-memory extractor serving a fixed set of tables.

use std::sync::atomic::{AtomicUsize, Ordering};

use forest_loss_zone_models::{AnalysisUnit, ExtractionConfig, UnitIndicatorTable};

use crate::{ExtractError, IndicatorExtractor};

/// Returns the same tables on every call, regardless of the units asked
/// for. Counts calls so callers can check whether extraction ran.
pub struct StaticExtractor {
    tables: Vec<UnitIndicatorTable>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    #[must_use]
    pub const fn new(tables: Vec<UnitIndicatorTable>) -> Self {
        Self {
            tables,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`IndicatorExtractor::extract`] has been called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IndicatorExtractor for StaticExtractor {
    fn extract(
        &self,
        units: &[AnalysisUnit],
        _config: &ExtractionConfig,
    ) -> Result<Vec<UnitIndicatorTable>, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Serving {} static table(s) for {} unit(s)",
            self.tables.len(),
            units.len()
        );
        Ok(self.tables.clone())
    }
}
