//! Extractor backed by precomputed tables in a cache directory.
//!
//! Each protected area has one file, `<id>.json`:
//!
//! ```json
//! {
//!   "min_patch_size_ha": 1.0,
//!   "min_cover_pct": 30.0,
//!   "units": [
//!     { "zone": "protected_area", "indicators": { "area_ha": { "2001": 500.0 } } },
//!     { "zone": "buffer_ring", "indicators": { "area_ha": { "2001": 900.0 } } }
//!   ]
//! }
//! ```
//!
//! Files are written by [`CachedTableExtractor::store`], which stamps the
//! thresholds the tables were computed under.
//!
//! The directory is always passed in explicitly; nothing here reads a
//! process-wide output or cache location.

use std::{
    collections::{BTreeMap, btree_map::Entry},
    path::{Path, PathBuf},
    sync::Arc,
};

use forest_loss_zone_models::{AnalysisUnit, ExtractionConfig, UnitIndicatorTable};
use serde::{Deserialize, Serialize};

use crate::{
    ExtractError, IndicatorExtractor,
    progress::{ProgressCallback, null_progress},
};

/// Thresholds are compared with this absolute tolerance.
const THRESHOLD_TOLERANCE: f64 = 1e-9;

/// On-disk layout of a cached table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedTables {
    min_patch_size_ha: f64,
    min_cover_pct: f64,
    units: Vec<UnitIndicatorTable>,
}

/// Serves indicator tables from `<dir>/<id>.json`.
pub struct CachedTableExtractor {
    dir: PathBuf,
    progress: Arc<dyn ProgressCallback>,
}

impl CachedTableExtractor {
    /// Creates an extractor reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            progress: null_progress(),
        }
    }

    /// Reports per-unit progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Path of the table file for protected area `id`.
    #[must_use]
    pub fn table_path(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Writes tables for protected area `id` computed under `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the directory or file cannot be written.
    pub fn store(
        &self,
        id: i64,
        config: &ExtractionConfig,
        units: Vec<UnitIndicatorTable>,
    ) -> Result<PathBuf, ExtractError> {
        let path = self.table_path(id);
        std::fs::create_dir_all(&self.dir).map_err(|source| ExtractError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let body = CachedTables {
            min_patch_size_ha: config.min_patch_size_ha,
            min_cover_pct: config.min_cover_pct,
            units,
        };
        let json = serde_json::to_string_pretty(&body).map_err(|source| ExtractError::Json {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(path)
    }

    fn load(&self, id: i64, config: &ExtractionConfig) -> Result<CachedTables, ExtractError> {
        let path = self.table_path(id);
        let text = std::fs::read_to_string(&path).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tables: CachedTables = serde_json::from_str(&text).map_err(|source| {
            ExtractError::Json {
                path: path.display().to_string(),
                source,
            }
        })?;

        check_thresholds(&path, &tables, config)?;
        log::debug!(
            "Loaded {} cached table(s) from {}",
            tables.units.len(),
            path.display()
        );

        Ok(tables)
    }
}

impl IndicatorExtractor for CachedTableExtractor {
    fn extract(
        &self,
        units: &[AnalysisUnit],
        config: &ExtractionConfig,
    ) -> Result<Vec<UnitIndicatorTable>, ExtractError> {
        self.progress.set_total(units.len() as u64);
        self.progress
            .set_message(format!("Reading cached tables from {}", self.dir.display()));

        let mut loaded: BTreeMap<i64, CachedTables> = BTreeMap::new();
        let mut positions: BTreeMap<i64, usize> = BTreeMap::new();
        let mut results = Vec::with_capacity(units.len());

        for unit in units {
            let id = unit.id();
            let tables = match loaded.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(self.load(id, config)?),
            };

            let position = positions.entry(id).or_insert(0);
            let table =
                select_table(&tables.units, unit, *position).ok_or_else(|| missing(unit))?;
            *position += 1;

            results.push(table.clone());
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        log::info!("Served {} indicator table(s) from cache", results.len());

        Ok(results)
    }
}

/// Picks the table for `unit`: by zone label when every stored table has
/// one, otherwise by position among the units sharing its identifier.
fn select_table<'a>(
    tables: &'a [UnitIndicatorTable],
    unit: &AnalysisUnit,
    position: usize,
) -> Option<&'a UnitIndicatorTable> {
    if tables.iter().all(|t| t.zone.is_some()) {
        tables.iter().find(|t| t.zone == Some(unit.zone()))
    } else {
        tables.get(position)
    }
}

fn missing(unit: &AnalysisUnit) -> ExtractError {
    ExtractError::MissingUnit {
        zone: unit.zone().to_string(),
        id: unit.id(),
    }
}

fn check_thresholds(
    path: &Path,
    tables: &CachedTables,
    config: &ExtractionConfig,
) -> Result<(), ExtractError> {
    let patch_matches =
        (tables.min_patch_size_ha - config.min_patch_size_ha).abs() <= THRESHOLD_TOLERANCE;
    let cover_matches = (tables.min_cover_pct - config.min_cover_pct).abs() <= THRESHOLD_TOLERANCE;

    if patch_matches && cover_matches {
        Ok(())
    } else {
        Err(ExtractError::ThresholdMismatch {
            path: path.display().to_string(),
            found_patch: tables.min_patch_size_ha,
            found_cover: tables.min_cover_pct,
            requested_patch: config.min_patch_size_ha,
            requested_cover: config.min_cover_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use forest_loss_zone_models::Zone;
    use geo::MultiPolygon;
    use serde_json::json;

    use super::*;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "forest_loss_cached_{}_{name}",
                std::process::id()
            ));
            let _ = std::fs::remove_dir_all(&path);
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn config() -> ExtractionConfig {
        ExtractionConfig {
            min_patch_size_ha: 1.0,
            min_cover_pct: 30.0,
        }
    }

    fn units(id: i64) -> Vec<AnalysisUnit> {
        Zone::ALL
            .iter()
            .map(|zone| AnalysisUnit::new(*zone, id, MultiPolygon(Vec::new())))
            .collect()
    }

    fn table(zone: Option<Zone>, first: f64) -> UnitIndicatorTable {
        let indicators = json!({ "area_ha": { "2001": first } });
        UnitIndicatorTable {
            zone,
            indicators: indicators.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn returns_tables_in_unit_order() {
        let dir = TempDir::new("order");
        let extractor = CachedTableExtractor::new(&dir.0);
        // Stored buffer-first; labels let the extractor reorder them.
        extractor
            .store(
                115_772,
                &config(),
                vec![
                    table(Some(Zone::BufferRing), 900.0),
                    table(Some(Zone::ProtectedArea), 500.0),
                ],
            )
            .unwrap();

        let result = extractor.extract(&units(115_772), &config()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].zone, Some(Zone::ProtectedArea));
        assert_eq!(result[1].zone, Some(Zone::BufferRing));
    }

    #[test]
    fn unlabelled_tables_are_positional() {
        let dir = TempDir::new("positional");
        let extractor = CachedTableExtractor::new(&dir.0);
        extractor
            .store(7, &config(), vec![table(None, 1.0), table(None, 2.0)])
            .unwrap();

        let result = extractor.extract(&units(7), &config()).unwrap();
        assert_eq!(result[0].indicators["area_ha"]["2001"], json!(1.0));
        assert_eq!(result[1].indicators["area_ha"]["2001"], json!(2.0));
    }

    #[test]
    fn missing_zone_is_an_error() {
        let dir = TempDir::new("missing_zone");
        let extractor = CachedTableExtractor::new(&dir.0);
        extractor
            .store(7, &config(), vec![table(Some(Zone::ProtectedArea), 1.0)])
            .unwrap();

        assert!(matches!(
            extractor.extract(&units(7), &config()),
            Err(ExtractError::MissingUnit { id: 7, .. })
        ));
    }

    #[test]
    fn threshold_mismatch_is_an_error() {
        let dir = TempDir::new("thresholds");
        let extractor = CachedTableExtractor::new(&dir.0);
        extractor
            .store(7, &config(), vec![table(None, 1.0), table(None, 2.0)])
            .unwrap();

        let other = ExtractionConfig {
            min_patch_size_ha: 1.0,
            min_cover_pct: 50.0,
        };
        assert!(matches!(
            extractor.extract(&units(7), &other),
            Err(ExtractError::ThresholdMismatch { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new("absent");
        let extractor = CachedTableExtractor::new(&dir.0);
        assert!(matches!(
            extractor.extract(&units(1), &config()),
            Err(ExtractError::Io { .. })
        ));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = TempDir::new("malformed");
        std::fs::create_dir_all(&dir.0).unwrap();
        let extractor = CachedTableExtractor::new(&dir.0);
        std::fs::write(extractor.table_path(3), "{ not json").unwrap();
        assert!(matches!(
            extractor.extract(&units(3), &config()),
            Err(ExtractError::Json { .. })
        ));
    }
}
