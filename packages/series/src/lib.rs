#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Annual area series and forest loss derivation.
//!
//! [`reshape`] turns the nested per-unit tables returned by an extractor
//! into one [`AnnualAreaSeries`] per zone. [`loss`] turns each of those
//! into a [`LossSeries`] of whole-hectare, year-over-year change.
//!
//! [`AnnualAreaSeries`]: forest_loss_zone_models::AnnualAreaSeries
//! [`LossSeries`]: forest_loss_zone_models::LossSeries

pub mod loss;
pub mod reshape;

pub use loss::{derive_loss, derive_losses};
pub use reshape::{AREA_FIELD, reshape_tables};

use thiserror::Error;

/// Errors raised when extractor output or a series does not have the
/// expected shape.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// The extractor returned a different number of tables than units.
    #[error("Expected {expected} indicator table(s), got {found}")]
    UnitCount {
        /// Number of bound units.
        expected: usize,
        /// Number of tables returned.
        found: usize,
    },

    /// A table's echoed zone disagrees with the unit at its position.
    #[error("Indicator table {index} is labelled {found} but unit {index} is {expected}")]
    ZoneMismatch {
        /// Position of the table.
        index: usize,
        /// Zone of the bound unit.
        expected: String,
        /// Zone echoed by the extractor.
        found: String,
    },

    /// A required field is absent or has the wrong shape.
    #[error("{zone}: field '{field}' is missing or malformed")]
    MissingField {
        /// Zone whose table is affected.
        zone: String,
        /// Name of the field.
        field: String,
    },

    /// A year value cannot be read as a calendar year.
    #[error("{zone}: '{value}' is not a calendar year")]
    InvalidYear {
        /// Zone whose table is affected.
        zone: String,
        /// The offending value as written.
        value: String,
    },

    /// An area value is not a finite, non-negative number.
    #[error("{zone}: area for {year} is not a non-negative number ({value})")]
    InvalidArea {
        /// Zone whose table is affected.
        zone: String,
        /// Year of the offending value.
        year: i32,
        /// The offending value as written.
        value: String,
    },

    /// The same year appears more than once for a zone.
    #[error("{zone}: year {year} appears more than once")]
    DuplicateYear {
        /// Zone whose series is affected.
        zone: String,
        /// The repeated year.
        year: i32,
    },
}
