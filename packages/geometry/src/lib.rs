#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry preparation for forest loss analysis.
//!
//! Parses the protected area source feature, builds the buffer ring
//! around it (outward buffer minus the area itself), and binds the two
//! geometries into the fixed pair of [`AnalysisUnit`]s handed to indicator
//! extraction.
//!
//! [`AnalysisUnit`]: forest_loss_zone_models::AnalysisUnit

pub mod bind;
pub mod prepare;
pub mod projection;
pub mod source;

pub use bind::bind_zones;
pub use prepare::{PrepareOptions, PreparedZones, prepare_zones};
pub use source::{SourceRecord, SourceSchema, parse_source_records};

use thiserror::Error;

/// Errors that can occur while preparing zone geometries.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The source input is malformed, has the wrong record count, or
    /// carries an unusable geometry.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what is wrong with the input.
        message: String,
    },

    /// Filtering removed every usable record.
    #[error("No usable data: {message}")]
    NoData {
        /// Description of why nothing remained.
        message: String,
    },

    /// Buffering or differencing produced an empty or invalid geometry.
    #[error("Geometry error: {message}")]
    InvalidGeometry {
        /// Description of the geometry problem.
        message: String,
    },
}

impl GeometryError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }
}
