//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur when building coordinates.
#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    /// Latitude or longitude is NaN or infinite
    #[error("Coordinate is not a finite number: ({lat}, {lng})")]
    NotFinite {
        /// Offending latitude
        lat: f64,
        /// Offending longitude
        lng: f64,
    },

    /// Latitude outside -90..=90 or longitude outside -180..=180
    #[error("Coordinate out of range: ({lat}, {lng})")]
    OutOfRange {
        /// Offending latitude
        lat: f64,
        /// Offending longitude
        lng: f64,
    },
}

/// Error code for integration with georemind-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Non-finite coordinate
    NotFinite = 10001,
    /// Coordinate outside WGS-84 bounds
    OutOfRange = 10002,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::NotFinite { .. } => GeoErrorCode::NotFinite,
            GeoError::OutOfRange { .. } => GeoErrorCode::OutOfRange,
        }
    }
}
