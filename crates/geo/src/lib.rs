//! Geospatial primitives for georemind.
//!
//! This crate provides:
//! - The [`Coordinate`] type shared by reminders and position fixes
//! - Haversine great-circle distance in meters and kilometers
//!
//! # Example
//!
//! ```
//! use georemind_geo::{haversine_distance_meters, Coordinate};
//!
//! let reminder = Coordinate::new(5.6000, -0.2000);
//! let fix = Coordinate::new(5.6005, -0.2000);
//!
//! let meters = haversine_distance_meters(&reminder, &fix);
//! assert!((meters - 55.6).abs() < 1.0);
//! ```

mod error;
mod haversine;

pub use error::{GeoError, GeoErrorCode, Result};
pub use haversine::{haversine_distance, haversine_distance_meters, EARTH_RADIUS_KM, EARTH_RADIUS_M};

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lng: f64,
}

impl Coordinate {
    /// Creates a new coordinate without validation.
    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Creates a coordinate, rejecting non-finite or out-of-range values.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self> {
        let coord = Self::new(lat, lng);
        if !coord.is_finite() {
            return Err(GeoError::NotFinite { lat, lng });
        }
        if !coord.is_valid() {
            return Err(GeoError::OutOfRange { lat, lng });
        }
        Ok(coord)
    }

    /// Returns true if both components are finite numbers.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Returns true if the coordinate lies within WGS-84 bounds.
    ///
    /// NaN components are never valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    #[inline]
    pub(crate) fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lng.to_radians())
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}
