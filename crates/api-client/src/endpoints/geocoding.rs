//! Place-name lookup against a Nominatim-compatible service

use crate::client::GeoremindClient;
use crate::error::{ApiError, ApiResult};
use georemind_geo::Coordinate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Geocoding API interface
#[derive(Clone)]
pub struct GeocodingApi {
    client: GeoremindClient,
}

/// Best match for a place name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeMatch {
    /// Where the place is
    pub coordinate: Coordinate,
    /// Full name as reported by the geocoder
    pub display_name: String,
}

/// Nominatim reports degrees as strings; some compatible services use numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Text(String),
    Number(f64),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Degrees,
    lon: Degrees,
    #[serde(default)]
    display_name: String,
}

impl GeocodingApi {
    /// Create a new geocoding API interface
    pub(crate) fn new(client: GeoremindClient) -> Self {
        Self { client }
    }

    /// Look up a place name, returning the first result.
    ///
    /// `Ok(None)` when nothing matched or the match had unusable coordinates.
    pub async fn search(&self, query: &str) -> ApiResult<Option<GeocodeMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput("Location name is empty".into()));
        }

        let config = self.client.config();
        let url = format!("{}/search", config.geocoding_url.trim_end_matches('/'));
        let places: Vec<Place> = self
            .client
            .get_url(&url, &[("format", "json"), ("limit", "1"), ("q", query)], config.geocoding_timeout)
            .await?;

        Ok(first_match(query, places))
    }
}

fn first_match(query: &str, places: Vec<Place>) -> Option<GeocodeMatch> {
    let Some(place) = places.into_iter().next() else {
        debug!(query, "No geocoding results");
        return None;
    };

    let coordinate = match (place.lat.value(), place.lon.value()) {
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
        _ => {
            warn!(query, lat = ?place.lat, lon = ?place.lon, "Geocoder returned unparsable coordinates");
            return None;
        }
    };
    if !coordinate.is_valid() {
        warn!(query, %coordinate, "Geocoder returned out-of-range coordinates");
        return None;
    }

    Some(GeocodeMatch {
        coordinate,
        display_name: place.display_name,
    })
}
