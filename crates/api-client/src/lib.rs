//! HTTP collaborators for georemind
//!
//! - **SMS relay**: `POST {to, body}` to a relay that forwards to an SMS provider
//! - **Geocoding**: place name to coordinates through a Nominatim-compatible service
//! - **Request correlation**: every request carries a unique `X-Request-ID`
//!
//! Failures are reported to the caller and never retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use georemind_api_client::{ClientConfig, GeoremindClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeoremindClient::with_config(ClientConfig::default())?;
//!
//!     if let Some(place) = client.geocoding().search("Accra Mall").await? {
//!         println!("{} is at {}", place.display_name, place.coordinate);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;

#[cfg(test)]
mod test_support;

pub use client::GeoremindClient;
pub use config::ClientConfig;
pub use endpoints::{GeocodeMatch, GeocodingApi, SmsApi, SmsReceipt};
pub use error::{ApiError, ApiResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::GeoremindClient;
    pub use crate::config::ClientConfig;
    pub use crate::endpoints::{GeocodingApi, SmsApi};
    pub use crate::error::{ApiError, ApiResult};
}
