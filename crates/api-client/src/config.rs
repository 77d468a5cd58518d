//! Configuration for the API client
//!
//! Built from the `[sms]` and `[geocoding]` sections of the georemind
//! configuration, or assembled directly with the builder methods.

use crate::error::{ApiError, ApiResult};
use georemind_core::config::{GeocodingConfig, SmsConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// SMS relay URL accepting `POST {to, body}`
    pub sms_url: String,
    /// Timeout for one SMS request
    #[serde(with = "duration_secs")]
    pub sms_timeout: Duration,
    /// Base URL of a Nominatim-compatible geocoder
    pub geocoding_url: String,
    /// Timeout for one geocoding lookup
    #[serde(with = "duration_secs")]
    pub geocoding_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_settings(&SmsConfig::default(), &GeocodingConfig::default())
    }
}

impl ClientConfig {
    /// Create configuration from the application settings
    #[must_use]
    pub fn from_settings(sms: &SmsConfig, geocoding: &GeocodingConfig) -> Self {
        Self {
            sms_url: sms.endpoint.clone(),
            sms_timeout: Duration::from_secs(sms.timeout_secs),
            geocoding_url: geocoding.endpoint.clone(),
            geocoding_timeout: Duration::from_secs(geocoding.timeout_secs),
            user_agent: geocoding.user_agent.clone(),
        }
    }

    /// Builder-style method to set the SMS relay URL
    #[must_use]
    pub fn with_sms_url(mut self, url: impl Into<String>) -> Self {
        self.sms_url = url.into();
        self
    }

    /// Builder-style method to set the geocoder base URL
    #[must_use]
    pub fn with_geocoding_url(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = url.into();
        self
    }

    /// Builder-style method to set both timeouts
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.sms_timeout = timeout;
        self.geocoding_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        for (name, url) in [("sms_url", &self.sms_url), ("geocoding_url", &self.geocoding_url)] {
            if url.is_empty() {
                return Err(ApiError::config(format!("{name} cannot be empty")));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ApiError::config(format!("{name} must start with http:// or https://")));
            }
        }

        if self.sms_timeout.is_zero() || self.geocoding_timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ApiError::config("user_agent cannot be empty"));
        }

        Ok(())
    }
}
