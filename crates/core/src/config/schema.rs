//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// Position tracking options
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// On-screen notification options
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Outbound SMS relay
    #[serde(default)]
    pub sms: SmsConfig,

    /// Place-name lookup service
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Logging options
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

/// Position tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// How long a single fix request may take before it is reported as a timeout
    #[serde(default = "default_fix_timeout_secs")]
    pub fix_timeout_secs: u64,

    /// Fixes whose timestamp is older than this are skipped (0 = no limit)
    #[serde(default)]
    pub maximum_age_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            fix_timeout_secs: default_fix_timeout_secs(),
            maximum_age_secs: 0,
        }
    }
}

fn default_fix_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long a trigger toast stays visible
    #[serde(default = "default_toast_duration_secs")]
    pub toast_duration_secs: u64,

    /// Play an audio cue with each trigger
    #[serde(default = "default_true")]
    pub sound: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            toast_duration_secs: default_toast_duration_secs(),
            sound: true,
        }
    }
}

fn default_toast_duration_secs() -> u64 {
    4
}

/// SMS relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Send an SMS for every triggered reminder
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Relay endpoint accepting `{to, body}` JSON
    #[serde(default = "default_sms_endpoint")]
    pub endpoint: String,

    /// Destination phone number
    #[serde(default)]
    pub to: Option<String>,

    /// Request timeout
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_sms_endpoint(),
            to: None,
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_sms_endpoint() -> String {
    "http://localhost:5000/send-sms".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

/// Geocoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim-compatible base URL
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,

    /// User agent sent with every lookup (required by the public Nominatim instance)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    format!("georemind/{}", env!("CARGO_PKG_VERSION"))
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Default level filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
