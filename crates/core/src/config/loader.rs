//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, ErrorCode, Result, ResultExt};
use crate::validation::Validator;
use std::path::Path;

/// Environment variable overriding `sms.endpoint`
pub const ENV_SMS_ENDPOINT: &str = "GEOREMIND_SMS_ENDPOINT";
/// Environment variable overriding `sms.to`
pub const ENV_SMS_TO: &str = "GEOREMIND_SMS_TO";
/// Environment variable overriding `geocoding.endpoint`
pub const ENV_GEOCODER_URL: &str = "GEOREMIND_GEOCODER_URL";

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file path or standard locations, then apply
    /// environment overrides and validate.
    ///
    /// An explicit `path` that does not exist is an error; a missing file in
    /// the standard locations falls back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(p) = path {
            if !Path::new(p).exists() {
                return Err(Error::config_not_found(p));
            }
        }

        let config_path = path.map(String::from).or_else(find_config_file);

        let schema = if let Some(ref p) = config_path {
            load_config_file(p)?
        } else {
            ConfigSchema::default()
        };

        let mut config = Self {
            schema,
            path: config_path,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults only (no file, no environment)
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            schema: ConfigSchema::default(),
            path: None,
        }
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_SMS_ENDPOINT) {
            self.schema.sms.endpoint = endpoint;
        }
        if let Some(to) = lookup(ENV_SMS_TO) {
            self.schema.sms.to = Some(to);
        }
        if let Some(url) = lookup(ENV_GEOCODER_URL) {
            self.schema.geocoding.endpoint = url;
        }
    }

    /// Validate URLs and timeouts
    pub fn validate(&self) -> Result<()> {
        let s = &self.schema;
        Validator::new()
            .http_url("sms.endpoint", &s.sms.endpoint)
            .http_url("geocoding.endpoint", &s.geocoding.endpoint)
            .required("geocoding.user_agent", &s.geocoding.user_agent)
            .range("sms.timeout_secs", s.sms.timeout_secs, 1, 300)
            .range("geocoding.timeout_secs", s.geocoding.timeout_secs, 1, 300)
            .range("tracking.fix_timeout_secs", s.tracking.fix_timeout_secs, 1, 3600)
            .warn_if(
                "sms.to",
                s.sms.enabled && s.sms.to.is_none(),
                "SMS is enabled but no destination number is configured",
            )
            .validate()
            .to_result()
            .map_err(|e| Error {
                code: ErrorCode::ConfigValidationError,
                ..e
            })
            .context(self.path.as_deref().map_or_else(
                || "Validating default configuration".to_string(),
                |p| format!("Validating {p}"),
            ))
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<String> {
    let candidates = [".georemind.toml", "georemind.toml", ".config/georemind.toml"];

    candidates
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(String::from)
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &str) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file {path}: {e}")).with_source(e))?;

    toml::from_str(&content).map_err(|e| {
        Error::new(
            ErrorCode::ConfigParseError,
            format!("Failed to parse config file {path}: {e}"),
        )
        .with_source(e)
    })
}
