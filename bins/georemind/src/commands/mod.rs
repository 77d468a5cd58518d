//! CLI command implementations

pub mod add;
pub mod distance;
pub mod geocode;
pub mod list;
pub mod remove;
pub mod track;

use georemind_core::Result;
use georemind_engine::ReminderStore;
use std::path::Path;

/// Open the reminder file; a file that does not exist yet is an empty store
pub fn load_store(path: &Path) -> Result<ReminderStore> {
    if path.exists() {
        ReminderStore::load_json(path)
    } else {
        tracing::debug!(path = %path.display(), "Reminder file not found; starting empty");
        Ok(ReminderStore::new())
    }
}

/// HTTP client for the configured SMS relay and geocoder
pub fn api_client(ctx: &crate::Context) -> anyhow::Result<georemind_api_client::GeoremindClient> {
    let schema = &ctx.config.schema;
    let config = georemind_api_client::ClientConfig::from_settings(&schema.sms, &schema.geocoding);
    Ok(georemind_api_client::GeoremindClient::with_config(config)?)
}
