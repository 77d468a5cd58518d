//! Geocode command - place name to coordinates

use super::api_client;
use crate::Context;
use anyhow::Result;
use georemind_api_client::GeocodeMatch;
use georemind_cli::progress;
use georemind_core::{Error, ErrorCode};

/// Look up a place name, with a spinner while the request runs
pub async fn lookup(ctx: &Context, query: &str) -> Result<Option<GeocodeMatch>> {
    let client = api_client(ctx)?;
    let spinner = progress::spinner(&format!("Searching for {query}..."));
    let result = client.geocoding().search(query).await;
    progress::finish_clear(&spinner);
    Ok(result?)
}

/// Print the best match for a place name
pub async fn run(ctx: &Context, query: &str) -> Result<()> {
    let Some(found) = lookup(ctx, query).await? else {
        return Err(Error::new(ErrorCode::LocationUnresolved, format!("Location not found: {query}"))
            .with_suggestion("Try a more specific name, or pass --lat and --lng")
            .into());
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        println!("{}", found.display_name);
        println!("  {}, {}", found.coordinate.lat, found.coordinate.lng);
    }
    Ok(())
}
