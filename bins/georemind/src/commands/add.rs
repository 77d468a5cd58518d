//! Add command - validate a reminder form and append it to the file

use super::load_store;
use crate::Context;
use anyhow::Result;
use georemind_cli::output::{format_distance, Status};
use georemind_core::ResultExt;
use georemind_engine::ReminderDraft;
use georemind_geo::Coordinate;
use std::path::Path;

/// Where the new reminder should be
pub enum Location {
    /// Resolve through the geocoder
    Place(String),
    /// Given directly
    Coordinates(f64, f64),
    /// Nothing given; validation reports it
    Missing,
}

/// Validate and store a new reminder
pub async fn run(
    ctx: &Context,
    file: &Path,
    title: &str,
    location: Location,
    radius: Option<String>,
) -> Result<()> {
    let mut draft = ReminderDraft::new(title);
    if let Some(radius) = radius {
        draft = draft.radius_text(radius);
    }

    match location {
        Location::Place(place) => match super::geocode::lookup(ctx, &place).await? {
            Some(found) => {
                if !ctx.json {
                    Status::info(&format!("Location found: {}", found.display_name));
                }
                draft = draft.at(found.coordinate);
            }
            None => tracing::debug!(place = %place, "Place not found"),
        },
        Location::Coordinates(lat, lng) => draft = draft.at(Coordinate::new(lat, lng)),
        Location::Missing => {}
    }

    let new = draft.validate()?;
    let store = load_store(file)?;
    let added = store.add(new);
    store
        .save_json(file)
        .context("Saving the new reminder")?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else {
        Status::success(&format!(
            "Added reminder {} \"{}\" within {} of {}",
            added.id,
            added.title,
            format_distance(added.radius),
            added.location
        ));
    }
    Ok(())
}
