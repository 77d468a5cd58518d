//! Distance command - great-circle distance between two points

use crate::Context;
use anyhow::Result;
use georemind_cli::output::format_distance;
use georemind_core::Error;
use georemind_geo::{haversine_distance_meters, Coordinate};

/// Print the haversine distance between two points
pub fn run(ctx: &Context, from: (f64, f64), to: (f64, f64)) -> Result<()> {
    let from = point(from)?;
    let to = point(to)?;
    let meters = haversine_distance_meters(&from, &to);

    if ctx.json {
        let output = serde_json::json!({
            "from": from,
            "to": to,
            "meters": meters,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{meters:.2} m ({})", format_distance(meters));
    }
    Ok(())
}

fn point((lat, lng): (f64, f64)) -> Result<Coordinate> {
    Ok(Coordinate::try_new(lat, lng).map_err(|e| Error::validation(e.to_string()))?)
}
