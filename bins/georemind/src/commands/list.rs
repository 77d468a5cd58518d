//! List command - reminders as a table

use super::load_store;
use crate::Context;
use anyhow::Result;
use georemind_cli::output::{format_count, reminder_table, Status};
use std::path::Path;

/// Print every reminder with its status
pub fn run(ctx: &Context, file: &Path) -> Result<()> {
    let reminders = load_store(file)?.list();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&*reminders)?);
        return Ok(());
    }

    if reminders.is_empty() {
        Status::info("No reminders yet. Add one with `georemind add`.");
        return Ok(());
    }

    let triggered = reminders.iter().filter(|r| r.triggered).count();
    Status::header(&format!(
        "{} ({} triggered)",
        format_count(reminders.len(), "reminder", "reminders"),
        triggered
    ));
    print!("{}", reminder_table(&reminders));
    Ok(())
}
