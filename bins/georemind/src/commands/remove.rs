//! Remove command - delete a reminder after confirmation

use super::load_store;
use crate::Context;
use anyhow::Result;
use console::Term;
use georemind_cli::output::Status;
use georemind_core::{Error, ResultExt};
use georemind_engine::{Reminder, ReminderId};
use std::path::Path;

/// Remove one reminder by id
pub fn run(ctx: &Context, file: &Path, id: u64, yes: bool) -> Result<()> {
    let id = ReminderId::new(id);
    let store = load_store(file)?;
    let reminder = store.get(id).ok_or_else(|| Error::reminder_not_found(id))?;

    if !yes && !confirm(&reminder)? {
        Status::info("Nothing removed");
        return Ok(());
    }

    store.remove(id);
    store.save_json(file).context("Saving after removal")?;

    if ctx.json {
        println!("{}", serde_json::json!({ "removed": id }));
    } else {
        Status::success(&format!("Removed reminder {id} \"{}\"", reminder.title));
    }
    Ok(())
}

fn confirm(reminder: &Reminder) -> Result<bool> {
    let term = Term::stderr();
    if !term.is_term() {
        return Err(Error::validation("Refusing to remove without confirmation")
            .with_suggestion("Pass --yes when running non-interactively")
            .into());
    }

    term.write_str(&format!(
        "Remove reminder {} \"{}\"? [y/N] ",
        reminder.id, reminder.title
    ))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
