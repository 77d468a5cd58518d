//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use console::{pad_str, Alignment};
use georemind_engine::Reminder;
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(console::measure_text_width(message)));
    }
}

/// Format a distance in meters for display
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{mins}m {remaining_secs:.0}s")
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

const TITLE_WIDTH: usize = 28;

/// Render reminders as a plain table: id, title, location, radius, status
pub fn reminder_table(reminders: &[Reminder]) -> String {
    let mut out = format!(
        "{:>4}  {}  {:>21}  {:>8}  {}\n",
        "ID",
        pad_str("Title", TITLE_WIDTH, Alignment::Left, None),
        "Location",
        "Radius",
        "Status"
    );
    out.push_str(&"─".repeat(4 + 2 + TITLE_WIDTH + 2 + 21 + 2 + 8 + 2 + 12));
    out.push('\n');

    for r in reminders {
        let status = if r.triggered { "✅ Triggered" } else { "⏳ Pending" };
        out.push_str(&format!(
            "{:>4}  {}  {:>21}  {:>8}  {}\n",
            r.id.get(),
            pad_str(&r.title, TITLE_WIDTH, Alignment::Left, Some("…")),
            format!("{:.4}, {:.4}", r.location.lat, r.location.lng),
            format_distance(r.radius),
            status
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use georemind_engine::{NewReminder, ReminderStore};
    use georemind_geo::Coordinate;
    use std::time::Duration;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(100.0), "100 m");
        assert_eq!(format_distance(1106.66), "1.11 km");
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }

    #[test]
    fn test_format_duration_mins() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(1, "reminder", "reminders"), "1 reminder");
        assert_eq!(format_count(3, "reminder", "reminders"), "3 reminders");
    }

    #[test]
    fn test_reminder_table() {
        let store = ReminderStore::new();
        let milk = store.add(NewReminder {
            title: "Buy milk".into(),
            location: Coordinate::new(5.6037, -0.187),
            radius: 100.0,
        });
        store.add(NewReminder {
            title: "A title long enough that it cannot possibly fit in the column".into(),
            location: Coordinate::new(5.6, -0.2),
            radius: 2500.0,
        });
        store.mark_triggered(milk.id);

        let table = reminder_table(&store.list());
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Buy milk"));
        assert!(lines[2].contains("5.6037, -0.1870"));
        assert!(lines[2].contains("✅ Triggered"));
        assert!(lines[3].contains('…'));
        assert!(lines[3].contains("2.50 km"));
        assert!(lines[3].contains("⏳ Pending"));
    }
}
