//! Notification sink for terminal sessions
//!
//! Trigger toasts go to the terminal (with an optional bell as the audio
//! cue); transient warnings and the "tracking unavailable" notice go to the
//! same writer, styled so they stand apart from toasts. Use
//! [`TerminalNotifier::stderr`] when stdout carries machine-readable output.

use console::Term;
use georemind_engine::{NotificationSink, Reminder};
use owo_colors::{OwoColorize, Style};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const BELL: &str = "\x07";

/// Prints notifications to a terminal or any writer
pub struct TerminalNotifier<W: Write + Send = Term> {
    out: Mutex<W>,
    sound: bool,
    color: bool,
}

impl TerminalNotifier<Term> {
    /// Notifier on stdout, colored when stdout supports it
    pub fn stdout(sound: bool) -> Self {
        Self {
            out: Mutex::new(Term::stdout()),
            sound,
            color: console::colors_enabled(),
        }
    }

    /// Notifier on stderr, colored when stderr supports it
    pub fn stderr(sound: bool) -> Self {
        Self {
            out: Mutex::new(Term::stderr()),
            sound,
            color: console::colors_enabled_stderr(),
        }
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    /// Notifier on an arbitrary writer, without color
    pub fn with_writer(out: W, sound: bool) -> Self {
        Self {
            out: Mutex::new(out),
            sound,
            color: false,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn style(&self, style: Style) -> Style {
        if self.color { style } else { Style::new() }
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // A closed stdout must not take the engine down with it
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl<W: Write + Send> NotificationSink for TerminalNotifier<W> {
    fn reminder_triggered(&self, reminder: &Reminder, _display_for: Duration) {
        let headline = format!("Reminder triggered: {}", reminder.title);
        let place = format!("at {}", reminder.location);
        let bell = if self.sound { BELL } else { "" };
        self.emit(&format!(
            "🎯 {} {}{bell}",
            headline.style(self.style(Style::new().green().bold())),
            place.style(self.style(Style::new().dimmed())),
        ));
    }

    fn transient(&self, message: &str) {
        self.emit(&format!("{} {}", "⚠".style(self.style(Style::new().yellow())), message));
    }

    fn tracking_unavailable(&self, reason: &str) {
        self.emit(&format!(
            "{} {}",
            "✗".style(self.style(Style::new().red())),
            format!("Location tracking unavailable: {reason}").style(self.style(Style::new().red().bold())),
        ));
    }
}
