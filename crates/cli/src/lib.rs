//! Terminal front end for georemind
//!
//! Provides shared CLI functionality:
//! - Terminal output formatting and the reminder table
//! - A notification sink that prints trigger toasts
//! - Spinners for network lookups

#![warn(missing_docs)]

pub mod notifier;
pub mod output;
pub mod progress;

pub use notifier::TerminalNotifier;
