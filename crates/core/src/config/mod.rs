//! Configuration loading and schema definitions
//!
//! Settings for tracking, notifications, the SMS relay, geocoding and logging.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
