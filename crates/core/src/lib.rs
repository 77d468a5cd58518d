//! Core utilities shared by the georemind crates
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with environment overrides
//! - **Validation**: fluent validation of user-supplied input
//!
//! # Example
//!
//! ```rust,no_run
//! use georemind_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("SMS relay: {}", config.schema.sms.endpoint);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::validation::{ValidationResult, Validator};
}
