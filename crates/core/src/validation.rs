//! Input and configuration validation
//!
//! Validation collects every problem instead of stopping at the first one so
//! that a form or config file can report all of them together.
//!
//! # Example
//!
//! ```
//! use georemind_core::validation::Validator;
//!
//! let result = Validator::new()
//!     .required("title", "Buy milk")
//!     .max_length("title", "Buy milk", 120)
//!     .positive("radius", 100.0)
//!     .validate();
//!
//! assert!(result.is_valid());
//! ```

use crate::error::{Error, ErrorCode, Result};
use serde::{Deserialize, Serialize};

/// A single validation failure or warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
    /// Expected value (if applicable)
    pub expected: Option<String>,
    /// Actual value (if applicable)
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get all warnings
    #[must_use]
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Convert to Result type
    pub fn to_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            Err(Error::new(
                ErrorCode::ValidationError,
                format!("Validation failed: {}", messages.join("; ")),
            ))
        }
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    fn fail(
        mut self,
        field: &str,
        message: String,
        code: &str,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        self.result.add_error(ValidationError {
            field: field.to_string(),
            message,
            code: code.to_string(),
            expected,
            actual,
        });
        self
    }

    /// Validate that a field is not blank
    #[must_use]
    pub fn required(self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            return self.fail(
                field,
                "Field is required".to_string(),
                "REQUIRED",
                Some("non-empty value".to_string()),
                Some("empty".to_string()),
            );
        }
        self
    }

    /// Validate that an optional value was supplied
    #[must_use]
    pub fn present<T>(self, field: &str, value: Option<&T>, message: &str) -> Self {
        if value.is_none() {
            return self.fail(field, message.to_string(), "MISSING", None, None);
        }
        self
    }

    /// Validate maximum length in characters
    #[must_use]
    pub fn max_length(self, field: &str, value: &str, max: usize) -> Self {
        let len = value.chars().count();
        if len > max {
            return self.fail(
                field,
                format!("Must be at most {max} characters"),
                "MAX_LENGTH",
                Some(format!("<= {max} chars")),
                Some(format!("{len} chars")),
            );
        }
        self
    }

    /// Validate a numeric range (inclusive)
    #[must_use]
    pub fn range<T: PartialOrd + std::fmt::Display>(
        self,
        field: &str,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        // Written as a negated containment check so NaN fails too
        if !(value >= min && value <= max) {
            return self.fail(
                field,
                format!("Must be between {min} and {max}"),
                "RANGE",
                Some(format!("{min} - {max}")),
                Some(value.to_string()),
            );
        }
        self
    }

    /// Validate that a float is finite and strictly greater than zero
    #[must_use]
    pub fn positive(self, field: &str, value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return self.fail(
                field,
                "Must be a number greater than zero".to_string(),
                "POSITIVE",
                Some("> 0".to_string()),
                Some(value.to_string()),
            );
        }
        self
    }

    /// Validate that a value is an absolute http(s) URL
    #[must_use]
    pub fn http_url(self, field: &str, value: &str) -> Self {
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"));
        if rest.is_none_or(str::is_empty) {
            return self.fail(
                field,
                "Must start with http:// or https://".to_string(),
                "URL",
                Some("http(s)://host[/path]".to_string()),
                Some(value.to_string()),
            );
        }
        self
    }

    /// Add a custom validation
    #[must_use]
    pub fn custom<F>(self, field: &str, f: F) -> Self
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(message) = f() {
            return self.fail(field, message, "CUSTOM", None, None);
        }
        self
    }

    /// Add a warning (non-blocking)
    #[must_use]
    pub fn warn_if(mut self, field: &str, condition: bool, message: &str) -> Self {
        if condition {
            self.result.add_warning(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
                code: "WARNING".to_string(),
                expected: None,
                actual: None,
            });
        }
        self
    }

    /// Complete validation and return result
    #[must_use]
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_validation() {
        let result = Validator::new().required("title", "   ").validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].code, "REQUIRED");
    }

    #[test]
    fn test_present_validation() {
        let missing: Option<&u8> = None;
        let result = Validator::new()
            .present("location", missing, "Search for a valid location first")
            .validate();
        assert_eq!(result.errors()[0].code, "MISSING");
        assert_eq!(result.errors()[0].message, "Search for a valid location first");
    }

    #[test]
    fn test_max_length_counts_characters() {
        let ok = Validator::new().max_length("title", "café", 4).validate();
        assert!(ok.is_valid());

        let result = Validator::new().max_length("title", "abcdefghijk", 5).validate();
        assert_eq!(result.errors()[0].code, "MAX_LENGTH");
    }

    #[test]
    fn test_range_validation() {
        let result = Validator::new().range("count", 150, 1, 100).validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].code, "RANGE");
    }

    #[test]
    fn test_range_rejects_nan() {
        let result = Validator::new().range("lat", f64::NAN, -90.0, 90.0).validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_positive_validation() {
        assert!(Validator::new().positive("radius", 50.0).validate().is_valid());
        assert!(!Validator::new().positive("radius", 0.0).validate().is_valid());
        assert!(!Validator::new().positive("radius", -3.0).validate().is_valid());
        assert!(!Validator::new().positive("radius", f64::INFINITY).validate().is_valid());
    }

    #[test]
    fn test_http_url_validation() {
        assert!(Validator::new().http_url("u", "https://example.com").validate().is_valid());
        assert!(Validator::new().http_url("u", "http://localhost:5000/send-sms").validate().is_valid());
        assert!(!Validator::new().http_url("u", "localhost:5000").validate().is_valid());
        assert!(!Validator::new().http_url("u", "https://").validate().is_valid());
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let result = Validator::new()
            .warn_if("sms.to", true, "no destination")
            .validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_collects_all_errors() {
        let result = Validator::new()
            .required("title", "")
            .positive("radius", -1.0)
            .validate();
        assert_eq!(result.errors().len(), 2);

        let err = result.to_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("title"));
        assert!(err.message.contains("radius"));
    }
}
