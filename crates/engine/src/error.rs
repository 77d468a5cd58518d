//! Error types for the engine crate

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by [`GeofenceEngine`](crate::GeofenceEngine) lifecycle calls
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// `start` was called while a tracking task is still running
    #[error("Tracking is already running; call stop() first")]
    AlreadyRunning,

    /// `start` was called outside a tokio runtime
    #[error("No async runtime available to run the position subscription")]
    NoRuntime,
}

/// Errors reported by a [`PositionSource`](crate::PositionSource)
///
/// Everything except [`PositionError::Unsupported`] affects a single fix only.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionError {
    /// The user or platform refused access to location
    #[error("Location permission denied")]
    PermissionDenied,

    /// No fix arrived within the allowed time
    #[error("Timed out waiting for a position fix")]
    Timeout,

    /// The hardware could not determine a position right now
    #[error("Position currently unavailable")]
    PositionUnavailable,

    /// Location is not supported on this host at all
    #[error("Geolocation is not supported on this host")]
    Unsupported,
}

impl PositionError {
    /// True when no further fixes can ever arrive from the source
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unsupported)
    }
}

/// Errors raised by notification collaborators
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The SMS relay rejected or failed the request
    #[error("SMS delivery failed: {0}")]
    Sms(String),
}
