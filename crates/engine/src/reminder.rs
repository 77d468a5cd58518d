//! Reminder records and the draft form they are created from

use chrono::{DateTime, Utc};
use georemind_core::validation::Validator;
use georemind_core::{Error, ErrorCode, Result};
use georemind_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Radius used when the form leaves it blank
pub const DEFAULT_RADIUS_M: f64 = 100.0;

/// Longest accepted reminder title
pub const MAX_TITLE_CHARS: usize = 200;

/// Stable reminder identifier. Assigned by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(u64);

impl ReminderId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReminderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A reminder tied to a circular geofence.
///
/// `triggered` only ever goes from `false` to `true`. It is a display flag:
/// the engine keeps its own record of dispatched triggers and does not rely
/// on this field being up to date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Stable identifier
    pub id: ReminderId,
    /// Display title
    pub title: String,
    /// Geofence center
    #[serde(flatten)]
    pub location: Coordinate,
    /// Geofence radius in meters
    pub radius: f64,
    /// Whether the reminder has fired
    #[serde(default)]
    pub triggered: bool,
    /// When the reminder was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// True if the geofence can be evaluated at all.
    ///
    /// Reminders with malformed coordinates or radius never trigger.
    #[must_use]
    pub fn is_evaluable(&self) -> bool {
        self.location.is_valid() && self.radius.is_finite()
    }
}

/// Radius as entered by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RadiusInput {
    /// Left blank: use [`DEFAULT_RADIUS_M`]
    #[default]
    Default,
    /// Already numeric
    Meters(f64),
    /// Raw text from a form field
    Text(String),
}

/// Unvalidated reminder form contents
#[derive(Debug, Clone, Default)]
pub struct ReminderDraft {
    /// Reminder title
    pub title: String,
    /// Resolved location, if the user picked or looked one up
    pub location: Option<Coordinate>,
    /// Radius input
    pub radius: RadiusInput,
}

/// A validated reminder waiting for an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    /// Trimmed title
    pub title: String,
    /// Geofence center
    pub location: Coordinate,
    /// Geofence radius in meters, > 0
    pub radius: f64,
}

impl ReminderDraft {
    /// Start a draft with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the resolved location
    #[must_use]
    pub fn at(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    /// Set a numeric radius
    #[must_use]
    pub fn radius_meters(mut self, meters: f64) -> Self {
        self.radius = RadiusInput::Meters(meters);
        self
    }

    /// Set the radius from raw text
    #[must_use]
    pub fn radius_text(mut self, text: impl Into<String>) -> Self {
        self.radius = RadiusInput::Text(text.into());
        self
    }

    /// Validate the draft.
    ///
    /// Rejects a blank or overlong title, a missing or malformed location,
    /// and a radius that is non-numeric or not strictly positive. All
    /// problems are reported together.
    pub fn validate(self) -> Result<NewReminder> {
        let title = self.title.trim().to_string();

        let (radius, radius_error) = match &self.radius {
            RadiusInput::Default => (DEFAULT_RADIUS_M, None),
            RadiusInput::Meters(m) => (*m, None),
            RadiusInput::Text(text) if text.trim().is_empty() => (DEFAULT_RADIUS_M, None),
            RadiusInput::Text(text) => match text.trim().parse::<f64>() {
                Ok(m) => (m, None),
                Err(_) => (f64::NAN, Some(format!("Radius must be a number, got {text:?}"))),
            },
        };

        let location = self.location;
        let mut validator = Validator::new()
            .required("title", &title)
            .max_length("title", &title, MAX_TITLE_CHARS)
            .present("location", location.as_ref(), "Search for a valid location first")
            .custom("location", || {
                location.and_then(|c| Coordinate::try_new(c.lat, c.lng).err().map(|e| e.to_string()))
            });

        validator = match radius_error {
            Some(message) => validator.custom("radius", || Some(message)),
            None => validator.positive("radius", radius),
        };

        let result = validator.validate();
        let code = match result.errors().first().map(|e| e.field.as_str()) {
            Some("location") => ErrorCode::LocationUnresolved,
            Some("radius") => ErrorCode::InvalidRadius,
            _ => ErrorCode::InvalidInput,
        };
        result.to_result().map_err(|e| Error::new(code, e.message))?;

        Ok(NewReminder {
            title,
            location: location.ok_or_else(|| Error::new(ErrorCode::LocationUnresolved, "missing location"))?,
            radius,
        })
    }
}
