//! Location-triggered reminders
//!
//! Reminders are circular geofences kept in a [`ReminderStore`]. A
//! [`GeofenceEngine`] watches a [`PositionSource`] and, for every fix, reports
//! each reminder whose geofence contains it, at most once per reminder.
//! What happens next (marking it, a toast, an SMS) is up to the caller; the
//! [`TriggerReactor`] wires up the usual set.
//!
//! # Example
//!
//! ```rust,no_run
//! use georemind_engine::{ChannelSource, GeofenceEngine, ReminderDraft, ReminderStore};
//! use georemind_geo::Coordinate;
//! use std::sync::Arc;
//!
//! # async fn run() -> georemind_core::Result<()> {
//! let store = Arc::new(ReminderStore::new());
//! let draft = ReminderDraft::new("Buy milk").at(Coordinate::new(5.6037, -0.1870));
//! store.add(draft.validate()?);
//!
//! let source = ChannelSource::new();
//! let engine = GeofenceEngine::default();
//! let marks = Arc::clone(&store);
//! engine
//!     .start(source.clone(), Arc::clone(&store), move |id| {
//!         marks.mark_triggered(id);
//!     })
//!     .expect("inside a tokio runtime");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod position;
pub mod reminder;
pub mod store;

pub use engine::{EngineConfig, EngineStats, EngineStatus, GeofenceEngine, StopHandle};
pub use error::{EngineError, EngineResult, NotifyError, PositionError};
pub use ledger::TriggerLedger;
pub use notify::{NotificationSink, SmsGateway, SmsMessage, TriggerReactor};
pub use position::{ChannelSource, PositionEvent, PositionFix, PositionSource, PositionWatch, ReplaySource};
pub use reminder::{NewReminder, RadiusInput, Reminder, ReminderDraft, ReminderId, DEFAULT_RADIUS_M, MAX_TITLE_CHARS};
pub use store::{snapshot_fn, ReminderEdit, ReminderStore, Snapshot, SnapshotFn, SnapshotProvider};
