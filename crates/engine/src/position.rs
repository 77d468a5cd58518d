//! Position fixes and the sources that produce them
//!
//! A [`PositionSource`] offers a one-shot "current fix" request and a
//! continuous subscription. The subscription is a [`PositionWatch`]: a
//! receiver plus a release hook that runs exactly once, when the watch is
//! dropped, on every exit path.

use crate::error::PositionError;
use chrono::{DateTime, Utc};
use georemind_core::{Error, ErrorCode, Result, ResultExt};
use georemind_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// One reported position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// When the fix was taken
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Reported accuracy radius in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl PositionFix {
    /// Fix taken now, without an accuracy hint
    #[must_use]
    pub fn now(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            timestamp: Utc::now(),
            accuracy: None,
        }
    }

    /// Attach an accuracy hint
    #[must_use]
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    /// The fix as a coordinate
    #[must_use]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A fix or a per-fix failure
pub type PositionEvent = std::result::Result<PositionFix, PositionError>;

/// Producer of position fixes
pub trait PositionSource: Send + Sync + 'static {
    /// Best currently available fix, requested once
    fn current_fix(&self) -> impl Future<Output = PositionEvent> + Send;

    /// Subscribe to continuous fixes.
    ///
    /// Fails only when no subscription can be made at all.
    fn watch(&self) -> std::result::Result<PositionWatch, PositionError>;
}

/// A live position subscription
pub struct PositionWatch {
    events: mpsc::UnboundedReceiver<PositionEvent>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl PositionWatch {
    /// Wrap a receiver with the hook that cancels the underlying subscription
    pub fn new(
        events: mpsc::UnboundedReceiver<PositionEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            release: Some(Box::new(release)),
        }
    }

    /// Next event; `None` once the source has ended the stream
    pub async fn next(&mut self) -> Option<PositionEvent> {
        self.events.recv().await
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for PositionWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionWatch")
            .field("released", &self.release.is_none())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ChannelSource
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ChannelState {
    current: Option<PositionEvent>,
    watchers: Vec<(u64, mpsc::UnboundedSender<PositionEvent>)>,
    next_watch: u64,
}

/// Push-driven source for hosts that receive fixes from a platform callback.
///
/// Cloning shares the same underlying source.
#[derive(Clone)]
pub struct ChannelSource {
    state: Arc<Mutex<ChannelState>>,
    supported: bool,
    releases: Arc<AtomicUsize>,
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSource {
    /// A working source with no fix yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            supported: true,
            releases: Arc::default(),
        }
    }

    /// A host without geolocation: every subscription attempt fails fatally
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the fix returned by `current_fix` without notifying watchers
    pub fn set_current(&self, fix: PositionFix) {
        self.lock().current = Some(Ok(fix));
    }

    /// Deliver a fix to every watcher and remember it as current
    pub fn push(&self, fix: PositionFix) {
        self.broadcast(Ok(fix));
    }

    /// Deliver a failure to every watcher
    pub fn push_error(&self, error: PositionError) {
        self.broadcast(Err(error));
    }

    fn broadcast(&self, event: PositionEvent) {
        let mut state = self.lock();
        if event.is_ok() {
            state.current = Some(event);
        }
        state.watchers.retain(|(_, tx)| tx.send(event).is_ok());
    }

    /// Number of subscriptions not yet released
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.lock().watchers.len()
    }

    /// Number of subscriptions released so far
    #[must_use]
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl PositionSource for ChannelSource {
    async fn current_fix(&self) -> PositionEvent {
        if !self.supported {
            return Err(PositionError::Unsupported);
        }
        self.lock().current.unwrap_or(Err(PositionError::PositionUnavailable))
    }

    fn watch(&self) -> std::result::Result<PositionWatch, PositionError> {
        if !self.supported {
            return Err(PositionError::Unsupported);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.lock();
            let id = state.next_watch;
            state.next_watch += 1;
            state.watchers.push((id, tx));
            id
        };

        let state = Arc::clone(&self.state);
        let releases = Arc::clone(&self.releases);
        Ok(PositionWatch::new(rx, move || {
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .watchers
                .retain(|(watch_id, _)| *watch_id != id);
            releases.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// ---------------------------------------------------------------------------
// ReplaySource
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Fix(PositionFix),
    Failure { error: PositionError },
}

/// Replays a recorded track of fixes and failures.
///
/// The input is newline-delimited JSON, one event per line:
///
/// ```text
/// {"lat": 5.6050, "lng": -0.2000}
/// {"error": "timeout"}
/// {"lat": 5.6005, "lng": -0.2000, "accuracy": 8.0}
/// ```
///
/// Blank lines and lines starting with `#` are ignored. The first fix also
/// answers `current_fix`.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    events: Arc<[PositionEvent]>,
    interval: Duration,
}

impl ReplaySource {
    /// Replay the given events
    #[must_use]
    pub fn new(events: Vec<PositionEvent>) -> Self {
        Self {
            events: Arc::from(events),
            interval: Duration::ZERO,
        }
    }

    /// Parse newline-delimited JSON events
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut events = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: ReplayLine = serde_json::from_str(line).map_err(|e| {
                Error::new(
                    ErrorCode::InvalidInput,
                    format!("Line {}: not a fix or error event: {e}", index + 1),
                )
            })?;
            events.push(match parsed {
                ReplayLine::Fix(fix) => Ok(fix),
                ReplayLine::Failure { error } => Err(error),
            });
        }
        Ok(Self::new(events))
    }

    /// Open and parse a replay file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(Error::from)
            .context(format!("Opening fix replay {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .context(format!("Reading fix replay {}", path.display()))
    }

    /// Pause between replayed events
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl PositionSource for ReplaySource {
    async fn current_fix(&self) -> PositionEvent {
        self.events
            .iter()
            .find_map(|event| event.ok())
            .ok_or(PositionError::PositionUnavailable)
    }

    fn watch(&self) -> std::result::Result<PositionWatch, PositionError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PositionError::Unsupported)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let events = Arc::clone(&self.events);
        let interval = self.interval;

        let feeder = runtime.spawn(async move {
            for event in events.iter() {
                if !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                if tx.send(*event).is_err() {
                    break;
                }
            }
            debug!(events = events.len(), "Replay finished");
        });

        Ok(PositionWatch::new(rx, move || feeder.abort()))
    }
}
