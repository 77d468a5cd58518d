//! The geofence engine
//!
//! [`GeofenceEngine::start`] subscribes to a [`PositionSource`] on a background
//! task. Every fix is checked against a fresh reminder snapshot; each reminder
//! whose geofence contains the fix is reported through `on_trigger` at most
//! once for the lifetime of the engine.
//!
//! Stopping is synchronous. When [`GeofenceEngine::stop`] returns, no further
//! `on_trigger` call will begin, and the position subscription is released as
//! soon as the task observes the cancellation.

use crate::error::{EngineError, EngineResult, PositionError};
use crate::ledger::TriggerLedger;
use crate::notify::NotificationSink;
use crate::position::{PositionEvent, PositionFix, PositionSource};
use crate::reminder::ReminderId;
use crate::store::SnapshotProvider;
use chrono::{DateTime, Utc};
use georemind_core::config::TrackingConfig;
use georemind_telemetry::{metrics, Timer};
use serde::Serialize;
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counter: fixes evaluated against a snapshot
pub const METRIC_FIXES: &str = "georemind_fixes_total";
/// Counter: fixes dropped (source errors, invalid coordinates)
pub const METRIC_FIXES_SKIPPED: &str = "georemind_fixes_skipped_total";
/// Counter: `on_trigger` dispatches
pub const METRIC_TRIGGERS: &str = "georemind_triggers_total";
/// Histogram: time to evaluate one fix, in milliseconds
pub const METRIC_EVALUATION: &str = "georemind_evaluation_ms";

thread_local! {
    /// Engine currently dispatching on this thread, by address of its shared state
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as dispatching for one engine until dropped
struct DispatchGuard {
    previous: usize,
}

impl DispatchGuard {
    fn enter(shared: &Shared) -> Self {
        let previous = DISPATCHING.with(|d| d.replace(shared.addr()));
        Self { previous }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(self.previous));
    }
}

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long the one-shot initial fix request may take. The stream is
    /// read while it is pending.
    pub initial_fix_timeout: Duration,
    /// Fixes older than this are skipped; `None` accepts any age
    pub maximum_age: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_fix_timeout: Duration::from_secs(5),
            maximum_age: None,
        }
    }
}

impl From<&TrackingConfig> for EngineConfig {
    fn from(tracking: &TrackingConfig) -> Self {
        Self {
            initial_fix_timeout: Duration::from_secs(tracking.fix_timeout_secs),
            maximum_age: (tracking.maximum_age_secs > 0).then(|| Duration::from_secs(tracking.maximum_age_secs)),
        }
    }
}

/// Lifecycle state, observable through [`GeofenceEngine::subscribe_status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineStatus {
    /// Never started
    Idle,
    /// Subscribed and evaluating fixes
    Tracking,
    /// Stopped by the caller, or the position stream ended
    Stopped,
    /// The source cannot provide positions at all
    Unavailable {
        /// Human-readable cause
        reason: String,
    },
}

/// Counters since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Fixes checked against a snapshot
    pub fixes_evaluated: u64,
    /// Fixes dropped before evaluation
    pub fixes_skipped: u64,
    /// `on_trigger` calls made
    pub triggers_dispatched: u64,
}

struct Evaluation {
    ledger: TriggerLedger,
    last_fix: Option<DateTime<Utc>>,
}

struct Shared {
    evaluation: Mutex<Evaluation>,
    /// Read-side copy of the ledger, so queries never wait on a dispatch
    fired: RwLock<HashSet<ReminderId>>,
    active: AtomicBool,
    /// Token of the current run. Replaced tokens are always cancelled.
    cancel: Mutex<Option<CancellationToken>>,
    status: watch::Sender<EngineStatus>,
    fixes_evaluated: AtomicU64,
    fixes_skipped: AtomicU64,
    triggers_dispatched: AtomicU64,
}

impl Shared {
    fn addr(&self) -> usize {
        std::ptr::from_ref(self) as usize
    }

    fn evaluation(&self) -> MutexGuard<'_, Evaluation> {
        self.evaluation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self) {
        let was_active = {
            let slot = self.run_slot();
            if let Some(cancel) = slot.as_ref() {
                cancel.cancel();
            }
            let was_active = self.active.swap(false, Ordering::SeqCst);
            if was_active {
                self.status.send_if_modified(|status| {
                    if *status == EngineStatus::Tracking {
                        *status = EngineStatus::Stopped;
                        true
                    } else {
                        false
                    }
                });
            }
            was_active
        };

        // Wait out a dispatch in progress on another thread. From inside
        // on_trigger the remaining reminders are cut off by the gate instead.
        if DISPATCHING.with(Cell::get) != self.addr() {
            drop(self.evaluation());
        }

        if was_active {
            info!("Tracking stopped");
        }
    }

    /// Apply `update` only if `cancel` still belongs to the current run.
    /// Returns whether it was applied.
    fn update_if_current(&self, cancel: &CancellationToken, update: impl FnOnce(&Self)) -> bool {
        let _slot = self.run_slot();
        if cancel.is_cancelled() {
            return false;
        }
        update(self);
        true
    }

    fn skip(&self) {
        self.fixes_skipped.fetch_add(1, Ordering::Relaxed);
        metrics().increment(METRIC_FIXES_SKIPPED);
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            fixes_evaluated: self.fixes_evaluated.load(Ordering::Relaxed),
            fixes_skipped: self.fixes_skipped.load(Ordering::Relaxed),
            triggers_dispatched: self.triggers_dispatched.load(Ordering::Relaxed),
        }
    }
}

/// Stops an engine without keeping it alive.
///
/// Safe to call from inside `on_trigger`.
#[derive(Clone)]
pub struct StopHandle {
    shared: Weak<Shared>,
}

impl StopHandle {
    /// Stop tracking; a no-op once the engine is gone
    pub fn stop(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.stop();
        }
    }
}

/// Location-triggered reminder engine
pub struct GeofenceEngine {
    shared: Arc<Shared>,
    config: EngineConfig,
    notices: Option<Arc<dyn NotificationSink>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for GeofenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GeofenceEngine {
    /// Idle engine with an empty trigger record
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (status, _) = watch::channel(EngineStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                evaluation: Mutex::new(Evaluation {
                    ledger: TriggerLedger::new(),
                    last_fix: None,
                }),
                fired: RwLock::new(HashSet::new()),
                active: AtomicBool::new(false),
                cancel: Mutex::new(None),
                status,
                fixes_evaluated: AtomicU64::new(0),
                fixes_skipped: AtomicU64::new(0),
                triggers_dispatched: AtomicU64::new(0),
            }),
            config,
            notices: None,
            task: Mutex::new(None),
        }
    }

    /// Route per-fix failures and loss of tracking to `notices`
    #[must_use]
    pub fn with_notices(mut self, notices: Arc<dyn NotificationSink>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Begin tracking. Returns immediately; fixes are processed on a
    /// background task of the current tokio runtime.
    ///
    /// Loss of tracking is not an error here: it is reported through
    /// [`EngineStatus::Unavailable`] and the notification sink.
    pub fn start<S, P, F>(&self, source: S, snapshots: P, on_trigger: F) -> EngineResult<()>
    where
        S: PositionSource,
        P: SnapshotProvider,
        F: Fn(ReminderId) + Send + Sync + 'static,
    {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let running = task.as_ref().is_some_and(|t| !t.is_finished());
        if running && self.shared.active.load(Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let cancel = CancellationToken::new();
        {
            let mut slot = self.shared.run_slot();
            // A previous task may still be winding down; it must not touch
            // the state of this run.
            if let Some(previous) = slot.replace(cancel.clone()) {
                previous.cancel();
            }
            self.shared.active.store(true, Ordering::SeqCst);
            self.shared.status.send_replace(EngineStatus::Tracking);
        }

        let run = Run {
            shared: Arc::clone(&self.shared),
            notices: self.notices.clone(),
            config: self.config.clone(),
            cancel,
            snapshots,
            on_trigger,
        };
        *task = Some(runtime.spawn(run.track(source)));

        info!("Tracking started");
        Ok(())
    }

    /// Stop tracking. Idempotent.
    ///
    /// After this returns no new `on_trigger` call begins. Called from inside
    /// `on_trigger`, the reminders remaining in that fix are not dispatched.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Stop, then wait for the background task to exit and release its
    /// position subscription.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("Tracking task panicked");
                }
            }
        }
    }

    /// Wait until the engine leaves [`EngineStatus::Tracking`]: the stream
    /// ended, tracking became unavailable, or someone called `stop`.
    pub async fn finished(&self) {
        let mut status = self.shared.status.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel
        let _ = status.wait_for(|s| *s != EngineStatus::Tracking).await;
    }

    /// Handle for stopping the engine from inside `on_trigger`
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.shared.status.borrow().clone()
    }

    /// Observe lifecycle changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<EngineStatus> {
        self.shared.status.subscribe()
    }

    /// True while the engine accepts fixes
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// True once `id` has been dispatched by this engine.
    ///
    /// Does not block on a dispatch in progress, so it may be called from
    /// inside `on_trigger`, where the reminder being dispatched already
    /// counts as triggered.
    #[must_use]
    pub fn has_triggered(&self, id: ReminderId) -> bool {
        self.shared.fired.read().unwrap_or_else(PoisonError::into_inner).contains(&id)
    }

    /// Counters since creation
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.shared.stats()
    }
}

impl Drop for GeofenceEngine {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

/// State owned by one tracking task
struct Run<P, F> {
    shared: Arc<Shared>,
    notices: Option<Arc<dyn NotificationSink>>,
    config: EngineConfig,
    cancel: CancellationToken,
    snapshots: P,
    on_trigger: F,
}

impl<P, F> Run<P, F>
where
    P: SnapshotProvider,
    F: Fn(ReminderId) + Send + Sync + 'static,
{
    async fn track<S: PositionSource>(self, source: S) {
        if self.cancel.is_cancelled() {
            debug!("Stopped before the tracking task ran");
            return;
        }

        // Dropping the watch on any return below releases the subscription
        let mut watch = match source.watch() {
            Ok(watch) => watch,
            Err(e) => return self.unavailable(e),
        };

        // The one-shot request is just another fix: polled next to the
        // stream, first in line when both are ready.
        let initial = tokio::time::timeout(self.config.initial_fix_timeout, source.current_fix());
        tokio::pin!(initial);
        let mut awaiting_initial = true;

        loop {
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = &mut initial, if awaiting_initial => {
                    awaiting_initial = false;
                    result.unwrap_or(Err(PositionError::Timeout))
                }
                event = watch.next() => match event {
                    Some(event) => event,
                    None => {
                        self.ended();
                        break;
                    }
                },
            };
            if !self.handle(event) {
                break;
            }
        }

        debug!("Tracking task exiting");
    }

    /// Process one event; `false` ends the run
    fn handle(&self, event: PositionEvent) -> bool {
        match event {
            Ok(fix) => {
                self.evaluate(&fix);
                true
            }
            Err(e) if e.is_fatal() => {
                self.unavailable(e);
                false
            }
            Err(e) => {
                self.shared.skip();
                warn!(error = %e, "Position fix failed; waiting for the next one");
                if let Some(notices) = &self.notices {
                    notices.transient(&format!("Location update failed: {e}"));
                }
                true
            }
        }
    }

    fn evaluate(&self, fix: &PositionFix) {
        let at = fix.coordinate();
        if !at.is_valid() {
            self.shared.skip();
            warn!(lat = fix.lat, lng = fix.lng, "Ignoring fix with invalid coordinates");
            return;
        }

        if let Some(max_age) = self.config.maximum_age {
            let age = Utc::now().signed_duration_since(fix.timestamp);
            if age.to_std().is_ok_and(|age| age > max_age) {
                self.shared.skip();
                warn!(timestamp = %fix.timestamp, age_secs = age.num_seconds(), "Ignoring stale fix");
                return;
            }
        }

        let _timer = Timer::start(METRIC_EVALUATION);
        let snapshot = self.snapshots.snapshot();

        let mut evaluation = self.shared.evaluation();
        if !self.is_live() {
            return;
        }

        if evaluation.last_fix.is_some_and(|last| fix.timestamp < last) {
            debug!(timestamp = %fix.timestamp, "Fix arrived out of order; evaluating anyway");
        }
        evaluation.last_fix = Some(evaluation.last_fix.map_or(fix.timestamp, |last| last.max(fix.timestamp)));

        let _dispatching = DispatchGuard::enter(&self.shared);
        let fired = evaluation.ledger.evaluate_gated(
            &at,
            &snapshot,
            || self.is_live(),
            |id| {
                self.shared.fired.write().unwrap_or_else(PoisonError::into_inner).insert(id);
                self.shared.triggers_dispatched.fetch_add(1, Ordering::Relaxed);
                metrics().increment(METRIC_TRIGGERS);
                (self.on_trigger)(id);
            },
        );

        self.shared.fixes_evaluated.fetch_add(1, Ordering::Relaxed);
        metrics().increment(METRIC_FIXES);
        debug!(%at, reminders = snapshot.len(), fired = fired.len(), "Evaluated fix");
    }

    fn is_live(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    fn unavailable(&self, error: PositionError) {
        let reason = error.to_string();
        let current = self.shared.update_if_current(&self.cancel, |shared| {
            shared.active.store(false, Ordering::SeqCst);
            shared.status.send_replace(EngineStatus::Unavailable { reason: reason.clone() });
        });
        if !current {
            debug!(error = %error, "Source failed after the run was stopped");
            return;
        }

        warn!(error = %error, "Location tracking unavailable");
        if let Some(notices) = &self.notices {
            notices.tracking_unavailable(&reason);
        }
    }

    fn ended(&self) {
        let current = self.shared.update_if_current(&self.cancel, |shared| {
            shared.active.store(false, Ordering::SeqCst);
            shared.status.send_replace(EngineStatus::Stopped);
        });
        if current {
            info!("Position stream ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{ChannelSource, ReplaySource};
    use crate::reminder::{NewReminder, Reminder};
    use crate::store::ReminderStore;
    use georemind_geo::Coordinate;

    const HOME: Coordinate = Coordinate::new(5.6000, -0.2000);

    fn store_with(radii: &[f64]) -> Arc<ReminderStore> {
        let store = Arc::new(ReminderStore::new());
        for (i, radius) in radii.iter().enumerate() {
            store.add(NewReminder {
                title: format!("reminder {}", i + 1),
                location: HOME,
                radius: *radius,
            });
        }
        store
    }

    fn recorder() -> (Arc<Mutex<Vec<ReminderId>>>, impl Fn(ReminderId) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |id| sink.lock().unwrap().push(id))
    }

    fn fix_north(meters: f64) -> PositionFix {
        PositionFix::now(HOME.lat + meters / 111_194.926, HOME.lng)
    }

    async fn wait_for(engine: &GeofenceEngine, done: impl Fn(EngineStats) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done(engine.stats()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("engine did not reach the expected state");
    }

    #[derive(Default)]
    struct Notices {
        transient: Mutex<Vec<String>>,
        unavailable: Mutex<Vec<String>>,
    }

    impl NotificationSink for Notices {
        fn reminder_triggered(&self, _: &Reminder, _: Duration) {}

        fn transient(&self, message: &str) {
            self.transient.lock().unwrap().push(message.to_string());
        }

        fn tracking_unavailable(&self, reason: &str) {
            self.unavailable.lock().unwrap().push(reason.to_string());
        }
    }

    #[tokio::test]
    async fn test_triggers_once_while_approaching() {
        let store = store_with(&[50.0]);
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source.clone(), Arc::clone(&store), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_evaluated + s.fixes_skipped >= 1).await;

        for meters in [200.0, 80.0, 40.0, 10.0, 5.0] {
            source.push(fix_north(meters));
        }
        wait_for(&engine, |s| s.fixes_evaluated >= 5).await;

        assert_eq!(*calls.lock().unwrap(), vec![ReminderId::new(1)]);
        assert!(engine.has_triggered(ReminderId::new(1)));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_initial_fix_is_evaluated() {
        let store = store_with(&[100.0]);
        let source = ChannelSource::new();
        source.set_current(fix_north(10.0));
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source, store, on_trigger).unwrap();
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;

        assert_eq!(calls.lock().unwrap().len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_dispatch_after_stop() {
        let store = store_with(&[100.0]);
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source.clone(), store, on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        engine.stop();
        source.push(fix_north(0.0));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(engine.status(), EngineStatus::Stopped);
        assert!(!engine.is_active());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_from_inside_on_trigger_cuts_off_the_fix() {
        let store = store_with(&[100.0, 100.0]);
        let source = ChannelSource::new();
        let engine = GeofenceEngine::default();
        let handle = engine.stop_handle();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);

        engine
            .start(source.clone(), store, move |id| {
                seen.lock().unwrap().push(id);
                handle.stop();
            })
            .unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push(fix_north(0.0));
        engine.finished().await;

        assert_eq!(*calls.lock().unwrap(), vec![ReminderId::new(1)]);
        assert!(!engine.has_triggered(ReminderId::new(2)));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_changes_are_picked_up() {
        let store = store_with(&[]);
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source.clone(), Arc::clone(&store), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.fixes_evaluated == 1).await;
        assert!(calls.lock().unwrap().is_empty());

        let added = store.add(NewReminder {
            title: "Pick up parcel".into(),
            location: HOME,
            radius: 30.0,
        });
        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.fixes_evaluated == 2).await;

        assert_eq!(*calls.lock().unwrap(), vec![added.id]);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_unsupported_source_reports_unavailable_once() {
        let notices = Arc::new(Notices::default());
        let engine = GeofenceEngine::default().with_notices(notices.clone());
        let (calls, on_trigger) = recorder();

        engine.start(ChannelSource::unsupported(), store_with(&[100.0]), on_trigger).unwrap();
        engine.finished().await;

        assert!(matches!(engine.status(), EngineStatus::Unavailable { .. }));
        assert_eq!(notices.unavailable.lock().unwrap().len(), 1);
        assert!(calls.lock().unwrap().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_fatal_error_mid_stream_releases_watch() {
        let source = ChannelSource::new();
        let engine = GeofenceEngine::default();
        let (_calls, on_trigger) = recorder();

        engine.start(source.clone(), store_with(&[100.0]), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push_error(PositionError::Unsupported);
        engine.finished().await;
        engine.shutdown().await;

        assert!(matches!(engine.status(), EngineStatus::Unavailable { .. }));
        assert_eq!(source.releases(), 1);
    }

    #[tokio::test]
    async fn test_per_fix_errors_and_bad_coordinates_are_skipped() {
        let notices = Arc::new(Notices::default());
        let engine = GeofenceEngine::default().with_notices(notices.clone());
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();

        engine.start(source.clone(), store_with(&[100.0]), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push_error(PositionError::Timeout);
        source.push(PositionFix::now(f64::NAN, 0.0));
        source.push(PositionFix::now(91.0, 0.0));
        source.push(fix_north(5.0));
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;

        let stats = engine.stats();
        assert_eq!(stats.fixes_skipped, 4);
        assert_eq!(stats.fixes_evaluated, 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(engine.status(), EngineStatus::Tracking);
        // Initial PositionUnavailable plus the pushed timeout
        assert_eq!(notices.transient.lock().unwrap().len(), 2);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription() {
        let source = ChannelSource::new();
        let engine = GeofenceEngine::default();
        let (_calls, on_trigger) = recorder();

        engine.start(source.clone(), store_with(&[]), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;
        assert_eq!(source.active_watches(), 1);

        engine.shutdown().await;
        assert_eq!(source.active_watches(), 0);
        assert_eq!(source.releases(), 1);

        engine.stop();
        assert_eq!(source.releases(), 1);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let source = ChannelSource::new();
        let engine = GeofenceEngine::default();
        let (_calls, on_trigger) = recorder();
        let (_calls2, on_trigger2) = recorder();

        engine.start(source.clone(), store_with(&[]), on_trigger).unwrap();
        assert_eq!(
            engine.start(source.clone(), store_with(&[]), on_trigger2),
            Err(EngineError::AlreadyRunning)
        );
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_keeps_trigger_record() {
        let store = store_with(&[100.0]);
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let calls_after = Arc::clone(&calls);
        let engine = GeofenceEngine::default();

        engine.start(source.clone(), Arc::clone(&store), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;
        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;
        engine.shutdown().await;

        engine
            .start(source.clone(), store, move |id| calls_after.lock().unwrap().push(id))
            .unwrap();
        // The pushed fix is now the current one, so the initial request sees it
        wait_for(&engine, |s| s.fixes_evaluated >= 2).await;
        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.fixes_evaluated >= 3).await;

        assert_eq!(calls.lock().unwrap().len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_replay_runs_to_completion() {
        let store = store_with(&[50.0]);
        let source = ReplaySource::new(vec![
            Ok(fix_north(500.0)),
            Err(PositionError::PositionUnavailable),
            Ok(fix_north(20.0)),
            Ok(fix_north(10.0)),
        ]);
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source, store, on_trigger).unwrap();
        engine.finished().await;

        assert_eq!(engine.status(), EngineStatus::Stopped);
        assert_eq!(calls.lock().unwrap().len(), 1);
        // Initial fix plus three streamed fixes
        assert_eq!(engine.stats().fixes_evaluated, 4);
        engine.shutdown().await;
    }

    #[test]
    fn test_start_outside_runtime() {
        let engine = GeofenceEngine::default();
        let (_calls, on_trigger) = recorder();
        assert_eq!(
            engine.start(ChannelSource::new(), store_with(&[]), on_trigger),
            Err(EngineError::NoRuntime)
        );
        assert_eq!(engine.status(), EngineStatus::Idle);
    }

    #[test]
    fn test_config_from_tracking_section() {
        let tracking = TrackingConfig {
            fix_timeout_secs: 9,
            maximum_age_secs: 30,
        };
        let config = EngineConfig::from(&tracking);
        assert_eq!(config.initial_fix_timeout, Duration::from_secs(9));
        assert_eq!(config.maximum_age, Some(Duration::from_secs(30)));

        let unlimited = EngineConfig::from(&TrackingConfig::default());
        assert_eq!(unlimited.maximum_age, None);
    }

    /// A source whose one-shot request never answers
    #[derive(Clone)]
    struct SilentFirstFix(ChannelSource);

    impl PositionSource for SilentFirstFix {
        async fn current_fix(&self) -> PositionEvent {
            std::future::pending().await
        }

        fn watch(&self) -> std::result::Result<crate::position::PositionWatch, PositionError> {
            self.0.watch()
        }
    }

    #[tokio::test]
    async fn test_stream_is_read_while_initial_fix_is_pending() {
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::new(EngineConfig {
            initial_fix_timeout: Duration::from_secs(60),
            ..EngineConfig::default()
        });

        engine
            .start(SilentFirstFix(source.clone()), store_with(&[100.0]), on_trigger)
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while source.active_watches() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;

        assert_eq!(*calls.lock().unwrap(), vec![ReminderId::new(1)]);
        engine.shutdown().await;
        assert_eq!(source.releases(), 1);
    }

    #[tokio::test]
    async fn test_buy_milk_walk() {
        let store = Arc::new(ReminderStore::new());
        let milk = store.add(NewReminder {
            title: "Buy milk".into(),
            location: HOME,
            radius: 100.0,
        });
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::default();

        engine.start(source.clone(), Arc::clone(&store), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push(fix_north(556.0));
        wait_for(&engine, |s| s.fixes_evaluated == 1).await;
        assert!(calls.lock().unwrap().is_empty());

        source.push(fix_north(56.0));
        wait_for(&engine, |s| s.fixes_evaluated == 2).await;
        assert_eq!(*calls.lock().unwrap(), vec![milk.id]);

        source.push(fix_north(10.0));
        wait_for(&engine, |s| s.fixes_evaluated == 3).await;
        assert_eq!(calls.lock().unwrap().len(), 1);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_before_task_runs_is_not_unavailable() {
        let notices = Arc::new(Notices::default());
        let engine = GeofenceEngine::default().with_notices(notices.clone());
        let (_calls, on_trigger) = recorder();

        // The current-thread runtime has not polled the task yet
        engine.start(ChannelSource::unsupported(), store_with(&[100.0]), on_trigger).unwrap();
        engine.stop();
        engine.shutdown().await;

        assert_eq!(engine.status(), EngineStatus::Stopped);
        assert!(notices.unavailable.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restart_while_stopped_task_is_pending() {
        let notices = Arc::new(Notices::default());
        let engine = GeofenceEngine::default().with_notices(notices.clone());
        let (stale_calls, stale_trigger) = recorder();
        let (calls, on_trigger) = recorder();

        engine.start(ChannelSource::unsupported(), store_with(&[100.0]), stale_trigger).unwrap();
        engine.stop();

        let source = ChannelSource::new();
        source.set_current(fix_north(10.0));
        engine.start(source.clone(), store_with(&[100.0]), on_trigger).unwrap();
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;

        assert_eq!(*calls.lock().unwrap(), vec![ReminderId::new(1)]);
        assert!(stale_calls.lock().unwrap().is_empty());
        assert_eq!(engine.status(), EngineStatus::Tracking);
        assert!(engine.is_active());
        assert!(notices.unavailable.lock().unwrap().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_from_another_thread_waits_for_dispatch() {
        let source = ChannelSource::new();
        let engine = GeofenceEngine::default();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let finished_at = Arc::new(Mutex::new(None));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();

        let seen = Arc::clone(&calls);
        let finished = Arc::clone(&finished_at);
        engine
            .start(source.clone(), store_with(&[100.0, 100.0]), move |id| {
                entered_tx.send(()).unwrap();
                std::thread::sleep(Duration::from_millis(100));
                seen.lock().unwrap().push(id);
                *finished.lock().unwrap() = Some(std::time::Instant::now());
            })
            .unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        let handle = engine.stop_handle();
        let stopper = std::thread::spawn(move || {
            entered_rx.recv().unwrap();
            handle.stop();
            std::time::Instant::now()
        });
        source.push(fix_north(0.0));

        let stopped_at = tokio::task::spawn_blocking(move || stopper.join().unwrap()).await.unwrap();
        let finished_at = finished_at.lock().unwrap().expect("first dispatch finished");

        assert!(stopped_at >= finished_at);
        assert_eq!(*calls.lock().unwrap(), vec![ReminderId::new(1)]);
        assert!(!engine.has_triggered(ReminderId::new(2)));
        engine.shutdown().await;
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_has_triggered_inside_on_trigger() {
        let source = ChannelSource::new();
        source.set_current(fix_north(0.0));
        let engine = Arc::new(GeofenceEngine::default());
        let answers = Arc::new(Mutex::new(Vec::new()));

        let queried = Arc::clone(&engine);
        let seen = Arc::clone(&answers);
        engine
            .start(source, store_with(&[100.0]), move |id| {
                seen.lock().unwrap().push(queried.has_triggered(id));
            })
            .unwrap();
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;

        assert_eq!(*answers.lock().unwrap(), vec![true]);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_fixes_are_skipped() {
        let source = ChannelSource::new();
        let (calls, on_trigger) = recorder();
        let engine = GeofenceEngine::new(EngineConfig {
            maximum_age: Some(Duration::from_secs(30)),
            ..EngineConfig::default()
        });

        engine.start(source.clone(), store_with(&[100.0]), on_trigger).unwrap();
        wait_for(&engine, |s| s.fixes_skipped >= 1).await;

        source.push(PositionFix {
            timestamp: Utc::now() - chrono::Duration::minutes(5),
            ..fix_north(0.0)
        });
        wait_for(&engine, |s| s.fixes_skipped >= 2).await;
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(engine.stats().fixes_evaluated, 0);

        source.push(fix_north(0.0));
        wait_for(&engine, |s| s.triggers_dispatched == 1).await;
        engine.shutdown().await;
    }
}
