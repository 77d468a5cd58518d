//! Per-reminder trigger bookkeeping
//!
//! The ledger is the source of truth for "already notified". A snapshot's
//! `triggered` flag can lag a dispatch by a cycle, so both are consulted and
//! whichever says "fired" first wins.

use crate::reminder::{Reminder, ReminderId};
use georemind_geo::{haversine_distance_meters, Coordinate};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Ids that have been dispatched, for the lifetime of one engine
#[derive(Debug, Default)]
pub struct TriggerLedger {
    fired: HashSet<ReminderId>,
}

impl TriggerLedger {
    /// Empty ledger: every id starts pending
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a trigger for `id` has been dispatched
    #[must_use]
    pub fn has_fired(&self, id: ReminderId) -> bool {
        self.fired.contains(&id)
    }

    /// Number of dispatched triggers
    #[must_use]
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    /// True if nothing has fired yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    /// Evaluate one fix against a snapshot, dispatching every newly entered
    /// geofence in snapshot order.
    pub fn evaluate<F>(&mut self, at: &Coordinate, snapshot: &[Reminder], on_trigger: F) -> Vec<ReminderId>
    where
        F: FnMut(ReminderId),
    {
        self.evaluate_gated(at, snapshot, || true, on_trigger)
    }

    /// Like [`evaluate`](Self::evaluate), but `gate` is consulted right before
    /// each dispatch. Once it returns `false` nothing more is recorded or
    /// dispatched for this fix.
    pub fn evaluate_gated<G, F>(
        &mut self,
        at: &Coordinate,
        snapshot: &[Reminder],
        gate: G,
        mut on_trigger: F,
    ) -> Vec<ReminderId>
    where
        G: Fn() -> bool,
        F: FnMut(ReminderId),
    {
        let mut dispatched = Vec::new();

        for reminder in snapshot {
            if reminder.triggered || self.fired.contains(&reminder.id) {
                continue;
            }

            if !reminder.is_evaluable() {
                debug!(id = %reminder.id, "Skipping reminder with malformed geofence");
                continue;
            }

            let distance = haversine_distance_meters(at, &reminder.location);
            trace!(id = %reminder.id, distance_m = distance, radius_m = reminder.radius, "Checked geofence");

            if distance <= reminder.radius {
                if !gate() {
                    debug!(id = %reminder.id, "Dispatch suppressed: tracking stopped");
                    break;
                }
                self.fired.insert(reminder.id);
                dispatched.push(reminder.id);
                on_trigger(reminder.id);
            }
        }

        dispatched
    }
}
