//! The authoritative reminder collection
//!
//! Mutations replace the whole backing slice, so every [`Snapshot`] handed out
//! by [`ReminderStore::list`] is a coherent, immutable view that later
//! mutations never touch.

use crate::reminder::{NewReminder, Reminder, ReminderId};
use chrono::Utc;
use georemind_core::{Error, Result, ResultExt};
use georemind_geo::Coordinate;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Read-only reminder collection valid for one evaluation cycle
pub type Snapshot = Arc<[Reminder]>;

/// Anything that can hand the engine a fresh snapshot on demand.
///
/// Called once per position fix; implementations must be cheap and must
/// return a coherent view, never a partially mutated one.
pub trait SnapshotProvider: Send + Sync + 'static {
    /// Current reminder set, in insertion order
    fn snapshot(&self) -> Snapshot;
}

impl<T: SnapshotProvider + ?Sized> SnapshotProvider for Arc<T> {
    fn snapshot(&self) -> Snapshot {
        (**self).snapshot()
    }
}

/// Adapts a closure into a [`SnapshotProvider`]
pub struct SnapshotFn<F>(F);

/// Build a snapshot provider from a closure
pub fn snapshot_fn<F>(f: F) -> SnapshotFn<F>
where
    F: Fn() -> Snapshot + Send + Sync + 'static,
{
    SnapshotFn(f)
}

impl<F> SnapshotProvider for SnapshotFn<F>
where
    F: Fn() -> Snapshot + Send + Sync + 'static,
{
    fn snapshot(&self) -> Snapshot {
        (self.0)()
    }
}

/// Fields a user may change on an existing reminder.
///
/// `triggered` is deliberately absent: it can only be set through
/// [`ReminderStore::mark_triggered`].
#[derive(Debug, Clone, Default)]
pub struct ReminderEdit {
    /// New title
    pub title: Option<String>,
    /// New geofence center
    pub location: Option<Coordinate>,
    /// New radius in meters
    pub radius: Option<f64>,
}

/// In-memory reminder store with copy-on-write snapshots
#[derive(Debug)]
pub struct ReminderStore {
    reminders: RwLock<Snapshot>,
    next_id: AtomicU64,
}

impl Default for ReminderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderStore {
    /// Empty store; ids start at 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            reminders: RwLock::new(Arc::from(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store seeded with existing records (for example from a file).
    ///
    /// New ids continue after the highest existing one.
    #[must_use]
    pub fn from_reminders(reminders: Vec<Reminder>) -> Self {
        let next = reminders.iter().map(|r| r.id.get()).max().map_or(1, |max| max + 1);
        Self {
            reminders: RwLock::new(Arc::from(reminders)),
            next_id: AtomicU64::new(next),
        }
    }

    /// Load reminders from a JSON array file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .context(format!("Reading reminders from {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let reminders: Vec<Reminder> = serde_json::from_str(&content)
            .map_err(Error::from)
            .context(format!("Parsing reminders in {}", path.display()))?;
        debug!(count = reminders.len(), path = %path.display(), "Loaded reminders");
        Ok(Self::from_reminders(reminders))
    }

    /// Write the current snapshot as a pretty JSON array
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.list())?;
        std::fs::write(path, json)
            .map_err(Error::from)
            .context(format!("Writing reminders to {}", path.display()))
    }

    /// Coherent snapshot in insertion order
    #[must_use]
    pub fn list(&self) -> Snapshot {
        Arc::clone(&self.reminders.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up one reminder
    #[must_use]
    pub fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.list().iter().find(|r| r.id == id).cloned()
    }

    /// Number of reminders
    #[must_use]
    pub fn len(&self) -> usize {
        self.list().len()
    }

    /// True if there are no reminders
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a validated reminder, assigning a fresh id
    pub fn add(&self, new: NewReminder) -> Reminder {
        let reminder = Reminder {
            id: ReminderId::new(self.next_id.fetch_add(1, Ordering::Relaxed)),
            title: new.title,
            location: new.location,
            radius: new.radius,
            triggered: false,
            created_at: Utc::now(),
        };
        let added = reminder.clone();
        self.mutate(|list| {
            list.push(reminder);
            Some(())
        });
        debug!(id = %added.id, title = %added.title, "Reminder added");
        added
    }

    /// Remove a reminder; its id is never handed out again
    pub fn remove(&self, id: ReminderId) -> Option<Reminder> {
        self.mutate(|list| {
            let index = list.iter().position(|r| r.id == id)?;
            Some(list.remove(index))
        })
    }

    /// Apply an edit, leaving `triggered` untouched
    pub fn update(&self, id: ReminderId, edit: ReminderEdit) -> Option<Reminder> {
        self.mutate(|list| {
            let reminder = list.iter_mut().find(|r| r.id == id)?;
            if let Some(title) = edit.title {
                reminder.title = title;
            }
            if let Some(location) = edit.location {
                reminder.location = location;
            }
            if let Some(radius) = edit.radius {
                reminder.radius = radius;
            }
            Some(reminder.clone())
        })
    }

    /// Set `triggered = true`. Idempotent; returns the updated record.
    pub fn mark_triggered(&self, id: ReminderId) -> Option<Reminder> {
        self.mutate(|list| {
            let reminder = list.iter_mut().find(|r| r.id == id)?;
            reminder.triggered = true;
            Some(reminder.clone())
        })
    }

    /// Copy, edit, and publish a new slice. Nothing is published when `f`
    /// returns `None`.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Reminder>) -> Option<T>) -> Option<T> {
        let mut guard = self.reminders.write().unwrap_or_else(PoisonError::into_inner);
        let mut list = guard.to_vec();
        let out = f(&mut list)?;
        *guard = Arc::from(list);
        Some(out)
    }
}

impl SnapshotProvider for ReminderStore {
    fn snapshot(&self) -> Snapshot {
        self.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_reminder(title: &str) -> NewReminder {
        NewReminder {
            title: title.to_string(),
            location: Coordinate::new(5.6, -0.2),
            radius: 100.0,
        }
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let store = ReminderStore::new();
        let a = store.add(new_reminder("a"));
        let b = store.add(new_reminder("b"));
        assert_eq!(a.id, ReminderId::new(1));
        assert_eq!(b.id, ReminderId::new(2));
        assert!(!a.triggered);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let store = ReminderStore::new();
        let a = store.add(new_reminder("a"));
        assert!(store.remove(a.id).is_some());
        let b = store.add(new_reminder("b"));
        assert_ne!(a.id, b.id);
        assert!(store.remove(a.id).is_none());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let store = ReminderStore::new();
        let a = store.add(new_reminder("a"));
        let before = store.list();

        store.add(new_reminder("b"));
        store.mark_triggered(a.id);

        assert_eq!(before.len(), 1);
        assert!(!before[0].triggered);
        assert_eq!(store.list().len(), 2);
        assert!(store.get(a.id).unwrap().triggered);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = ReminderStore::new();
        for title in ["first", "second", "third"] {
            store.add(new_reminder(title));
        }
        let titles: Vec<_> = store.list().iter().map(|r| r.title.clone()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn test_update_cannot_reset_triggered() {
        let store = ReminderStore::new();
        let a = store.add(new_reminder("a"));
        store.mark_triggered(a.id);

        let updated = store
            .update(
                a.id,
                ReminderEdit {
                    title: Some("renamed".into()),
                    radius: Some(20.0),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.radius, 20.0);
        assert!(updated.triggered);
    }

    #[test]
    fn test_mark_triggered_is_idempotent() {
        let store = ReminderStore::new();
        let a = store.add(new_reminder("a"));
        assert!(store.mark_triggered(a.id).unwrap().triggered);
        assert!(store.mark_triggered(a.id).unwrap().triggered);
        assert!(store.mark_triggered(ReminderId::new(99)).is_none());
    }

    #[test]
    fn test_from_reminders_continues_ids() {
        let seeded = ReminderStore::new();
        seeded.add(new_reminder("a"));
        seeded.add(new_reminder("b"));
        let store = ReminderStore::from_reminders(seeded.list().to_vec());
        assert_eq!(store.add(new_reminder("c")).id, ReminderId::new(3));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");

        let store = ReminderStore::new();
        let a = store.add(new_reminder("Buy milk"));
        store.mark_triggered(a.id);
        store.save_json(&path).unwrap();

        let loaded = ReminderStore::load_json(&path).unwrap();
        assert_eq!(&*loaded.list(), &*store.list());
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = ReminderStore::load_json(file.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_fn_provider() {
        let fixed: Snapshot = Arc::from(Vec::new());
        let provider = snapshot_fn(move || Arc::clone(&fixed));
        assert!(provider.snapshot().is_empty());
    }
}
