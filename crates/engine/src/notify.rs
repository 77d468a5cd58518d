//! Reacting to trigger decisions
//!
//! The engine only reports which reminder fired. [`TriggerReactor`] turns that
//! into the application's side effects: mark the reminder in the store, show
//! a notification, and send an SMS. None of these feed back into the engine,
//! and failures are logged, never retried.

use crate::error::NotifyError;
use crate::reminder::{Reminder, ReminderId};
use crate::store::ReminderStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Receiver of user-facing notices
pub trait NotificationSink: Send + Sync {
    /// A reminder fired; show it for `display_for`
    fn reminder_triggered(&self, reminder: &Reminder, display_for: Duration);

    /// A recoverable problem worth a dismissible notice
    fn transient(&self, message: &str);

    /// Live tracking stopped for good
    fn tracking_unavailable(&self, reason: &str);
}

/// Outbound SMS request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    /// Destination phone number
    pub to: String,
    /// Message text
    pub body: String,
}

impl SmsMessage {
    /// The message sent for a triggered reminder
    #[must_use]
    pub fn for_reminder(to: impl Into<String>, reminder: &Reminder) -> Self {
        Self {
            to: to.into(),
            body: format!(
                "Reminder: {} at ({}, {})",
                reminder.title, reminder.location.lat, reminder.location.lng
            ),
        }
    }
}

/// Anything that can deliver an SMS
pub trait SmsGateway: Send + Sync + 'static {
    /// Send one message, returning the relay's message id when it reports one
    fn send(
        &self,
        message: SmsMessage,
    ) -> impl Future<Output = Result<Option<String>, NotifyError>> + Send;
}

struct SmsRoute<G> {
    gateway: Arc<G>,
    to: String,
}

/// Applies the side effects of a trigger
pub struct TriggerReactor<N, G> {
    store: Arc<ReminderStore>,
    sink: Arc<N>,
    sms: Option<SmsRoute<G>>,
    display_for: Duration,
    tracker: TaskTracker,
}

impl<N, G> TriggerReactor<N, G>
where
    N: NotificationSink + 'static,
    G: SmsGateway,
{
    /// Reactor without SMS
    pub fn new(store: Arc<ReminderStore>, sink: Arc<N>, display_for: Duration) -> Self {
        Self {
            store,
            sink,
            sms: None,
            display_for,
            tracker: TaskTracker::new(),
        }
    }

    /// Also send an SMS to `to` for every trigger
    #[must_use]
    pub fn with_sms(mut self, gateway: Arc<G>, to: impl Into<String>) -> Self {
        self.sms = Some(SmsRoute {
            gateway,
            to: to.into(),
        });
        self
    }

    /// React to one trigger.
    ///
    /// A reminder deleted between the snapshot and this call is ignored.
    pub fn handle(&self, id: ReminderId) {
        let Some(reminder) = self.store.mark_triggered(id) else {
            warn!(id = %id, "Triggered reminder no longer exists");
            return;
        };
        info!(id = %id, title = %reminder.title, "Reminder triggered");

        self.sink.reminder_triggered(&reminder, self.display_for);

        if let Some(route) = &self.sms {
            self.send_sms(route, &reminder);
        }
    }

    fn send_sms(&self, route: &SmsRoute<G>, reminder: &Reminder) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(id = %reminder.id, "No async runtime; SMS not sent");
            return;
        };

        let message = SmsMessage::for_reminder(route.to.clone(), reminder);
        let gateway = Arc::clone(&route.gateway);
        let sink = Arc::clone(&self.sink);
        let id = reminder.id;

        self.tracker.spawn_on(
            async move {
                match gateway.send(message).await {
                    Ok(sid) => info!(id = %id, sid = ?sid, "SMS sent"),
                    Err(e) => {
                        warn!(id = %id, error = %e, "SMS failed");
                        sink.transient(&format!("Could not send SMS for reminder {id}: {e}"));
                    }
                }
            },
            &runtime,
        );
    }

    /// Wait for outstanding SMS requests
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
