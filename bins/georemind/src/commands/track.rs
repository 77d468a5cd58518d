//! Track command - replay a position track through the engine

use super::{api_client, load_store};
use crate::Context;
use anyhow::Result;
use georemind_api_client::SmsApi;
use georemind_cli::output::{format_count, format_duration, Status};
use georemind_cli::TerminalNotifier;
use georemind_core::{Error, ResultExt};
use georemind_engine::{
    EngineConfig, EngineStatus, GeofenceEngine, NotificationSink, ReplaySource, TriggerReactor,
};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Replay `fixes` against the reminders in `file`, then save the updated flags
pub async fn run(ctx: &Context, file: &Path, fixes: &Path, interval_ms: u64, sms: bool) -> Result<()> {
    let schema = &ctx.config.schema;
    let store = Arc::new(load_store(file)?);
    let source = ReplaySource::from_path(fixes)?.with_interval(Duration::from_millis(interval_ms));

    if !ctx.json {
        Status::info(&format!(
            "Replaying {} against {}",
            format_count(source.len(), "event", "events"),
            format_count(store.len(), "reminder", "reminders"),
        ));
    }

    // Keep stdout clean for the JSON summary
    let notifier = Arc::new(if ctx.json {
        TerminalNotifier::stderr(schema.notification.sound)
    } else {
        TerminalNotifier::stdout(schema.notification.sound)
    });
    let display_for = Duration::from_secs(schema.notification.toast_duration_secs);
    let mut reactor: TriggerReactor<_, SmsApi> =
        TriggerReactor::new(Arc::clone(&store), Arc::clone(&notifier), display_for);

    if sms && schema.sms.enabled {
        match &schema.sms.to {
            Some(to) => reactor = reactor.with_sms(Arc::new(api_client(ctx)?.sms()), to.clone()),
            None => warn!("SMS enabled but no recipient configured; set sms.to or GEOREMIND_SMS_TO"),
        }
    }
    let reactor = Arc::new(reactor);

    let notices: Arc<dyn NotificationSink> = notifier;
    let engine = GeofenceEngine::new(EngineConfig::from(&schema.tracking)).with_notices(notices);

    let started = Instant::now();
    let on_trigger = Arc::clone(&reactor);
    engine.start(source, Arc::clone(&store), move |id| on_trigger.handle(id))?;
    engine.finished().await;
    engine.shutdown().await;
    reactor.drain().await;
    let elapsed = started.elapsed();

    store.save_json(file).context("Saving trigger state")?;

    let stats = engine.stats();
    let status = engine.status();
    info!(?stats, ?status, "Replay finished");

    if ctx.json {
        let output = serde_json::json!({
            "status": status,
            "stats": stats,
            "elapsed_ms": elapsed.as_millis() as u64,
            "triggered": store.list().iter().filter(|r| r.triggered).map(|r| r.id).collect::<Vec<_>>(),
            "metrics": georemind_telemetry::metrics().export_json(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        Status::header("Tracking summary");
        println!("  Fixes evaluated:  {}", stats.fixes_evaluated);
        println!("  Fixes skipped:    {}", stats.fixes_skipped);
        println!("  Triggered:        {}", stats.triggers_dispatched.green());
        println!("  Elapsed:          {}", format_duration(elapsed));
    }

    if let EngineStatus::Unavailable { reason } = status {
        return Err(Error::tracking_unavailable(reason).into());
    }
    Ok(())
}
