//! Sync subcommand: one full reconciliation against a chore-list payload.
//!
//! The durable store is authoritative. Its ids seed the tracked set, so
//! reminders left behind by earlier runs are cancelled when the new list no
//! longer carries them.

use std::sync::Arc;

use chorebridge_core::{
    Bridge, Config, MemoryReminderStore, Reconciler, ReminderStore, SqliteReminderStore, StaticPermissionGate,
    SystemClock,
};

use super::read_input;

/// Run the sync command.
pub fn run(input: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_input(input)?;
    let config = Config::load()?;

    let path = SqliteReminderStore::default_path()?;
    let (store, seed): (Arc<dyn ReminderStore>, Vec<i64>) = if dry_run {
        println!("Dry run: the reminder database will not be modified.");
        // Seed from an existing database only; never create one.
        let seed = if path.exists() {
            SqliteReminderStore::open_at(&path)?.ids()?
        } else {
            Vec::new()
        };
        (Arc::new(MemoryReminderStore::new()), seed)
    } else {
        let durable = Arc::new(SqliteReminderStore::open_at(&path)?);
        let seed = durable.ids()?;
        (durable, seed)
    };
    tracing::debug!(seeded = seed.len(), dry_run, "starting sync");

    let reconciler =
        Reconciler::new(store, Arc::new(SystemClock), config.reconciler_config()).with_tracked(seed);
    // The headless host answers permission requests from config.
    let gate = Arc::new(StaticPermissionGate(config.notifications.permission_granted));
    let parser = config.task_parser();
    let patterns = config.endpoint_patterns();

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async move {
        let (bridge, handle) = Bridge::spawn(reconciler, parser, gate, patterns);
        bridge.on_list_received(raw);
        handle.shutdown(bridge).await
    })?;

    match report.last_outcome {
        Some(outcome) => {
            println!("{}", outcome.message());
            if outcome.deferred > 0 {
                println!("Notifications are not permitted; {} reminder(s) deferred.", outcome.deferred);
            }
            println!("Tracking {} reminder(s).", report.tracked.len());
        }
        None => println!("Nothing to reconcile."),
    }
    Ok(())
}
