use std::sync::Arc;

use chorebridge_core::{Config, Reconciler, SqliteReminderStore, SystemClock};

pub fn run(id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = Arc::new(SqliteReminderStore::open()?);
    let tracked = store.ids()?;

    let mut reconciler =
        Reconciler::new(store.clone(), Arc::new(SystemClock), config.reconciler_config()).with_tracked(tracked);
    let was_tracked = reconciler.complete(id);

    if store.get(id)?.is_some() {
        return Err(format!("reminder for chore {id} could not be cancelled").into());
    }
    if was_tracked {
        println!("Cancelled reminder for chore {id}.");
    } else {
        println!("No reminder for chore {id}.");
    }
    Ok(())
}
