use chorebridge_core::storage::ReminderState;
use chorebridge_core::SqliteReminderStore;
use chrono::{SecondsFormat, Utc};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum RemindersAction {
    /// List stored reminders
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every reminder whose alarm time has passed
    Fire,
}

pub fn run(action: RemindersAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteReminderStore::open()?;
    match action {
        RemindersAction::List { json } => {
            let records = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No reminders.");
            } else {
                for r in &records {
                    let state = match r.state {
                        ReminderState::Scheduled => "scheduled",
                        ReminderState::Shown => "shown",
                    };
                    println!(
                        "{:>6}  {:<9}  {}  {}",
                        r.task_id,
                        state,
                        r.fire_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                        r.title
                    );
                }
            }
        }
        RemindersAction::Fire => {
            let fired = store.fire_due(Utc::now())?;
            if fired.is_empty() {
                println!("No reminders due.");
            }
            for r in &fired {
                println!("[{}] {}: {}", r.task_id, r.title, r.body);
            }
        }
    }
    Ok(())
}
