//! SQLite-backed reminder store for desktop and headless hosts.
//!
//! Scheduled alarms and shown notifications live in one table keyed by chore
//! id, so they survive the process that created them. [`SqliteReminderStore::fire_due`]
//! plays the role of the platform alarm receiver: it turns every alarm whose
//! time has come into a shown notification.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::StoreError;
use crate::reminder::{ReminderPayload, ReminderStore};

/// Lifecycle of a stored reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderState {
    /// Alarm pending.
    Scheduled,
    /// Notification on screen.
    Shown,
}

impl ReminderState {
    fn as_str(self) -> &'static str {
        match self {
            ReminderState::Scheduled => "SCHEDULED",
            ReminderState::Shown => "SHOWN",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULED" => Some(ReminderState::Scheduled),
            "SHOWN" => Some(ReminderState::Shown),
            _ => None,
        }
    }
}

/// One row of the reminders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub task_id: i64,
    pub state: ReminderState,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Durable [`ReminderStore`].
pub struct SqliteReminderStore {
    conn: Mutex<Connection>,
}

// Fixed-width UTC so TEXT comparison orders chronologically.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl SqliteReminderStore {
    /// Open the store at `~/.config/chorebridge/reminders.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(&Self::default_path()?)
    }

    /// `~/.config/chorebridge/reminders.db`. The file may not exist yet.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(dir.join("reminders.db"))
    }

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("reminder store lock poisoned".into()))
    }

    fn upsert(&self, state: ReminderState, fire_at: DateTime<Utc>, payload: &ReminderPayload) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO reminders (task_id, state, fire_at, title, body, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(task_id) DO UPDATE SET
                state = excluded.state,
                fire_at = excluded.fire_at,
                title = excluded.title,
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![
                payload.task_id,
                state.as_str(),
                ts(fire_at),
                payload.title,
                payload.body,
                ts(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// All reminders, ordered by fire time.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list(&self) -> Result<Vec<ReminderRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT task_id, state, fire_at, title, body FROM reminders ORDER BY fire_at, task_id",
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        let records = rows
            .filter_map(|row| match row {
                Ok(Some(record)) => Some(Ok(record)),
                Ok(None) => None,
                Err(e) => Some(Err(StoreError::from(e))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Ids holding any reminder. Seed a fresh [`Reconciler`](crate::reminder::Reconciler)
    /// with these so reminders from an earlier process are reconciled too.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn ids(&self) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT task_id FROM reminders ORDER BY task_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn get(&self, id: i64) -> Result<Option<ReminderRecord>, StoreError> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT task_id, state, fire_at, title, body FROM reminders WHERE task_id = ?1",
                [id],
                row_to_record,
            )
            .optional()?;
        Ok(record.flatten())
    }

    /// Fire every scheduled alarm due at `now`: each becomes a shown
    /// notification. Returns the reminders that fired.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn fire_due(&self, now: DateTime<Utc>) -> Result<Vec<ReminderRecord>, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let due = {
            let mut stmt = tx.prepare(
                "SELECT task_id, state, fire_at, title, body FROM reminders
                 WHERE state = ?1 AND fire_at <= ?2
                 ORDER BY fire_at, task_id",
            )?;
            let rows = stmt.query_map(params![ReminderState::Scheduled.as_str(), ts(now)], row_to_record)?;
            let due = rows
                .filter_map(|row| row.transpose())
                .collect::<Result<Vec<_>, _>>()?;
            due
        };
        for record in &due {
            tx.execute(
                "UPDATE reminders SET state = ?1, updated_at = ?2 WHERE task_id = ?3",
                params![ReminderState::Shown.as_str(), ts(now), record.task_id],
            )?;
        }
        tx.commit()?;

        if !due.is_empty() {
            tracing::info!(count = due.len(), "fired due reminders");
        }
        Ok(due
            .into_iter()
            .map(|record| ReminderRecord {
                state: ReminderState::Shown,
                ..record
            })
            .collect())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<ReminderRecord>> {
    let task_id: i64 = row.get(0)?;
    let state: String = row.get(1)?;
    let fire_at: String = row.get(2)?;
    let Some(state) = ReminderState::parse(&state) else {
        tracing::warn!(task_id, state = %state, "skipping reminder row with unknown state");
        return Ok(None);
    };
    Ok(Some(ReminderRecord {
        task_id,
        state,
        fire_at: parse_ts(&fire_at),
        title: row.get(3)?,
        body: row.get(4)?,
    }))
}

impl ReminderStore for SqliteReminderStore {
    fn schedule_at(&self, id: i64, at: DateTime<Utc>, payload: &ReminderPayload) -> Result<(), StoreError> {
        let payload = ReminderPayload {
            task_id: id,
            ..payload.clone()
        };
        self.upsert(ReminderState::Scheduled, at, &payload)
    }

    fn cancel(&self, id: i64) -> Result<(), StoreError> {
        self.conn()?
            .execute("DELETE FROM reminders WHERE task_id = ?1", [id])?;
        Ok(())
    }

    fn show_immediate(&self, id: i64, payload: &ReminderPayload) -> Result<(), StoreError> {
        let payload = ReminderPayload {
            task_id: id,
            ..payload.clone()
        };
        self.upsert(ReminderState::Shown, payload.due_at, &payload)
    }

    fn is_active(&self, id: i64) -> Result<bool, StoreError> {
        let state: Option<String> = self
            .conn()?
            .query_row("SELECT state FROM reminders WHERE task_id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(state.as_deref() == Some(ReminderState::Shown.as_str()))
    }
}
