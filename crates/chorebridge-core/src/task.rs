//! Chore snapshot as observed in the hosted application's list response.
//!
//! A [`Task`] is rebuilt from scratch on every intercepted list and never
//! persisted. Only [`Task::is_reminder_eligible`] and [`Task::fire_time`]
//! drive scheduling; the remaining fields are carried for display.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recurrence hint attached to a chore. Display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    /// Remote "nag until done" flag, reserved for future timing rules.
    pub nagging: bool,
}

/// One remote chore at observation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Remote identifier, reused as the native reminder id.
    pub id: i64,
    pub name: String,
    pub assigned_to: Option<i64>,
    /// Raw due timestamp in the remote's textual format.
    pub next_due_date: Option<String>,
    pub is_completed: bool,
    pub frequency_type: Option<String>,
    pub frequency: i64,
    /// Rich text; sanitize before showing it natively.
    pub description: Option<String>,
    /// Remote opt-in for a local reminder.
    pub notification: bool,
    pub notification_metadata: Option<NotificationMetadata>,
    pub is_active: bool,
    pub priority: i64,
}

impl Task {
    /// A reminder may exist for this task only if this holds.
    pub fn is_reminder_eligible(&self) -> bool {
        self.notification && self.is_active && self.next_due_date.is_some()
    }

    /// Instant the reminder should fire. Unparseable or absent due dates
    /// map to the Unix epoch, which is always overdue.
    pub fn fire_time(&self) -> DateTime<Utc> {
        self.next_due_date
            .as_deref()
            .and_then(parse_due_date)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a remote due date. Offset-less forms are read as UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let parsed = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc());
    if parsed.is_none() {
        tracing::debug!(due = raw, "unparseable due date, treating as overdue");
    }
    parsed
}

#[cfg(test)]
pub(crate) fn sample(id: i64) -> Task {
    Task {
        id,
        name: format!("Chore {id}"),
        assigned_to: None,
        next_due_date: None,
        is_completed: false,
        frequency_type: None,
        frequency: 1,
        description: None,
        notification: false,
        notification_metadata: None,
        is_active: true,
        priority: 0,
    }
}
