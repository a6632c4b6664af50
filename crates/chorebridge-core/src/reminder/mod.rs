//! Local reminders mirrored from the remote chore list.
//!
//! - [`ReminderStore`]: the platform alarm/notification subsystem
//! - [`PermissionGate`]: the platform notification permission
//! - [`Reconciler`]: keeps the store converged with the latest list

mod memory;
mod permission;
mod reconciler;

pub use memory::{MemoryReminderStore, StoreCall};
pub use permission::{PermissionCallback, PermissionGate, StaticPermissionGate};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::sanitize::sanitize_description_with_limit;
use crate::task::Task;

/// Everything needed to render a reminder, including after process death.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub task_id: i64,
    pub title: String,
    pub body: String,
    pub due_at: DateTime<Utc>,
}

impl ReminderPayload {
    /// Build the payload for `task`, sanitizing its description.
    pub fn for_task(task: &Task, due_at: DateTime<Utc>, max_description_chars: usize) -> Self {
        let body = task
            .description
            .as_deref()
            .map(|d| sanitize_description_with_limit(d, max_description_chars))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| {
                if due_at == DateTime::<Utc>::UNIX_EPOCH {
                    "Overdue".to_string()
                } else {
                    format!("Due {}", due_at.format("%Y-%m-%d %H:%M UTC"))
                }
            });
        Self {
            task_id: task.id,
            title: task.name.clone(),
            body,
            due_at,
        }
    }
}

/// Platform alarm and notification subsystem.
///
/// Reminder ids are chore ids. Implementations must persist scheduled alarms
/// durably; the process that scheduled them may be gone when they fire.
pub trait ReminderStore: Send + Sync {
    /// Schedule an alarm that shows `payload` at `at`. Replaces any alarm
    /// already scheduled under `id`.
    fn schedule_at(&self, id: i64, at: DateTime<Utc>, payload: &ReminderPayload) -> Result<(), StoreError>;

    /// Cancel the pending alarm and dismiss the shown notification for `id`.
    fn cancel(&self, id: i64) -> Result<(), StoreError>;

    /// Show a notification for `id` now.
    fn show_immediate(&self, id: i64, payload: &ReminderPayload) -> Result<(), StoreError>;

    /// Whether a notification carrying `id` is currently on screen.
    fn is_active(&self, id: i64) -> Result<bool, StoreError>;
}

impl<S: ReminderStore + ?Sized> ReminderStore for std::sync::Arc<S> {
    fn schedule_at(&self, id: i64, at: DateTime<Utc>, payload: &ReminderPayload) -> Result<(), StoreError> {
        (**self).schedule_at(id, at, payload)
    }

    fn cancel(&self, id: i64) -> Result<(), StoreError> {
        (**self).cancel(id)
    }

    fn show_immediate(&self, id: i64, payload: &ReminderPayload) -> Result<(), StoreError> {
        (**self).show_immediate(id, payload)
    }

    fn is_active(&self, id: i64) -> Result<bool, StoreError> {
        (**self).is_active(id)
    }
}
