//! Convergence of the reminder store with the latest observed chore list.
//!
//! The reconciler owns the set of chore ids it believes hold a live reminder
//! (scheduled alarm or shown notification). A full reconciliation treats the
//! incoming list as the whole truth: every tracked reminder is cancelled
//! first, then reminders are created for the eligible chores. A completion
//! only ever touches the completed chore's reminder.
//!
//! The reconciler is not synchronised; callers serialise access (see
//! [`crate::bridge`]). When the tracked set and the store disagree, the store
//! wins.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReminderPayload, ReminderStore};
use crate::clock::Clock;
use crate::sanitize::MAX_DESCRIPTION_CHARS;
use crate::task::Task;

/// Reconciler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// When false, reconciliation only cancels.
    pub notifications_enabled: bool,
    /// Length cap for notification bodies.
    pub max_description_chars: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            max_description_chars: MAX_DESCRIPTION_CHARS,
        }
    }
}

/// What one full reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Previously tracked reminders cancelled.
    pub cancelled: usize,
    /// Cancels the store rejected.
    pub cancel_failures: usize,
    /// Future alarms scheduled.
    pub scheduled: Vec<i64>,
    /// Overdue chores shown immediately.
    pub shown: Vec<i64>,
    /// Overdue chores whose notification was already on screen.
    pub suppressed: Vec<i64>,
    /// Chores without notification opt-in, inactive, or undated.
    pub ineligible: usize,
    /// Eligible chores held back because notifications are off or not
    /// permitted.
    pub deferred: usize,
    /// Eligible chores the store rejected.
    pub failed: Vec<i64>,
}

impl ReconcileOutcome {
    /// Ids that hold a reminder after this run.
    pub fn covered(&self) -> BTreeSet<i64> {
        self.scheduled
            .iter()
            .chain(&self.shown)
            .chain(&self.suppressed)
            .copied()
            .collect()
    }

    /// Get a human-readable summary message.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "cancelled {}, scheduled {}, shown {}, suppressed {}, ineligible {}",
            self.cancelled,
            self.scheduled.len(),
            self.shown.len(),
            self.suppressed.len(),
            self.ineligible
        );
        if self.deferred > 0 {
            msg.push_str(&format!(", deferred {}", self.deferred));
        }
        if !self.failed.is_empty() || self.cancel_failures > 0 {
            msg.push_str(&format!(
                ", failed {} (+{} cancels)",
                self.failed.len(),
                self.cancel_failures
            ));
        }
        msg
    }
}

/// Keeps the reminder store converged with the remote chore list.
pub struct Reconciler {
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    tracked: BTreeSet<i64>,
    last_tasks: Option<Vec<Task>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ReminderStore>, clock: Arc<dyn Clock>, config: ReconcilerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            tracked: BTreeSet::new(),
            last_tasks: None,
        }
    }

    /// Start from ids the store already holds, so the next full
    /// reconciliation cancels reminders left behind by an earlier process.
    pub fn with_tracked(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.tracked.extend(ids);
        self
    }

    pub fn tracked(&self) -> &BTreeSet<i64> {
        &self.tracked
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// The list the last full reconciliation ran against.
    pub fn last_tasks(&self) -> Option<&[Task]> {
        self.last_tasks.as_deref()
    }

    /// Converge the store with `tasks`.
    ///
    /// With `permitted == false` (or notifications disabled) stale reminders
    /// are still cancelled, but nothing new is created.
    pub fn reconcile(&mut self, tasks: Vec<Task>, permitted: bool) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        // Cancel everything first so a stale sweep can never remove a
        // reminder created below.
        for id in std::mem::take(&mut self.tracked) {
            match self.store.cancel(id) {
                Ok(()) => outcome.cancelled += 1,
                Err(e) => {
                    outcome.cancel_failures += 1;
                    tracing::warn!(task_id = id, error = %e, "failed to cancel stale reminder");
                }
            }
        }

        let can_notify = permitted && self.config.notifications_enabled;
        let now = self.clock.now();

        for task in tasks.iter() {
            if !task.is_reminder_eligible() {
                outcome.ineligible += 1;
                continue;
            }
            if !can_notify {
                outcome.deferred += 1;
                continue;
            }
            self.arm(task, now, &mut outcome);
        }

        tracing::info!(
            tasks = tasks.len(),
            tracked = self.tracked.len(),
            "reminders reconciled: {}",
            outcome.message()
        );
        self.last_tasks = Some(tasks);
        outcome
    }

    /// Re-run against the cached list, if any. Used when notification
    /// permission is granted after a list was already seen.
    pub fn rerun(&mut self, permitted: bool) -> Option<ReconcileOutcome> {
        let tasks = self.last_tasks.take()?;
        Some(self.reconcile(tasks, permitted))
    }

    /// Cancel the reminder of one completed chore, leaving every other
    /// reminder untouched. Returns whether the chore was tracked.
    pub fn complete(&mut self, id: i64) -> bool {
        if let Some(tasks) = self.last_tasks.as_mut() {
            tasks.retain(|t| t.id != id);
        }
        match self.store.cancel(id) {
            Ok(()) => {
                let was_tracked = self.tracked.remove(&id);
                tracing::debug!(task_id = id, was_tracked, "reminder cancelled for completed chore");
                was_tracked
            }
            Err(e) => {
                // Keep it tracked so the next full reconciliation retries.
                tracing::warn!(task_id = id, error = %e, "failed to cancel reminder for completed chore");
                self.tracked.contains(&id)
            }
        }
    }

    fn arm(&mut self, task: &Task, now: DateTime<Utc>, outcome: &mut ReconcileOutcome) {
        let fire_at = task.fire_time();
        let payload = ReminderPayload::for_task(task, fire_at, self.config.max_description_chars);

        if fire_at > now {
            match self.store.schedule_at(task.id, fire_at, &payload) {
                Ok(()) => {
                    self.tracked.insert(task.id);
                    outcome.scheduled.push(task.id);
                }
                Err(e) => {
                    tracing::warn!(task_id = task.id, error = %e, "failed to schedule reminder");
                    outcome.failed.push(task.id);
                }
            }
            return;
        }

        let already_shown = self.store.is_active(task.id).unwrap_or_else(|e| {
            tracing::debug!(task_id = task.id, error = %e, "active-notification lookup failed");
            false
        });
        if already_shown {
            self.tracked.insert(task.id);
            outcome.suppressed.push(task.id);
            return;
        }

        match self.store.show_immediate(task.id, &payload) {
            Ok(()) => {
                self.tracked.insert(task.id);
                outcome.shown.push(task.id);
            }
            Err(e) => {
                tracing::warn!(task_id = task.id, error = %e, "failed to show overdue reminder");
                outcome.failed.push(task.id);
            }
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("tracked", &self.tracked)
            .field("cached_tasks", &self.last_tasks.as_ref().map(Vec::len))
            .finish()
    }
}
