use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ReminderPayload, ReminderStore};
use crate::error::StoreError;

/// One call made against a [`MemoryReminderStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreCall {
    ScheduleAt { id: i64, at: DateTime<Utc> },
    Cancel { id: i64 },
    ShowImmediate { id: i64 },
    IsActive { id: i64 },
}

impl StoreCall {
    pub fn id(&self) -> i64 {
        match self {
            StoreCall::ScheduleAt { id, .. }
            | StoreCall::Cancel { id }
            | StoreCall::ShowImmediate { id }
            | StoreCall::IsActive { id } => *id,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    scheduled: BTreeMap<i64, (DateTime<Utc>, ReminderPayload)>,
    shown: BTreeMap<i64, ReminderPayload>,
    failing: HashSet<i64>,
    calls: Vec<StoreCall>,
}

/// In-process reminder store that records every call.
///
/// Used for dry runs and tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryReminderStore {
    state: Mutex<MemoryState>,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutating call for `id` fail with [`StoreError::Backend`].
    pub fn fail_for(&self, id: i64) {
        self.lock().failing.insert(id);
    }

    /// Put a notification on screen without going through a reconciler.
    pub fn seed_shown(&self, payload: ReminderPayload) {
        self.lock().shown.insert(payload.task_id, payload);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn scheduled(&self) -> BTreeMap<i64, DateTime<Utc>> {
        self.lock()
            .scheduled
            .iter()
            .map(|(id, (at, _))| (*id, *at))
            .collect()
    }

    pub fn shown(&self) -> BTreeSet<i64> {
        self.lock().shown.keys().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ReminderStore for MemoryReminderStore {
    fn schedule_at(&self, id: i64, at: DateTime<Utc>, payload: &ReminderPayload) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ScheduleAt { id, at });
        if state.failing.contains(&id) {
            return Err(StoreError::Backend(format!("scheduling {id} rejected")));
        }
        state.scheduled.insert(id, (at, payload.clone()));
        Ok(())
    }

    fn cancel(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Cancel { id });
        if state.failing.contains(&id) {
            return Err(StoreError::Backend(format!("cancelling {id} rejected")));
        }
        state.scheduled.remove(&id);
        state.shown.remove(&id);
        Ok(())
    }

    fn show_immediate(&self, id: i64, payload: &ReminderPayload) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ShowImmediate { id });
        if state.failing.contains(&id) {
            return Err(StoreError::Backend(format!("showing {id} rejected")));
        }
        state.shown.insert(id, payload.clone());
        Ok(())
    }

    fn is_active(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::IsActive { id });
        Ok(state.shown.contains_key(&id))
    }
}
