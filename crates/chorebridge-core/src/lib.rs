//! # chorebridge core library
//!
//! Native side of a shell that hosts a remote chore-tracking web application
//! in an embedded browser and mirrors its chores into local reminders.
//!
//! ## Pipeline
//!
//! 1. **Interceptor**: classifies the page's network calls and generates the
//!    script that observes them ([`interceptor`])
//! 2. **Bridge**: turns script calls into typed messages for a single worker
//!    ([`bridge`])
//! 3. **Parser**: decodes chore-list bodies into [`Task`]s ([`parser`])
//! 4. **Reconciler**: converges the [`ReminderStore`] with the latest list and
//!    cancels reminders of completed chores ([`reminder`])
//!
//! The platform alarm subsystem and notification permission are consumed
//! through the [`ReminderStore`] and [`PermissionGate`] traits. A durable
//! SQLite store is provided for desktop and headless hosts.

pub mod bridge;
pub mod clock;
pub mod error;
pub mod interceptor;
pub mod parser;
pub mod reminder;
pub mod sanitize;
pub mod storage;
pub mod task;

pub use bridge::{Bridge, BridgeHandle, BridgeMessage, Envelope, WorkerReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{BridgeError, ConfigError, CoreError, StoreError};
pub use interceptor::{EndpointPatterns, SurfaceHandle, TrafficClass};
pub use parser::{ParsedTaskList, TaskListParser};
pub use reminder::{
    MemoryReminderStore, PermissionGate, ReconcileOutcome, Reconciler, ReconcilerConfig, ReminderPayload,
    ReminderStore, StaticPermissionGate,
};
pub use sanitize::sanitize_description;
pub use storage::{Config, SqliteReminderStore};
pub use task::Task;
