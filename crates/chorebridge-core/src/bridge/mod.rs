//! Call channel from the hosted page's script environment into native code.
//!
//! Script-side calls arrive untyped (a JSON string posted to the bridge
//! object) on whatever thread the browser engine uses. [`Bridge`] validates
//! them into [`BridgeMessage`]s and hands them to a single worker without
//! doing any work inline; the worker owns the [`Reconciler`] and is the only
//! writer of its tracked set.
//!
//! [`Reconciler`]: crate::reminder::Reconciler

mod worker;

pub use worker::WorkerReport;

use worker::{BridgeWorker, WorkerInput};

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::BridgeError;
use crate::interceptor::EndpointPatterns;
use crate::parser::TaskListParser;
use crate::reminder::{PermissionGate, Reconciler};

/// Bridge object name the interceptor script posts to.
pub const DEFAULT_BRIDGE_NAME: &str = "ChoreBridge";

/// A validated bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    /// Raw body of a chore-list response.
    ListReceived(String),
    /// A chore was marked done.
    TaskCompleted(i64),
}

/// Wire format of script-originated calls.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    ListReceived { body: String },
    TaskCompleted { id: i64 },
    /// Unclassified response; classified natively.
    Response { url: String, body: Option<String> },
}

impl Envelope {
    pub fn decode(raw: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(raw).map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))
    }

    /// Resolve into a bridge message, classifying raw responses.
    pub fn into_message(self, patterns: &EndpointPatterns) -> Option<BridgeMessage> {
        match self {
            Envelope::ListReceived { body } => Some(BridgeMessage::ListReceived(body)),
            Envelope::TaskCompleted { id } => Some(BridgeMessage::TaskCompleted(id)),
            Envelope::Response { url, body } => patterns.observe(&url, body.as_deref()),
        }
    }
}

/// Native end of the bridge. Cheap to clone; every entry point returns
/// immediately.
#[derive(Debug, Clone)]
pub struct Bridge {
    tx: mpsc::UnboundedSender<WorkerInput>,
    patterns: Arc<EndpointPatterns>,
}

impl Bridge {
    /// Start the worker on the blocking pool of the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        reconciler: Reconciler,
        parser: TaskListParser,
        gate: Arc<dyn PermissionGate>,
        patterns: EndpointPatterns,
    ) -> (Self, BridgeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = BridgeWorker::new(reconciler, parser, gate, tx.clone());
        let join = tokio::task::spawn_blocking(move || worker.run(rx));
        let bridge = Self {
            tx,
            patterns: Arc::new(patterns),
        };
        (bridge, BridgeHandle { join })
    }

    /// `onListReceived`: a chore-list body was observed.
    pub fn on_list_received(&self, raw_json: impl Into<String>) {
        self.send(BridgeMessage::ListReceived(raw_json.into()));
    }

    /// `onTaskCompleted`: a chore was marked done.
    pub fn on_task_completed(&self, id: i64) {
        self.send(BridgeMessage::TaskCompleted(id));
    }

    /// A response observed natively (request interception outside the page).
    pub fn on_response(&self, url: &str, body: Option<&str>) {
        if let Some(message) = self.patterns.observe(url, body) {
            self.send(message);
        }
    }

    /// Entry point for the raw string the page posts. Malformed messages are
    /// logged and dropped.
    pub fn post_message(&self, raw: &str) {
        match Envelope::decode(raw) {
            Ok(envelope) => {
                if let Some(message) = envelope.into_message(&self.patterns) {
                    self.send(message);
                }
            }
            Err(e) => tracing::warn!(error = %e, "dropping bridge message"),
        }
    }

    /// Try to deliver `message`, reporting a stopped worker.
    pub fn try_send(&self, message: BridgeMessage) -> Result<(), BridgeError> {
        self.tx
            .send(WorkerInput::Bridge(message))
            .map_err(|_| BridgeError::Closed)
    }

    fn send(&self, message: BridgeMessage) {
        if let Err(e) = self.try_send(message) {
            tracing::warn!(error = %e, "bridge message lost");
        }
    }
}

/// Owner-side handle used to stop the worker.
#[derive(Debug)]
pub struct BridgeHandle {
    join: JoinHandle<WorkerReport>,
}

impl BridgeHandle {
    /// Drop `bridge`, let the worker drain what is queued, and wait for it.
    ///
    /// Other clones of the bridge keep the worker alive until they are
    /// dropped too.
    pub async fn shutdown(self, bridge: Bridge) -> Result<WorkerReport, BridgeError> {
        drop(bridge);
        self.join
            .await
            .map_err(|e| BridgeError::WorkerFailed(e.to_string()))
    }
}
