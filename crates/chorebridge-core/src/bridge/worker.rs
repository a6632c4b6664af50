use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use super::BridgeMessage;
use crate::parser::TaskListParser;
use crate::reminder::{PermissionGate, ReconcileOutcome, Reconciler};

/// What the worker consumes: bridge calls plus permission answers, which
/// never cross the script boundary.
#[derive(Debug)]
pub(crate) enum WorkerInput {
    Bridge(BridgeMessage),
    PermissionGranted,
    /// The next list wanting reminders may ask again.
    PermissionDenied,
}

/// Counters returned when the worker stops.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerReport {
    pub lists_received: usize,
    pub duplicates_skipped: usize,
    pub reconciliations: usize,
    pub completions: usize,
    pub permission_requests: usize,
    pub last_outcome: Option<ReconcileOutcome>,
    /// Tracked reminder ids at shutdown.
    pub tracked: BTreeSet<i64>,
}

/// Single consumer of bridge messages; sole owner of the [`Reconciler`].
pub struct BridgeWorker {
    reconciler: Reconciler,
    parser: TaskListParser,
    gate: Arc<dyn PermissionGate>,
    // Weak, so the worker does not keep its own channel open.
    callback_tx: mpsc::WeakUnboundedSender<WorkerInput>,
    last_list_digest: Option<String>,
    permission_requested: bool,
    report: WorkerReport,
}

impl BridgeWorker {
    pub(crate) fn new(
        reconciler: Reconciler,
        parser: TaskListParser,
        gate: Arc<dyn PermissionGate>,
        tx: mpsc::UnboundedSender<WorkerInput>,
    ) -> Self {
        Self {
            reconciler,
            parser,
            gate,
            callback_tx: tx.downgrade(),
            last_list_digest: None,
            permission_requested: false,
            report: WorkerReport::default(),
        }
    }

    /// Process messages until every sender is gone. Blocks the thread.
    pub(crate) fn run(mut self, mut rx: mpsc::UnboundedReceiver<WorkerInput>) -> WorkerReport {
        tracing::debug!("bridge worker started");
        while let Some(message) = rx.blocking_recv() {
            self.handle(message);
        }
        self.report.tracked = self.reconciler.tracked().clone();
        tracing::debug!(
            reconciliations = self.report.reconciliations,
            completions = self.report.completions,
            "bridge worker stopped"
        );
        self.report
    }

    fn handle(&mut self, input: WorkerInput) {
        match input {
            WorkerInput::Bridge(BridgeMessage::ListReceived(raw)) => self.on_list(&raw),
            WorkerInput::Bridge(BridgeMessage::TaskCompleted(id)) => {
                self.report.completions += 1;
                self.reconciler.complete(id);
            }
            WorkerInput::PermissionGranted => {
                self.permission_requested = false;
                match self.reconciler.rerun(true) {
                    Some(outcome) => self.record(outcome),
                    None => tracing::debug!("permission granted before any chore list was seen"),
                }
            }
            WorkerInput::PermissionDenied => self.permission_requested = false,
        }
    }

    fn on_list(&mut self, raw: &str) {
        self.report.lists_received += 1;

        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        if self.last_list_digest.as_deref() == Some(digest.as_str()) {
            self.report.duplicates_skipped += 1;
            tracing::debug!("duplicate chore list skipped");
            return;
        }
        self.last_list_digest = Some(digest);

        let parsed = self.parser.parse(raw);
        let permitted = self.gate.has_permission();
        if !permitted && self.reconciler.config().notifications_enabled {
            let wants_reminders = parsed.tasks.iter().any(|t| t.is_reminder_eligible());
            if wants_reminders {
                self.request_permission();
            }
        }

        let outcome = self.reconciler.reconcile(parsed.tasks, permitted);
        self.record(outcome);
    }

    fn request_permission(&mut self) {
        if self.permission_requested {
            return;
        }
        self.permission_requested = true;
        self.report.permission_requests += 1;
        tracing::info!("requesting notification permission");

        let tx = self.callback_tx.clone();
        self.gate.request_permission(Box::new(move |granted| {
            let answer = if granted {
                WorkerInput::PermissionGranted
            } else {
                tracing::info!("notification permission denied");
                WorkerInput::PermissionDenied
            };
            match tx.upgrade() {
                Some(tx) => {
                    let _ = tx.send(answer);
                }
                None => tracing::debug!(granted, "permission answered after bridge shut down"),
            }
        }));
    }

    fn record(&mut self, outcome: ReconcileOutcome) {
        self.report.reconciliations += 1;
        self.report.last_outcome = Some(outcome);
    }
}
