//! End-to-end tests: bridge messages through parsing and reconciliation
//! into a reminder store.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chorebridge_core::reminder::{PermissionCallback, StoreCall};
use chorebridge_core::{
    Bridge, EndpointPatterns, FixedClock, MemoryReminderStore, PermissionGate, Reconciler, ReconcilerConfig,
    SqliteReminderStore, StaticPermissionGate, TaskListParser,
};
use chrono::{TimeZone, Utc};

const FUTURE: &str = "2099-01-01T09:00:00Z";
const PAST: &str = "2020-01-01T09:00:00Z";

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()))
}

fn spawn(store: Arc<MemoryReminderStore>, gate: Arc<dyn PermissionGate>) -> (Bridge, chorebridge_core::BridgeHandle) {
    let reconciler = Reconciler::new(store, clock(), ReconcilerConfig::default());
    Bridge::spawn(reconciler, TaskListParser::default(), gate, EndpointPatterns::default())
}

fn two_chores() -> String {
    format!(
        r#"[{{"id":1,"name":"Dishes","notification":true,"isActive":true,"nextDueDate":"{FUTURE}"}},
            {{"id":2,"name":"Laundry","notification":false}}]"#
    )
}

#[tokio::test]
async fn list_then_completion_scenario() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge.on_list_received(two_chores());
    bridge.on_task_completed(1);

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.reconciliations, 1);
    assert_eq!(report.completions, 1);
    assert!(report.tracked.is_empty());

    let outcome = report.last_outcome.unwrap();
    assert_eq!(outcome.scheduled, vec![1]);
    assert_eq!(outcome.ineligible, 1);

    let calls = store.calls();
    assert!(!calls.iter().any(|c| c.id() == 2));
    assert_eq!(calls.last(), Some(&StoreCall::Cancel { id: 1 }));
    assert!(store.scheduled().is_empty());
}

#[tokio::test]
async fn identical_payload_twice_reconciles_once() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge.on_list_received(two_chores());
    bridge.on_list_received(two_chores());

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.lists_received, 2);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(report.reconciliations, 1);
    assert_eq!(report.tracked, BTreeSet::from([1]));
}

#[tokio::test]
async fn changed_payload_is_not_deduplicated() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge.on_list_received(two_chores());
    bridge.on_list_received(format!(
        r#"{{"res":[{{"id":3,"name":"Trash","notification":true,"nextDueDate":"{PAST}"}}]}}"#
    ));
    bridge.on_list_received(two_chores());

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.reconciliations, 3);
    assert_eq!(report.tracked, BTreeSet::from([1]));
    assert!(store.shown().is_empty(), "overdue chore 3 must be cancelled by the last list");
}

#[tokio::test]
async fn completion_leaves_other_reminders_alone() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    let list = format!(
        r#"[{{"id":1,"name":"a","notification":true,"nextDueDate":"{FUTURE}"}},
            {{"id":2,"name":"b","notification":true,"nextDueDate":"{FUTURE}"}},
            {{"id":3,"name":"c","notification":true,"nextDueDate":"{PAST}"}}]"#
    );
    bridge.on_list_received(list);
    bridge.on_task_completed(2);

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.tracked, BTreeSet::from([1, 3]));
    assert!(store.scheduled().contains_key(&1));
    assert!(!store.scheduled().contains_key(&2));
    assert!(store.shown().contains(&3));
}

#[tokio::test]
async fn script_envelopes_reach_the_reconciler() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    let envelope = serde_json::json!({ "kind": "list_received", "body": two_chores() }).to_string();
    bridge.post_message(&envelope);
    bridge.post_message("{\"kind\":\"bogus\"}");
    bridge.on_response("https://chores.example.com/api/v1/chores/1/do", None);
    bridge.on_response("https://chores.example.com/api/v1/chores/history", Some("[]"));

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.lists_received, 1);
    assert_eq!(report.completions, 1);
    assert!(report.tracked.is_empty());
}

#[tokio::test]
async fn unparseable_list_clears_reminders() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge.on_list_received(two_chores());
    bridge.on_list_received("<html>502 Bad Gateway</html>");

    let report = handle.shutdown(bridge).await.unwrap();
    assert!(report.tracked.is_empty());
    assert!(store.scheduled().is_empty());
}

/// Gate whose answer arrives when the test says so.
#[derive(Default)]
struct ManualGate {
    granted: AtomicBool,
    pending: Mutex<Option<PermissionCallback>>,
}

impl ManualGate {
    fn wait_for_request(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.pending.lock().unwrap().is_none() {
            assert!(Instant::now() < deadline, "permission was never requested");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn answer(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
        let callback = self.pending.lock().unwrap().take().expect("no pending request");
        callback(granted);
    }
}

impl PermissionGate for ManualGate {
    fn has_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_permission(&self, on_result: PermissionCallback) {
        *self.pending.lock().unwrap() = Some(on_result);
    }
}

#[tokio::test]
async fn permission_grant_reruns_cached_list() {
    let store = Arc::new(MemoryReminderStore::new());
    let gate = Arc::new(ManualGate::default());
    let (bridge, handle) = spawn(store.clone(), gate.clone());

    bridge.on_list_received(two_chores());
    gate.wait_for_request();
    assert!(store.scheduled().is_empty());

    gate.answer(true);

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.permission_requests, 1);
    assert_eq!(report.reconciliations, 2);
    assert_eq!(report.tracked, BTreeSet::from([1]));
    assert!(store.scheduled().contains_key(&1));
}

#[tokio::test]
async fn permission_denied_schedules_nothing() {
    let store = Arc::new(MemoryReminderStore::new());
    let gate = Arc::new(ManualGate::default());
    let (bridge, handle) = spawn(store.clone(), gate.clone());

    bridge.on_list_received(two_chores());
    gate.wait_for_request();
    gate.answer(false);

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.reconciliations, 1);
    assert!(report.tracked.is_empty());
    assert!(store.scheduled().is_empty());
}

#[tokio::test]
async fn denial_lets_a_later_list_ask_again() {
    let store = Arc::new(MemoryReminderStore::new());
    let gate = Arc::new(ManualGate::default());
    let (bridge, handle) = spawn(store.clone(), gate.clone());

    bridge.on_list_received(two_chores());
    gate.wait_for_request();
    gate.answer(false);

    bridge.on_list_received(format!(
        r#"[{{"id":4,"name":"Mop","notification":true,"nextDueDate":"{FUTURE}"}}]"#
    ));
    gate.wait_for_request();
    gate.answer(true);

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.permission_requests, 2);
    assert_eq!(report.tracked, BTreeSet::from([4]));
    assert!(store.scheduled().contains_key(&4));
}

#[tokio::test]
async fn blank_due_date_is_shown_immediately() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge.on_list_received(r#"[{"id":1,"name":"a","notification":true,"isActive":true,"nextDueDate":""}]"#);

    let report = handle.shutdown(bridge).await.unwrap();
    let outcome = report.last_outcome.unwrap();
    assert_eq!(outcome.shown, vec![1]);
    assert_eq!(outcome.ineligible, 0);
    assert_eq!(report.tracked, BTreeSet::from([1]));
    assert!(store.shown().contains(&1));
}

#[tokio::test]
async fn completion_before_any_list_only_cancels() {
    let store = Arc::new(MemoryReminderStore::new());
    let (bridge, handle) = spawn(store.clone(), Arc::new(StaticPermissionGate::granted()));

    bridge
        .try_send(chorebridge_core::BridgeMessage::TaskCompleted(9))
        .unwrap();

    let report = handle.shutdown(bridge).await.unwrap();
    assert_eq!(report.reconciliations, 0);
    assert_eq!(report.completions, 1);
    assert_eq!(store.calls(), vec![StoreCall::Cancel { id: 9 }]);
}

#[tokio::test]
async fn durable_store_keeps_reminders_across_bridges() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.db");

    {
        let store = Arc::new(SqliteReminderStore::open_at(&path).unwrap());
        let reconciler = Reconciler::new(store, clock(), ReconcilerConfig::default());
        let (bridge, handle) = Bridge::spawn(
            reconciler,
            TaskListParser::default(),
            Arc::new(StaticPermissionGate::granted()),
            EndpointPatterns::default(),
        );
        bridge.on_list_received(two_chores());
        handle.shutdown(bridge).await.unwrap();
    }

    // A later process seeds from the store, so a list without chore 1
    // removes the reminder the earlier process created.
    let store = Arc::new(SqliteReminderStore::open_at(&path).unwrap());
    assert_eq!(store.ids().unwrap(), vec![1]);

    let reconciler = Reconciler::new(store.clone(), clock(), ReconcilerConfig::default())
        .with_tracked(store.ids().unwrap());
    let (bridge, handle) = Bridge::spawn(
        reconciler,
        TaskListParser::default(),
        Arc::new(StaticPermissionGate::granted()),
        EndpointPatterns::default(),
    );
    bridge.on_list_received("[]");
    let report = handle.shutdown(bridge).await.unwrap();

    assert_eq!(report.last_outcome.unwrap().cancelled, 1);
    assert!(store.ids().unwrap().is_empty());
}
