use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use leave_desk::config::{Config, FirebaseConfig};
use leave_desk::error::AppError;
use leave_desk::identity::FirebaseIdentity;
use leave_desk::models::{LeaveRequest, LeaveRequestPatch, LeaveStatus, LeaveType, NewLeaveRequest};
use leave_desk::services::{SessionBootstrap, SessionState};
use leave_desk::store::dto::{Document, Value};
use leave_desk::store::firestore::{MIN_POLL_INTERVAL, decode_document, encode_request, poll_snapshots};
use leave_desk::store::{CollectionPath, DocumentStore, FirestoreStore, SnapshotEvent};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

fn document(fields: serde_json::Value) -> Document {
    serde_json::from_value(json!({
        "name": "projects/demo/databases/(default)/documents/artifacts/app/public/data/leave_requests/abc123",
        "fields": fields,
        "createTime": "2024-01-01T00:00:00Z",
        "updateTime": "2024-01-01T00:00:00Z"
    }))
    .expect("document should deserialize")
}

#[test]
fn test_collection_path_layout() {
    let path = CollectionPath::leave_requests("school-leave-app");
    assert_eq!(path.to_string(), "artifacts/school-leave-app/public/data/leave_requests");
}

#[test]
fn test_decode_document() {
    let doc = document(json!({
        "studentName": { "stringValue": "Mg Mg" },
        "studentId": { "stringValue": "STU-001" },
        "leaveType": { "stringValue": "personal" },
        "startDate": { "stringValue": "2024-01-01" },
        "endDate": { "nullValue": null },
        "totalDays": { "doubleValue": 1.5 },
        "missedSubjects": { "stringValue": "Maths" },
        "reason": { "stringValue": "family" },
        "status": { "stringValue": "approved" },
        "requestDate": { "stringValue": "2024-01-01" },
        "timestamp": { "integerValue": "1704067200000" }
    }));

    let request = decode_document(&doc).expect("document should decode");

    assert_eq!(request.id, "abc123");
    assert_eq!(request.leave_type, LeaveType::Personal);
    assert_eq!(request.end_date, None);
    assert_eq!(request.total_days, 1.5);
    assert_eq!(request.status, LeaveStatus::Approved);
    assert_eq!(request.timestamp, 1_704_067_200_000);
}

#[test]
fn test_decode_accepts_hand_typed_numbers_and_blank_end_date() {
    let doc = document(json!({
        "studentName": { "stringValue": "Aung" },
        "studentId": { "stringValue": "STU-002" },
        "leaveType": { "stringValue": "something else" },
        "startDate": { "stringValue": "2024-02-01" },
        "endDate": { "stringValue": "" },
        "totalDays": { "stringValue": "3" },
        "missedSubjects": { "stringValue": "" },
        "reason": { "stringValue": "flu" },
        "status": { "stringValue": "pending" },
        "requestDate": { "stringValue": "2024-02-01" },
        "timestamp": { "integerValue": "42" }
    }));

    let request = decode_document(&doc).expect("document should decode");

    assert_eq!(request.total_days, 3.0);
    assert_eq!(request.end_date, None);
    assert_eq!(request.leave_type, LeaveType::Other);
}

#[test]
fn test_decode_rejects_unknown_status() {
    let doc = document(json!({
        "studentName": { "stringValue": "Aung" },
        "studentId": { "stringValue": "STU-002" },
        "startDate": { "stringValue": "2024-02-01" },
        "totalDays": { "doubleValue": 1.0 },
        "status": { "stringValue": "cancelled" },
        "requestDate": { "stringValue": "2024-02-01" }
    }));

    assert!(decode_document(&doc).is_err());
}

#[test]
fn test_encode_request_fields() {
    let request = NewLeaveRequest {
        student_name: "Mg Mg".to_string(),
        student_id: "STU-001".to_string(),
        leave_type: LeaveType::Sick,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: None,
        total_days: 3.0,
        missed_subjects: String::new(),
        reason: "flu".to_string(),
        status: LeaveStatus::Pending,
        request_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        timestamp: 1_704_067_200_000,
    };

    let fields = encode_request(&request);

    assert_eq!(fields["status"], Value::StringValue("pending".to_string()));
    assert_eq!(fields["leaveType"], Value::StringValue("sick".to_string()));
    assert_eq!(fields["endDate"], Value::NullValue(()));
    assert_eq!(fields["totalDays"], Value::DoubleValue(3.0));
    assert_eq!(fields["timestamp"], Value::IntegerValue("1704067200000".to_string()));
    assert_eq!(
        serde_json::to_value(&fields["timestamp"]).unwrap(),
        json!({ "integerValue": "1704067200000" })
    );
}

fn request(id: &str) -> LeaveRequest {
    LeaveRequest {
        id: id.to_string(),
        student_name: "Mg Mg".to_string(),
        student_id: "STU-001".to_string(),
        leave_type: LeaveType::Sick,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: None,
        total_days: 1.0,
        missed_subjects: String::new(),
        reason: "flu".to_string(),
        status: LeaveStatus::Pending,
        request_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        timestamp: 1,
    }
}

/// Replays `script` one poll at a time, `None` standing for a failed fetch.
/// The last entry repeats once the script runs out.
fn scripted(
    script: Vec<Option<Vec<LeaveRequest>>>,
    polls: Arc<AtomicUsize>,
) -> impl FnMut() -> std::future::Ready<Result<Vec<LeaveRequest>, AppError>> {
    let script = Arc::new(Mutex::new(VecDeque::from(script)));
    move || {
        polls.fetch_add(1, Ordering::SeqCst);
        let mut script = script.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        };
        std::future::ready(step.ok_or_else(|| AppError::Store("network down".to_string())))
    }
}

fn snapshot_ids(event: SnapshotEvent) -> Vec<String> {
    match event {
        SnapshotEvent::Snapshot(requests) => requests.into_iter().map(|r| r.id).collect(),
        SnapshotEvent::Error(e) => panic!("expected a snapshot, got error {}", e),
    }
}

#[tokio::test(start_paused = true)]
async fn test_poll_skips_unchanged_snapshots() {
    let polls = Arc::new(AtomicUsize::new(0));
    let a = vec![request("a")];
    let ab = vec![request("a"), request("b")];
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(poll_snapshots(
        Duration::from_secs(2),
        tx,
        scripted(vec![Some(a.clone()), Some(a.clone()), Some(a), Some(ab)], polls.clone()),
    ));

    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a"]);
    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a", "b"]);
    assert_eq!(polls.load(Ordering::SeqCst), 4);

    let quiet = tokio::time::timeout(Duration::from_secs(20), rx.recv()).await;
    assert!(quiet.is_err(), "unchanged polls should not be reported");
    assert!(polls.load(Ordering::SeqCst) > 4);
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_poll_reports_one_error_per_outage() {
    let polls = Arc::new(AtomicUsize::new(0));
    let a = vec![request("a")];
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(poll_snapshots(
        Duration::from_secs(2),
        tx,
        scripted(vec![Some(a.clone()), None, None, None, Some(a.clone()), None, Some(a)], polls.clone()),
    ));

    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a"]);
    assert_eq!(rx.recv().await.unwrap(), SnapshotEvent::Error("Document store error: network down".to_string()));
    // The outage ends with the same data, which is still sent so the reader knows sync is back.
    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a"]);
    assert_eq!(polls.load(Ordering::SeqCst), 5);

    assert!(matches!(rx.recv().await.unwrap(), SnapshotEvent::Error(_)));
    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a"]);

    let quiet = tokio::time::timeout(Duration::from_secs(20), rx.recv()).await;
    assert!(quiet.is_err());
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_poll_with_zero_interval_falls_back_to_minimum() {
    let polls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(poll_snapshots(
        Duration::ZERO,
        tx,
        scripted(vec![Some(vec![request("a")]), Some(vec![request("b")])], polls),
    ));

    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["a"]);
    let first = Instant::now();
    assert_eq!(snapshot_ids(rx.recv().await.unwrap()), vec!["b"]);
    assert!(Instant::now() - first >= MIN_POLL_INTERVAL);
    task.abort();
}

#[tokio::test]
async fn test_store_with_zero_interval_keeps_subscription_alive() {
    let config = FirebaseConfig {
        project_id: Some("demo".to_string()),
        ..FirebaseConfig::default()
    };
    let (_state, session) = watch::channel(SessionState::Bootstrapping);
    let store = Arc::new(FirestoreStore::new(&config, session, Duration::ZERO).unwrap());

    let mut subscription = store.subscribe(CollectionPath::leave_requests("demo"));
    let event = tokio::time::timeout(Duration::from_secs(2), subscription.next())
        .await
        .expect("subscription should report");

    assert!(matches!(event, Some(SnapshotEvent::Error(_))));
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored --test-threads=1
async fn test_create_and_decide_against_firebase() {
    let config = Config::from_env();
    assert!(config.firebase.is_configured(), "FIREBASE_API_KEY must be set");

    let identity = FirebaseIdentity::new(&config.firebase).expect("Failed to create identity client");
    let session = SessionBootstrap::new(Arc::new(identity));
    let state = session.start(true, config.initial_auth_token.as_deref()).await;
    assert!(state.is_signed_in(), "Failed to sign in: {:?}", state);

    let store = Arc::new(
        FirestoreStore::new(&config.firebase, session.subscribe(), Duration::from_secs(1))
            .expect("Failed to create Firestore client"),
    );
    let path = CollectionPath::leave_requests(format!("{}-it", config.app_id));

    let now = Utc::now();
    let request = NewLeaveRequest {
        student_name: format!("Integration Test - {}", now.timestamp()),
        student_id: "STU-IT".to_string(),
        leave_type: LeaveType::Other,
        start_date: now.date_naive(),
        end_date: None,
        total_days: 0.5,
        missed_subjects: String::new(),
        reason: "integration test".to_string(),
        status: LeaveStatus::Pending,
        request_date: now.date_naive(),
        timestamp: now.timestamp_millis(),
    };

    let id = store.create(&path, &request).await.expect("Failed to create");
    store
        .update(&path, &id, &LeaveRequestPatch { status: LeaveStatus::Approved })
        .await
        .expect("Failed to update");

    let requests = store.fetch_all(&path).await.expect("Failed to fetch");
    let created = requests
        .iter()
        .find(|r| r.id == id)
        .expect("Created request not found in Firestore");
    assert_eq!(created.status, LeaveStatus::Approved);
    assert_eq!(created.student_name, request.student_name);
}
