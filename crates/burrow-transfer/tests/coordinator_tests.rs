use std::sync::Arc;
use std::time::Duration;

use burrow_transfer::{FileDescriptor, UploadCoordinator, UploadId, UploadRecord, UploadStatus};

fn files(names: &[&str]) -> Vec<FileDescriptor> {
    names
        .iter()
        .map(|name| FileDescriptor::new(*name, Some(10)))
        .collect()
}

fn begin(coordinator: &UploadCoordinator, names: &[&str]) -> Vec<UploadId> {
    coordinator
        .begin_batch(&files(names))
        .into_iter()
        .map(|record| record.id)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_terminal_records_vanish_after_expiry() {
    let coordinator = UploadCoordinator::default();
    let ids = begin(&coordinator, &["a.txt", "b.txt", "c.txt"]);

    coordinator.report_terminal(ids[0], UploadStatus::Done, None);
    coordinator.report_terminal(ids[1], UploadStatus::Error, Some("boom".into()));
    assert_eq!(coordinator.records().len(), 3);

    tokio::time::advance(Duration::from_secs(5)).await;
    let remaining: Vec<_> = coordinator.records().into_iter().map(|r| r.id).collect();
    assert_eq!(remaining, [ids[2]]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_expiry() {
    let coordinator = UploadCoordinator::new(Duration::from_millis(250));
    let id = begin(&coordinator, &["a.txt"])[0];
    coordinator.cancel(id);

    tokio::time::advance(Duration::from_millis(249)).await;
    assert!(coordinator.get(id).is_some());
    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(coordinator.get(id).is_none());
}

#[tokio::test]
async fn test_ids_unique_across_coordinators() {
    let first = UploadCoordinator::default();
    let second = UploadCoordinator::default();
    let a = begin(&first, &["a.txt"]);
    let b = begin(&second, &["a.txt"]);
    assert_ne!(a, b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_keep_invariants() {
    let coordinator = Arc::new(UploadCoordinator::default());
    let ids = begin(&coordinator, &["a", "b", "c", "d"]);

    let tasks: Vec<_> = ids
        .iter()
        .map(|&id| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                for percent in (0..=100).step_by(5) {
                    coordinator.report_progress(id, percent);
                    tokio::task::yield_now().await;
                }
                coordinator.report_terminal(id, UploadStatus::Done, None);
                coordinator.cancel(id);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for record in coordinator.records() {
        assert_eq!(record.status, UploadStatus::Done);
        assert_eq!(record.progress, 100);
        assert!(record.error.is_none());
    }
}

#[test]
fn test_record_json_shape() {
    let coordinator_record = serde_json::json!({
        "id": 7,
        "name": "a.txt",
        "progress": 40,
        "status": "UPLOADING"
    });
    let record: UploadRecord = serde_json::from_value(coordinator_record).unwrap();
    assert_eq!(record.status, UploadStatus::Uploading);
    assert_eq!(record.error, None);

    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_begin_batch_returns_fresh_records() {
    let coordinator = UploadCoordinator::default();
    let records = coordinator.begin_batch(&files(&["a.txt", "b.txt"]));

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b.txt"]);
    assert!(records.iter().all(|r| r.progress == 0 && r.status == UploadStatus::Uploading));
    assert_eq!(coordinator.records(), records);
}
