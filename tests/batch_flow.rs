use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use savebot::jobs::{run_batch, BatchConfig, JobRegistry, MediaKind, RetryPolicy, WorkerConfig};
use savebot::link::{parse_range, ChatRef};
use savebot::tests::fakes::{FakeMessage, FakeSource, RecordingDest};
use tempfile::TempDir;

const USER: i64 = 11;
const DEST_CHAT: i64 = -1009999;

fn chat() -> ChatRef {
    ChatRef::Id(-1001234567)
}

fn cfg(dir: &TempDir) -> BatchConfig {
    BatchConfig {
        chunk_size: 2,
        max_concurrency: 2,
        spawn_delay: Duration::ZERO,
        progress_every: 10,
        warn_threshold: 5000,
        worker: WorkerConfig {
            retry: RetryPolicy {
                attempts: 2,
                base_delay: Duration::from_millis(5),
            },
            edit_throttle: Duration::ZERO,
            work_dir: dir.path().to_path_buf(),
        },
    }
}

#[tokio::test]
async fn missing_id_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    // 100-104 exist except 102.
    let mut source = FakeSource::new();
    for id in [100, 101, 103, 104] {
        source = source.with_message(FakeMessage::text(id, &format!("msg {id}")));
    }
    let source = Arc::new(source);
    let dest = Arc::new(RecordingDest::new());
    let registry = JobRegistry::new();

    let summary = run_batch(
        Arc::clone(&source),
        Arc::clone(&dest),
        &registry,
        USER,
        chat(),
        parse_range("100-104").unwrap(),
        DEST_CHAT,
        &cfg(&dir),
    )
    .await
    .unwrap();

    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert!(!summary.cancelled);
    assert!(!registry.is_active(USER));
    assert_eq!(
        dest.text_log().last().unwrap(),
        "Batch complete. Saved 4, failed 1."
    );
}

#[tokio::test]
async fn second_batch_is_rejected_while_one_runs() {
    let dir = TempDir::new().unwrap();
    let registry = JobRegistry::new();
    // Claim the slot as a running batch would.
    let _job = registry.start(USER, 1).unwrap();

    let result = run_batch(
        Arc::new(FakeSource::new()),
        Arc::new(RecordingDest::new()),
        &registry,
        USER,
        chat(),
        parse_range("1-3").unwrap(),
        DEST_CHAT,
        &cfg(&dir),
    )
    .await;

    assert!(result.is_err());
    // The rejected run must not have released the active job's slot.
    assert!(registry.is_active(USER));
}

#[tokio::test]
async fn concurrency_stays_within_the_limit() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::new().with_download_delay(Duration::from_millis(20));
    for id in 1..=6 {
        source = source.with_message(FakeMessage::media(id, MediaKind::Photo, "pic.jpg"));
    }
    let source = Arc::new(source);
    let dest = Arc::new(RecordingDest::new());
    let registry = JobRegistry::new();

    let mut config = cfg(&dir);
    config.chunk_size = 6;
    config.max_concurrency = 2;

    let summary = run_batch(
        Arc::clone(&source),
        Arc::clone(&dest),
        &registry,
        USER,
        chat(),
        parse_range("1-6").unwrap(),
        DEST_CHAT,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(summary.succeeded, 6);
    assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn progress_is_reported_on_cadence() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::new();
    for id in 1..=20 {
        source = source.with_message(FakeMessage::text(id, "m"));
    }
    let dest = Arc::new(RecordingDest::new());
    let registry = JobRegistry::new();

    let mut config = cfg(&dir);
    config.chunk_size = 5;

    run_batch(
        Arc::new(source),
        Arc::clone(&dest),
        &registry,
        USER,
        chat(),
        parse_range("1-20").unwrap(),
        DEST_CHAT,
        &config,
    )
    .await
    .unwrap();

    let edits = dest.status_edits.lock().unwrap();
    assert_eq!(
        edits.as_slice(),
        &[
            "Progress: 10/20 (10 saved, 0 failed)".to_string(),
            "Progress: 20/20 (20 saved, 0 failed)".to_string(),
        ]
    );
    drop(edits);
    // The progress marker is removed once the summary is posted.
    assert_eq!(dest.deleted_statuses.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn large_ranges_warn_but_are_not_clamped() {
    let dir = TempDir::new().unwrap();
    let dest = Arc::new(RecordingDest::new());
    let registry = JobRegistry::new();

    let mut config = cfg(&dir);
    config.chunk_size = 20;
    config.warn_threshold = 10;

    let summary = run_batch(
        Arc::new(FakeSource::new()),
        Arc::clone(&dest),
        &registry,
        USER,
        chat(),
        parse_range("1-20").unwrap(),
        DEST_CHAT,
        &config,
    )
    .await
    .unwrap();

    // Every id was still attempted.
    assert_eq!(summary.attempted, 20);
    let texts = dest.text_log();
    assert!(texts[0].starts_with("That's 20 messages."));
}

#[tokio::test]
async fn cancellation_drains_in_flight_work() {
    let dir = TempDir::new().unwrap();
    let mut source = FakeSource::new().with_download_delay(Duration::from_millis(30));
    for id in 1..=6 {
        source = source.with_message(FakeMessage::media(id, MediaKind::Photo, "pic.jpg"));
    }
    let source = Arc::new(source);
    let dest = Arc::new(RecordingDest::new());
    let registry = Arc::new(JobRegistry::new());

    let mut config = cfg(&dir);
    config.chunk_size = 2;
    config.max_concurrency = 2;

    let runner = {
        let source = Arc::clone(&source);
        let dest = Arc::clone(&dest);
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            run_batch(
                source,
                dest,
                &registry,
                USER,
                chat(),
                parse_range("1-6").unwrap(),
                DEST_CHAT,
                &config,
            )
            .await
        })
    };

    // Let the first chunk get going, then cancel.
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(registry.cancel(USER));

    let summary = runner.await.unwrap().unwrap();
    assert!(summary.cancelled);
    // Later chunks never started.
    assert!(summary.attempted < 6);
    // The registry slot is released after the drain.
    assert!(!registry.is_active(USER));
    assert!(dest
        .text_log()
        .last()
        .unwrap()
        .starts_with("Batch cancelled."));
}
