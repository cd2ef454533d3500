use std::time::Duration;

use savebot::error::RelayError;
use savebot::jobs::{
    process_message, Delivery, JobHandle, MediaKind, RetrievalOutcome, RetryPolicy, WorkerConfig,
};
use savebot::link::ChatRef;
use savebot::tests::fakes::{FakeMessage, FakeSource, RecordingDest};
use tempfile::TempDir;

const DEST_CHAT: i64 = -1009999;

fn chat() -> ChatRef {
    ChatRef::Handle("examplechan".to_string())
}

fn cfg(dir: &TempDir) -> WorkerConfig {
    WorkerConfig {
        retry: RetryPolicy {
            attempts: 4,
            base_delay: Duration::from_millis(10),
        },
        edit_throttle: Duration::from_millis(400),
        work_dir: dir.path().to_path_buf(),
    }
}

fn dir_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn text_message_is_forwarded() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_message(FakeMessage::text(1, "hello there"));
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let outcome = process_message(&source, &dest, &job, &chat(), 1, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::Delivered(Delivery::Text));
    assert_eq!(dest.text_log(), vec!["hello there".to_string()]);
    // Text forwards never post a status marker.
    assert!(dest.statuses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn media_message_is_uploaded_and_cleaned_up() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new()
        .with_message(FakeMessage::media(7, MediaKind::Video, "clip.mp4").with_caption("nice"))
        .with_thumbnail();
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let outcome = process_message(&source, &dest, &job, &chat(), 7, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(
        outcome,
        RetrievalOutcome::Delivered(Delivery::Media(MediaKind::Video))
    );
    let media = dest.media.lock().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].kind, MediaKind::Video);
    assert_eq!(media[0].caption.as_deref(), Some("nice"));
    assert!(media[0].thumbnail.is_some());
    assert_eq!(media[0].bytes, b"0123456789abcdef");
    drop(media);

    // Status marker posted, then removed; temp files gone.
    assert_eq!(dest.statuses.lock().unwrap().len(), 1);
    assert_eq!(dest.deleted_statuses.lock().unwrap().as_slice(), &[1]);
    assert!(dir_is_empty(&dir));
}

#[tokio::test]
async fn final_progress_edit_lands_on_100_percent() {
    let dir = TempDir::new().unwrap();
    let source =
        FakeSource::new().with_message(FakeMessage::media(7, MediaKind::Document, "notes.pdf"));
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    process_message(&source, &dest, &job, &chat(), 7, DEST_CHAT, &cfg(&dir)).await;

    let edits = dest.status_edits.lock().unwrap();
    assert!(!edits.is_empty());
    assert_eq!(edits.last().unwrap(), "Downloading notes.pdf... 100%");
}

#[tokio::test]
async fn missing_message_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new();
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let outcome = process_message(&source, &dest, &job, &chat(), 42, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::NotFound);
    assert!(dest.text_log().is_empty());
    assert!(dest.media.lock().unwrap().is_empty());
}

#[tokio::test]
async fn access_errors_are_not_retried() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_fetch_errors(vec![RelayError::NoAccess]);
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let outcome = process_message(&source, &dest, &job, &chat(), 42, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::NoAccess);
    assert_eq!(
        source.fetches.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn download_retry_exhaustion_leaves_no_file() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new()
        .with_message(FakeMessage::media(7, MediaKind::Document, "big.bin"))
        .with_download_errors(vec![
            RelayError::Transport("net".into()),
            RelayError::Transport("net".into()),
            RelayError::Transport("net".into()),
            RelayError::Transport("net".into()),
        ]);
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let outcome = process_message(&source, &dest, &job, &chat(), 7, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::DownloadFailed);
    assert_eq!(
        source.downloads_started.load(std::sync::atomic::Ordering::SeqCst),
        4
    );
    assert!(dest.media.lock().unwrap().is_empty());
    // Status marker cleaned up even on failure, nothing left on disk.
    assert_eq!(dest.deleted_statuses.lock().unwrap().len(), 1);
    assert!(dir_is_empty(&dir));
}

#[tokio::test(start_paused = true)]
async fn flood_wait_exhaustion_maps_to_rate_limited() {
    let dir = TempDir::new().unwrap();
    let wait = Duration::from_secs(5);
    let source = FakeSource::new()
        .with_message(FakeMessage::media(7, MediaKind::Document, "big.bin"))
        .with_download_errors(vec![
            RelayError::FloodWait { retry_after: wait },
            RelayError::FloodWait { retry_after: wait },
            RelayError::FloodWait { retry_after: wait },
            RelayError::FloodWait { retry_after: wait },
        ]);
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);

    let started = tokio::time::Instant::now();
    let outcome = process_message(&source, &dest, &job, &chat(), 7, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::RateLimited { retry_after: wait });
    // Three full waits between the four attempts, observable on the fake clock.
    assert_eq!(started.elapsed(), Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn upload_flood_wait_is_waited_out() {
    let dir = TempDir::new().unwrap();
    let source =
        FakeSource::new().with_message(FakeMessage::media(7, MediaKind::Photo, "pic.jpg"));
    let dest = RecordingDest::new().with_upload_errors(vec![RelayError::FloodWait {
        retry_after: Duration::from_secs(3),
    }]);
    let job = JobHandle::standalone(1);

    let started = tokio::time::Instant::now();
    let outcome = process_message(&source, &dest, &job, &chat(), 7, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(
        outcome,
        RetrievalOutcome::Delivered(Delivery::Media(MediaKind::Photo))
    );
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(dir_is_empty(&dir));
}

#[tokio::test]
async fn cancelled_job_exits_before_touching_the_source() {
    let dir = TempDir::new().unwrap();
    let source = FakeSource::new().with_message(FakeMessage::text(1, "hello"));
    let dest = RecordingDest::new();
    let job = JobHandle::standalone(1);
    job.cancel_token().cancel();

    let outcome = process_message(&source, &dest, &job, &chat(), 1, DEST_CHAT, &cfg(&dir)).await;

    assert_eq!(outcome, RetrievalOutcome::Cancelled);
    assert_eq!(source.fetches.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_download_cleans_up() {
    let dir = TempDir::new().unwrap();
    let source = std::sync::Arc::new(
        FakeSource::new()
            .with_message(FakeMessage::media(7, MediaKind::Document, "big.bin"))
            .with_download_delay(Duration::from_millis(50)),
    );
    let dest = std::sync::Arc::new(RecordingDest::new());
    let job = JobHandle::standalone(1);

    let canceller = job.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        canceller.cancel_token().cancel();
    });

    let cfg = cfg(&dir);
    let outcome = process_message(&*source, &*dest, &job, &chat(), 7, DEST_CHAT, &cfg).await;

    assert_eq!(outcome, RetrievalOutcome::Cancelled);
    assert!(dest.media.lock().unwrap().is_empty());
    assert!(dir_is_empty(&dir));
}
