//! The retrieval-forward worker: one message in, one terminal outcome out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::link::ChatRef;
use crate::messages;
use crate::session::{DestSession, MediaInfo, NoProgress, ProgressSink, SourceMessage, SourceSession};

use super::outcome::{Delivery, MediaKind, RetrievalOutcome};
use super::progress::{format_progress, ProgressThrottle};
use super::registry::JobHandle;
use super::retry::{run_with_retry, RetryPolicy};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub retry: RetryPolicy,
    pub edit_throttle: Duration,
    pub work_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            edit_throttle: ProgressThrottle::DEFAULT_INTERVAL,
            work_dir: std::env::temp_dir(),
        }
    }
}

/// Processes one message end to end. Never returns an error: every path,
/// including panic-free cleanup of partial files and the status marker,
/// ends in a [`RetrievalOutcome`].
pub async fn process_message<S, D>(
    source: &S,
    dest: &D,
    job: &JobHandle,
    chat: &ChatRef,
    message_id: i32,
    dest_chat: i64,
    cfg: &WorkerConfig,
) -> RetrievalOutcome
where
    S: SourceSession,
    D: DestSession,
{
    if job.is_cancelled() {
        return RetrievalOutcome::Cancelled;
    }
    // Permit held for the whole task; dropped on every return path.
    let Some(_permit) = job.acquire().await else {
        return RetrievalOutcome::Cancelled;
    };
    if job.is_cancelled() {
        return RetrievalOutcome::Cancelled;
    }
    let cancel = job.cancel_token();

    let fetched = run_with_retry(&cfg.retry, cancel, || {
        source.fetch_message(chat, message_id)
    })
    .await;
    let message = match fetched {
        Ok(Some(message)) => message,
        Ok(None) => return RetrievalOutcome::NotFound,
        Err(err) => {
            tracing::warn!(message_id, error = %err, "Fetch failed");
            return outcome_for(err, RetrievalOutcome::TransientError);
        }
    };

    let Some(media) = message.media() else {
        let text = message.text().unwrap_or(messages::EMPTY_MESSAGE_TEXT).to_string();
        let sent = run_with_retry(&cfg.retry, cancel, || dest.send_text(dest_chat, &text)).await;
        return match sent {
            Ok(()) => RetrievalOutcome::Delivered(Delivery::Text),
            Err(err) => {
                tracing::warn!(message_id, error = %err, "Text forward failed");
                outcome_for(err, RetrievalOutcome::UploadFailed)
            }
        };
    };

    let status_id = match dest
        .send_status(dest_chat, &messages::preparing(&media.file_name))
        .await
    {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::debug!(message_id, error = %err, "Status message failed, continuing silently");
            None
        }
    };

    let stem = format!("relay-{dest_chat}-{message_id}");
    let file_path = cfg
        .work_dir
        .join(format!("{stem}-{}", safe_file_name(&media.file_name)));
    let thumb_path = cfg.work_dir.join(format!("{stem}.thumb.jpg"));

    let outcome = relay_media(
        source, dest, cancel, &message, &media, dest_chat, status_id, &file_path, &thumb_path,
        cfg,
    )
    .await;

    // Cleanup on every exit path: partial download, thumbnail, status marker.
    remove_quiet(&file_path).await;
    remove_quiet(&thumb_path).await;
    if let Some(id) = status_id {
        if let Err(err) = dest.delete_status(dest_chat, id).await {
            tracing::debug!(message_id, error = %err, "Status cleanup failed");
        }
    }

    tracing::debug!(message_id, outcome = ?outcome, "Message processed");
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn relay_media<S, D>(
    source: &S,
    dest: &D,
    cancel: &CancellationToken,
    message: &S::Message,
    media: &MediaInfo,
    dest_chat: i64,
    status_id: Option<i32>,
    file_path: &Path,
    thumb_path: &Path,
    cfg: &WorkerConfig,
) -> RetrievalOutcome
where
    S: SourceSession,
    D: DestSession,
{
    let progress: Box<dyn ProgressSink + '_> = match status_id {
        Some(id) => Box::new(StatusProgress {
            dest,
            chat: dest_chat,
            message_id: id,
            label: media.file_name.clone(),
            throttle: Mutex::new(ProgressThrottle::new(cfg.edit_throttle)),
        }),
        None => Box::new(NoProgress),
    };

    let downloaded = run_with_retry(&cfg.retry, cancel, || {
        source.download_media(message, file_path, progress.as_ref(), cancel)
    })
    .await;
    if let Err(err) = downloaded {
        tracing::warn!(error = %err, file = %file_path.display(), "Download failed");
        return outcome_for(err, RetrievalOutcome::DownloadFailed);
    }

    // The throttle may swallow the last chunk's update; always land on 100%.
    if let Some(id) = status_id {
        let _ = dest
            .edit_status(dest_chat, id, &messages::download_complete(&media.file_name))
            .await;
    }

    let thumbnail = if media.kind == MediaKind::Video {
        match source.download_thumbnail(message, thumb_path).await {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(error = %err, "Thumbnail fetch failed, uploading without one");
                None
            }
        }
    } else {
        None
    };

    let caption = message.text().filter(|t| !t.is_empty());
    let uploaded = run_with_retry(&cfg.retry, cancel, || {
        dest.send_media(dest_chat, media.kind, file_path, caption, thumbnail.as_deref())
    })
    .await;
    match uploaded {
        Ok(()) => RetrievalOutcome::Delivered(Delivery::Media(media.kind)),
        Err(err) => {
            tracing::warn!(error = %err, "Upload failed");
            outcome_for(err, RetrievalOutcome::UploadFailed)
        }
    }
}

/// Progress sink that edits the status message, throttled.
struct StatusProgress<'a, D: DestSession> {
    dest: &'a D,
    chat: i64,
    message_id: i32,
    label: String,
    throttle: Mutex<ProgressThrottle>,
}

#[async_trait]
impl<D: DestSession> ProgressSink for StatusProgress<'_, D> {
    async fn report(&self, downloaded: u64, total: Option<u64>) {
        {
            let mut throttle = self.throttle.lock().await;
            if !throttle.ready() {
                return;
            }
        }
        let text = format_progress(&self.label, downloaded, total);
        if let Err(err) = self
            .dest
            .edit_status(self.chat, self.message_id, &text)
            .await
        {
            tracing::debug!(error = %err, "Progress edit failed");
        }
    }
}

fn outcome_for(err: RelayError, fallback: RetrievalOutcome) -> RetrievalOutcome {
    match err {
        RelayError::NotFound => RetrievalOutcome::NotFound,
        RelayError::NoAccess | RelayError::NotLoggedIn => RetrievalOutcome::NoAccess,
        RelayError::FloodWait { retry_after } => RetrievalOutcome::RateLimited { retry_after },
        RelayError::Cancelled => RetrievalOutcome::Cancelled,
        _ => fallback,
    }
}

fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "file.bin".to_string()
    } else {
        cleaned
    }
}

async fn remove_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(error = %err, file = %path.display(), "Failed to remove temp file");
        }
    }
}
