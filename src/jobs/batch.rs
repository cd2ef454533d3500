//! The batch orchestrator: chunked fan-out over a message-id range.

use std::sync::Arc;
use std::time::Duration;

use crate::link::{ChatRef, MessageRange};
use crate::messages;
use crate::session::{DestSession, SourceSession};

use super::progress::ProgressThrottle;
use super::registry::{AlreadyActive, JobRegistry, JobTotals};
use super::worker::{process_message, WorkerConfig};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Ids per chunk; chunk N+1 starts only after chunk N drains.
    pub chunk_size: usize,
    /// Concurrent tasks within a chunk.
    pub max_concurrency: usize,
    /// Pause between task creations, to stay under the API's radar.
    pub spawn_delay: Duration,
    /// Progress message cadence, in processed ids.
    pub progress_every: u64,
    /// Ranges longer than this get a warning, never a clamp.
    pub warn_threshold: u64,
    pub worker: WorkerConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 75,
            max_concurrency: 4,
            spawn_delay: Duration::from_millis(150),
            progress_every: 10,
            warn_threshold: 5000,
            worker: WorkerConfig::default(),
        }
    }
}

/// Final tally of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: bool,
}

impl From<(JobTotals, bool)> for BatchSummary {
    fn from((totals, cancelled): (JobTotals, bool)) -> Self {
        Self {
            attempted: totals.attempted,
            succeeded: totals.succeeded,
            failed: totals.failed,
            cancelled,
        }
    }
}

/// Runs a whole range through the worker under a registered job.
///
/// Claims the user's job slot up front and releases it on every exit
/// path. Cancellation is cooperative: checked before each chunk and each
/// task creation, and in-flight tasks are drained, never aborted.
pub async fn run_batch<S, D>(
    source: Arc<S>,
    dest: Arc<D>,
    registry: &JobRegistry,
    user_id: i64,
    chat: ChatRef,
    range: MessageRange,
    dest_chat: i64,
    cfg: &BatchConfig,
) -> Result<BatchSummary, AlreadyActive>
where
    S: SourceSession + 'static,
    D: DestSession + 'static,
{
    let job = registry.start(user_id, cfg.max_concurrency)?;
    tracing::info!(
        user_id,
        chat = %chat,
        first = range.first(),
        last = range.last(),
        total = range.len(),
        "Batch started"
    );

    let summary = drive(source, dest, &job, chat, range, dest_chat, cfg).await;
    registry.finish(user_id);

    tracing::info!(
        user_id,
        succeeded = summary.succeeded,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "Batch finished"
    );
    Ok(summary)
}

async fn drive<S, D>(
    source: Arc<S>,
    dest: Arc<D>,
    job: &super::registry::JobHandle,
    chat: ChatRef,
    range: MessageRange,
    dest_chat: i64,
    cfg: &BatchConfig,
) -> BatchSummary
where
    S: SourceSession + 'static,
    D: DestSession + 'static,
{
    let total = range.len();
    if total > cfg.warn_threshold {
        tracing::warn!(total, threshold = cfg.warn_threshold, "Very large range requested");
        let _ = dest
            .send_text(dest_chat, &messages::large_range_warning(total))
            .await;
    }

    let progress_id = match dest
        .send_status(dest_chat, &messages::batch_progress(0, total, 0, 0))
        .await
    {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::debug!(error = %err, "Batch progress message failed");
            None
        }
    };
    let mut throttle = ProgressThrottle::new(cfg.worker.edit_throttle);

    'chunks: for (start, end) in chunk_bounds(range, cfg.chunk_size) {
        if job.is_cancelled() {
            break 'chunks;
        }

        let mut tasks = Vec::with_capacity((end - start) as usize + 1);
        for message_id in start..=end {
            if job.is_cancelled() {
                break;
            }
            let source = Arc::clone(&source);
            let dest = Arc::clone(&dest);
            let job = job.clone();
            let chat = chat.clone();
            let worker_cfg = cfg.worker.clone();
            tasks.push(tokio::spawn(async move {
                process_message(
                    &*source,
                    &*dest,
                    &job,
                    &chat,
                    message_id,
                    dest_chat,
                    &worker_cfg,
                )
                .await
            }));
            tokio::time::sleep(cfg.spawn_delay).await;
        }

        // Drain the whole chunk, cancelled or not.
        for task in tasks {
            match task.await {
                Ok(outcome) => job.record(&outcome),
                Err(err) => {
                    tracing::error!(error = %err, "Worker task panicked");
                    job.record(&super::outcome::RetrievalOutcome::TransientError);
                }
            }
            let totals = job.totals();
            if totals.attempted % cfg.progress_every == 0 && throttle.ready() {
                if let Some(id) = progress_id {
                    let _ = dest
                        .edit_status(
                            dest_chat,
                            id,
                            &messages::batch_progress(
                                totals.attempted,
                                total,
                                totals.succeeded,
                                totals.failed,
                            ),
                        )
                        .await;
                }
            }
        }
    }

    let cancelled = job.is_cancelled();
    let totals = job.totals();
    if let Some(id) = progress_id {
        let _ = dest.delete_status(dest_chat, id).await;
    }
    let _ = dest
        .send_text(
            dest_chat,
            &messages::batch_summary(totals.succeeded, totals.failed, cancelled),
        )
        .await;

    BatchSummary::from((totals, cancelled))
}

/// Inclusive per-chunk id bounds, computed on the fly. A range can span
/// billions of ids, so the id list is never materialized.
fn chunk_bounds(range: MessageRange, chunk_size: usize) -> impl Iterator<Item = (i32, i32)> {
    let size = chunk_size.max(1) as i64;
    let first = i64::from(range.first());
    let last = i64::from(range.last());
    (0..)
        .map(move |i| first + i * size)
        .take_while(move |start| *start <= last)
        .map(move |start| (start as i32, (start + size - 1).min(last) as i32))
}
