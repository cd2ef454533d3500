//! At most one active batch job per user.
//!
//! The registry is an explicit shared object injected into handlers, never
//! a global. Handles are cheap to clone and carry everything a spawned
//! task needs: the cancellation token, the concurrency limiter and the
//! shared counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::outcome::RetrievalOutcome;

/// The user already has a job running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a job is already running for this user")]
pub struct AlreadyActive;

#[derive(Debug, Default)]
struct JobCounters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of a job's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTotals {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct JobHandle {
    cancel: CancellationToken,
    limiter: Arc<Semaphore>,
    counters: Arc<JobCounters>,
}

impl JobHandle {
    /// A handle not tracked by any registry, for one-off single-message
    /// jobs.
    pub fn standalone(concurrency: usize) -> Self {
        Self {
            cancel: CancellationToken::new(),
            limiter: Arc::new(Semaphore::new(concurrency)),
            counters: Arc::new(JobCounters::default()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Acquires a concurrency permit, or `None` if the job is cancelled
    /// while waiting. The permit is held for the lifetime of the task.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            permit = Arc::clone(&self.limiter).acquire_owned() => permit.ok(),
        }
    }

    /// Folds a finished task's outcome into the counters. Cancelled tasks
    /// count as attempted but neither succeeded nor failed.
    pub fn record(&self, outcome: &RetrievalOutcome) {
        self.counters.attempted.fetch_add(1, Ordering::Relaxed);
        if outcome.is_delivered() {
            self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        } else if !outcome.is_cancelled() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn totals(&self) -> JobTotals {
        JobTotals {
            attempted: self.counters.attempted.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
pub struct JobRegistry {
    active: Mutex<HashMap<i64, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the user's job slot. Rejects with [`AlreadyActive`] when a
    /// job is still registered for this user.
    pub fn start(&self, user_id: i64, concurrency: usize) -> Result<JobHandle, AlreadyActive> {
        let mut active = self.active.lock().unwrap();
        if active.contains_key(&user_id) {
            return Err(AlreadyActive);
        }
        let handle = JobHandle::standalone(concurrency);
        active.insert(user_id, handle.clone());
        tracing::info!(user_id, concurrency, "Job registered");
        Ok(handle)
    }

    /// Trips the job's cancellation token. Returns whether a job was
    /// active. The slot stays claimed until the orchestrator finishes
    /// draining and calls [`JobRegistry::finish`].
    pub fn cancel(&self, user_id: i64) -> bool {
        let active = self.active.lock().unwrap();
        match active.get(&user_id) {
            Some(handle) => {
                handle.cancel.cancel();
                tracing::info!(user_id, "Job cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Releases the user's slot. Idempotent: finishing an already-released
    /// job is a no-op.
    pub fn finish(&self, user_id: i64) {
        let removed = self.active.lock().unwrap().remove(&user_id);
        if removed.is_some() {
            tracing::info!(user_id, "Job released");
        }
    }

    pub fn is_active(&self, user_id: i64) -> bool {
        self.active.lock().unwrap().contains_key(&user_id)
    }
}
