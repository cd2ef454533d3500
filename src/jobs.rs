// Per-user job machinery: registry, retry, progress throttling, the
// retrieval-forward worker and the batch orchestrator.

pub mod batch;
pub mod outcome;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod worker;

pub use batch::{run_batch, BatchConfig, BatchSummary};
pub use outcome::{Delivery, MediaKind, RetrievalOutcome};
pub use progress::ProgressThrottle;
pub use registry::{AlreadyActive, JobHandle, JobRegistry, JobTotals};
pub use retry::{run_with_retry, RetryPolicy};
pub use worker::{process_message, WorkerConfig};
