//! Persistent job store.
//!
//! Jobs live in Redis under `openshorts:job:{id}` with a 24-hour TTL anchored
//! at creation time. All mutation goes through [`JobStore::update`], which
//! applies a whole-record read-modify-write; under the single-writer-per-job
//! invariant readers always observe either the pre- or post-update snapshot.

mod error;
mod memory;
mod redis_store;
mod retry;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use redis_store::{RedisJobStore, JOB_KEY_PREFIX, JOB_TTL_SECONDS};
pub use retry::{retry_async, RetryConfig, RetryResult};

use async_trait::async_trait;
use oshorts_models::{Job, JobId, JobResult, JobStatus};

/// Store contract for job records.
///
/// The convenience operations mirror the write paths the pipeline needs;
/// they all funnel through `update` so every implementation inherits the
/// same snapshot semantics.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job and start its TTL clock.
    async fn create(&self, job: &Job) -> StoreResult<()>;

    /// Fetch a job snapshot. `None` for unknown or expired ids.
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Apply a mutation to the job record. Returns the updated snapshot,
    /// or `None` if the job does not exist. The closure bound is written
    /// higher-ranked explicitly; the async-trait expansion would otherwise
    /// tie the elided lifetime to the surrounding block.
    async fn update(
        &self,
        id: &JobId,
        mutate: Box<dyn for<'a> FnOnce(&'a mut Job) + Send>,
    ) -> StoreResult<Option<Job>>;

    /// List ids of all live (unexpired) jobs. Used by startup recovery.
    async fn scan_ids(&self) -> StoreResult<Vec<JobId>>;

    /// Verify the store is reachable. Submission checks this up front so an
    /// unreachable store becomes a 503 instead of a job that can never run.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Append a timestamped log line.
    async fn append_log(&self, id: &JobId, message: String) -> StoreResult<()> {
        self.update(id, Box::new(move |job| job.append_log(message)))
            .await?;
        Ok(())
    }

    /// Transition status, setting the lifecycle timestamps.
    async fn set_status(&self, id: &JobId, status: JobStatus, error: Option<String>) -> StoreResult<()> {
        self.update(
            id,
            Box::new(move |job| match status {
                JobStatus::Processing => job.start(),
                JobStatus::Failed => job.fail(error.unwrap_or_else(|| "unknown error".into())),
                // Queued is the initial state; Completed goes through set_result.
                _ => {}
            }),
        )
        .await?;
        Ok(())
    }

    /// Update progress percentage and stage label.
    async fn update_progress(&self, id: &JobId, percentage: u8, stage: String) -> StoreResult<()> {
        self.update(id, Box::new(move |job| job.set_progress(percentage, stage)))
            .await?;
        Ok(())
    }

    /// Publish a (possibly partial) result payload without changing status.
    async fn set_result(&self, id: &JobId, result: JobResult) -> StoreResult<()> {
        self.update(id, Box::new(move |job| job.result = Some(result)))
            .await?;
        Ok(())
    }

    /// Complete the job with its final result payload.
    async fn complete(&self, id: &JobId, result: JobResult) -> StoreResult<()> {
        self.update(id, Box::new(move |job| job.complete(result)))
            .await?;
        Ok(())
    }
}
