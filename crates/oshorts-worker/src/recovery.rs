//! Startup recovery.
//!
//! The in-process queue does not survive a restart, but job records in the
//! store do. At startup, every live `queued` job goes back on the queue and
//! every orphaned `processing` job is transitioned back to `queued` with a
//! restart log line, then requeued. Terminal jobs are left alone.

use std::sync::Arc;

use tracing::info;

use oshorts_models::JobStatus;
use oshorts_store::JobStore;

use crate::dispatcher::JobSender;
use crate::error::{WorkerError, WorkerResult};

/// Scan the store and requeue unfinished jobs. Returns how many were
/// put back on the queue.
pub async fn recover_jobs(store: &Arc<dyn JobStore>, queue: &JobSender) -> WorkerResult<usize> {
    let ids = store.scan_ids().await?;
    let mut requeued = 0;

    for id in ids {
        let Some(job) = store.get(&id).await? else {
            // Expired between scan and read.
            continue;
        };

        match job.status {
            JobStatus::Queued => {
                queue
                    .send(id.clone())
                    .map_err(|_| WorkerError::QueueFailed("job queue closed".into()))?;
                requeued += 1;
            }
            JobStatus::Processing => {
                store
                    .update(&id, Box::new(|job| job.requeue_after_restart()))
                    .await?;
                info!(job_id = %id, "Requeued in-flight job after restart");
                queue
                    .send(id.clone())
                    .map_err(|_| WorkerError::QueueFailed("job queue closed".into()))?;
                requeued += 1;
            }
            JobStatus::Completed | JobStatus::Failed => {}
        }
    }

    if requeued > 0 {
        info!(count = requeued, "Recovered unfinished jobs from store");
    }

    Ok(requeued)
}
