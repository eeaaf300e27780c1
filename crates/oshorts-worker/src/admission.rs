//! Admission control.
//!
//! A counting semaphore caps concurrent jobs and an active set rejects
//! double admission of the same id. The dispatcher acquires a permit
//! before popping the queue so admission order stays FIFO. The permit and
//! the active-set entry live in a [`Slot`] guard and release exactly once
//! on every exit path, including panic unwind.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use oshorts_models::JobId;

use crate::error::{WorkerError, WorkerResult};

/// Caps concurrent job executions.
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    active: Arc<Mutex<HashSet<JobId>>>,
}

impl AdmissionController {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Wait for a free worker slot. Called before popping the queue so the
    /// next job id is not held hostage by a full pool.
    pub async fn acquire_permit(&self) -> WorkerResult<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::QueueFailed("admission semaphore closed".into()))
    }

    /// Bind a permit to a job id, producing the slot guard. Fails if the
    /// job is already running.
    pub fn register(&self, permit: OwnedSemaphorePermit, id: &JobId) -> WorkerResult<Slot> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(id.clone()) {
            return Err(WorkerError::AlreadyActive(id.to_string()));
        }
        debug!(job_id = %id, "Acquired worker slot");

        Ok(Slot {
            _permit: permit,
            id: id.clone(),
            active: Arc::clone(&self.active),
        })
    }

    /// Jobs currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Free slots remaining.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Scoped ownership of one worker slot. Dropping it releases the permit
/// and removes the job from the active set, on success, failure, or panic.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    id: JobId,
    active: Arc<Mutex<HashSet<JobId>>>,
}

impl Slot {
    pub fn job_id(&self) -> &JobId {
        &self.id
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.id);
        debug!(job_id = %self.id, "Released worker slot");
    }
}
