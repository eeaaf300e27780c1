//! Job dispatch loop.
//!
//! One long-lived task pops job ids off the FIFO queue and spawns a runner
//! task per job. The admission permit is acquired before popping so a full
//! pool never reorders the queue; each spawned task owns its slot guard
//! for the whole pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use oshorts_models::JobId;

use crate::admission::AdmissionController;
use crate::runner::JobRunner;

/// Submission side of the job queue.
pub type JobSender = mpsc::UnboundedSender<JobId>;

/// Create the FIFO job queue.
pub fn job_queue() -> (JobSender, mpsc::UnboundedReceiver<JobId>) {
    mpsc::unbounded_channel()
}

/// Admits queued jobs into the worker pool in submission order.
pub struct Dispatcher {
    admission: Arc<AdmissionController>,
    runner: Arc<JobRunner>,
    receiver: mpsc::UnboundedReceiver<JobId>,
}

impl Dispatcher {
    pub fn new(
        admission: Arc<AdmissionController>,
        runner: Arc<JobRunner>,
        receiver: mpsc::UnboundedReceiver<JobId>,
    ) -> Self {
        Self {
            admission,
            runner,
            receiver,
        }
    }

    /// Run until the queue's senders are dropped.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        loop {
            // Permit first, then pop: a full pool must not dequeue the
            // next id and break FIFO admission.
            let permit = match self.admission.acquire_permit().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Admission semaphore closed, dispatcher stopping");
                    break;
                }
            };

            let Some(id) = self.receiver.recv().await else {
                info!("Job queue closed, dispatcher stopping");
                break;
            };

            let slot = match self.admission.register(permit, &id) {
                Ok(slot) => slot,
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Skipping job");
                    continue;
                }
            };

            let runner = Arc::clone(&self.runner);
            tokio::spawn(async move {
                // The slot guard releases on every exit path of this task,
                // panic included.
                let _slot = slot;
                runner.run(&id).await;
            });
        }
    }
}
