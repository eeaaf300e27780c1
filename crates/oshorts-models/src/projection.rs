//! Read-side projections of the job record.
//!
//! Pure mappings from [`Job`] to the externally polled JSON shapes. No
//! mutation happens here; callers read whole-record snapshots from the store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clip::JobResult;
use crate::job::Job;

/// Immediate response to a submission.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: String,
}

/// Polling shape for job status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress_percentage: u8,
    pub progress_stage: Option<String>,
    pub logs: Vec<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub error: Option<String>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            status: job.status.to_string(),
            progress_percentage: job.progress_percentage,
            progress_stage: job.progress_stage.clone(),
            logs: job.logs.clone(),
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            error: job.error.clone(),
        }
    }
}

/// Polling shape for job results. For a non-completed job `result` is null
/// and `status` reports where the job currently is.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobResultResponse {
    pub job_id: String,
    pub status: String,
    pub result: Option<JobResult>,
    pub completed_at: Option<String>,
}

impl From<&Job> for JobResultResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            status: job.status.to_string(),
            result: job.result.clone(),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}
