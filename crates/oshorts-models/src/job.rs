//! The job record persisted in the store.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::caption::CaptionSettings;
use crate::clip::JobResult;

/// Log lines kept per job. Older lines are dropped from the front once the
/// cap is reached so a chatty pipeline cannot grow a record without bound.
pub const MAX_LOG_LINES: usize = 1000;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state.
///
/// Transitions are monotone: `Queued -> Processing -> {Completed | Failed}`.
/// Nothing ever moves a job backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for an admission slot
    #[default]
    Queued,
    /// Owned by a worker, pipeline running
    Processing,
    /// Pipeline finished, result populated
    Completed,
    /// Pipeline aborted, error populated
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SourceRef {
    /// Remote URL to fetch (direct link or platform URL)
    Url(String),
    /// Path of a file already spooled to the upload directory
    Upload(String),
}

/// Submission parameters carried on the job record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobParams {
    /// Source video reference
    pub source: SourceRef,
    /// Caption options
    pub caption_settings: CaptionSettings,
}

/// A video-to-clips job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub job_id: JobId,

    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Submission parameters
    pub params: JobParams,

    /// Progress percentage (0-100, non-decreasing)
    #[serde(default)]
    pub progress_percentage: u8,

    /// Human-readable stage label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_stage: Option<String>,

    /// Append-only timestamped log lines
    #[serde(default)]
    pub logs: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Set once, when a worker takes ownership
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set once, on reaching a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message, populated iff status is Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Result payload, populated iff status is Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(params: JobParams) -> Self {
        let job_id = JobId::new();
        let logs = vec![log_line(format!("Job {} queued.", job_id))];
        Self {
            job_id,
            status: JobStatus::Queued,
            params,
            progress_percentage: 0,
            progress_stage: None,
            logs,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
        }
    }

    /// Mark the job as owned by a worker. Sets `started_at` exactly once.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Mark the job as completed with its result payload.
    pub fn complete(&mut self, result: JobResult) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.progress_percentage = 100;
        self.progress_stage = Some("Complete".into());
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Mark the job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = JobStatus::Failed;
        self.append_log(format!("Job failed: {}", error));
        self.error = Some(error);
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Update progress. The percentage never decreases.
    pub fn set_progress(&mut self, percentage: u8, stage: impl Into<String>) {
        self.progress_percentage = self.progress_percentage.max(percentage.min(100));
        self.progress_stage = Some(stage.into());
    }

    /// Append a timestamped log line, dropping the oldest past the cap.
    pub fn append_log(&mut self, message: impl Into<String>) {
        self.logs.push(log_line(message.into()));
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..excess);
        }
    }

    /// Return to the queue after a worker restart. Progress is kept; the
    /// status transition back to Queued is the one deliberate exception to
    /// monotonicity, taken only by startup recovery before any worker owns
    /// the job again.
    pub fn requeue_after_restart(&mut self) {
        self.status = JobStatus::Queued;
        self.append_log("Worker restarted; job requeued.");
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn log_line(message: String) -> String {
    format!("[{}] {}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionSettings;

    fn params() -> JobParams {
        JobParams {
            source: SourceRef::Url("https://example.com/video.mp4".into()),
            caption_settings: CaptionSettings::default(),
        }
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new(params());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress_percentage, 0);
        assert!(job.started_at.is_none());
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.logs.len(), 1);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut job = Job::new(params());

        job.start();
        assert_eq!(job.status, JobStatus::Processing);
        let started = job.started_at;
        assert!(started.is_some());

        // start() is idempotent on the timestamp
        job.start();
        assert_eq!(job.started_at, started);

        job.complete(JobResult::default());
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percentage, 100);
        assert!(job.result.is_some());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_fail_sets_error_and_log() {
        let mut job = Job::new(params());
        job.start();
        job.fail("download exploded");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("download exploded"));
        assert!(job.completed_at.is_some());
        assert!(job.logs.iter().any(|l| l.contains("download exploded")));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = Job::new(params());
        job.set_progress(50, "AI analysis");
        job.set_progress(30, "Transcribing audio");
        assert_eq!(job.progress_percentage, 50);
        // stage label still follows the latest write
        assert_eq!(job.progress_stage.as_deref(), Some("Transcribing audio"));
    }

    #[test]
    fn test_log_cap() {
        let mut job = Job::new(params());
        for i in 0..(MAX_LOG_LINES + 50) {
            job.append_log(format!("line {}", i));
        }
        assert_eq!(job.logs.len(), MAX_LOG_LINES);
        assert!(job.logs.last().unwrap().contains(&format!("line {}", MAX_LOG_LINES + 49)));
    }

    #[test]
    fn test_serde_round_trip() {
        let job = Job::new(params());
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id, job.job_id);
        assert_eq!(back.status, JobStatus::Queued);
    }
}
