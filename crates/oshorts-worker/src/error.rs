//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("AI analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Subject detection failed: {0}")]
    DetectionFailed(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("No viral segments found")]
    NoSegmentsFound,

    #[error("Only {0} usable segment(s) found; at least {1} are required")]
    TooFewSegments(usize, usize),

    #[error("API key not available; supply one with the request or configure a default")]
    MissingCredential,

    #[error("Job {0} is already being processed")]
    AlreadyActive(String),

    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, std::time::Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue operation failed: {0}")]
    QueueFailed(String),

    #[error("Store error: {0}")]
    Store(#[from] oshorts_store::StoreError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] oshorts_tracker::TrackerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether retrying with backoff can plausibly succeed. Exhausted
    /// retries escalate to job failure.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::DownloadFailed(_)
            | WorkerError::TranscriptionFailed(_)
            | WorkerError::AnalysisFailed(_)
            | WorkerError::DetectionFailed(_)
            | WorkerError::EncodingFailed(_)
            | WorkerError::Timeout(_, _)
            | WorkerError::Io(_) => true,
            WorkerError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}
