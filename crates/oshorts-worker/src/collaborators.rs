//! Collaborator seams.
//!
//! The pipeline's external dependencies (download, transcription, content
//! analysis, subject detection, encoding) are narrow async traits. Tests
//! run the runner against hand-written stubs; production wires concrete
//! implementations at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use oshorts_captions::CueTrack;
use oshorts_models::{SegmentCandidate, SourceRef, Transcript};
use oshorts_tracker::{CropPlacement, FrameDetections};

use crate::error::{WorkerError, WorkerResult};

/// Fetches the source video onto local disk.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Resolve the source into a local file under `work_dir`.
    async fn download(&self, source: &SourceRef, work_dir: &Path) -> WorkerResult<PathBuf>;
}

/// Produces a transcript with word-level timestamps when available.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, video: &Path) -> WorkerResult<Transcript>;
}

/// Picks viral segment candidates from a transcript.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// `api_key` is the per-job credential resolved at admission.
    async fn analyze(
        &self,
        transcript: &Transcript,
        api_key: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>>;
}

/// Per-frame subject detections for one clip's time range.
#[derive(Debug, Clone)]
pub struct ClipFrames {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub detections: Vec<FrameDetections>,
}

/// Detects subjects frame-by-frame within a clip range.
#[async_trait]
pub trait SubjectDetector: Send + Sync {
    async fn detect_subjects(&self, video: &Path, start: f64, end: f64)
        -> WorkerResult<ClipFrames>;
}

/// Everything the encoder needs to produce one clip file.
#[derive(Debug)]
pub struct EncodeRequest<'a> {
    pub source: &'a Path,
    pub start: f64,
    pub end: f64,
    /// One placement per analyzed frame, in order.
    pub crop_plan: &'a [CropPlacement],
    pub captions: Option<&'a CueTrack>,
    pub output: &'a Path,
}

/// Renders the final clip file.
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    async fn encode(&self, request: EncodeRequest<'_>) -> WorkerResult<()>;
}

/// The pipeline's collaborator implementations, wired once at startup.
pub struct Collaborators {
    pub downloader: Arc<dyn MediaDownloader>,
    pub transcriber: Arc<dyn Transcriber>,
    pub analyzer: Arc<dyn ContentAnalyzer>,
    pub detector: Arc<dyn SubjectDetector>,
    pub encoder: Arc<dyn ClipEncoder>,
}

/// Bound a collaborator call. An elapsed timeout is a transient failure of
/// the surrounding stage.
pub async fn with_timeout<T>(
    name: &'static str,
    limit: Duration,
    fut: impl std::future::Future<Output = WorkerResult<T>>,
) -> WorkerResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout(name, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout("fast", Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result: WorkerResult<()> =
            with_timeout("slow", Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(WorkerError::Timeout(name, _)) => assert_eq!(name, "slow"),
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(WorkerError::Timeout("x", Duration::from_secs(1)).is_transient());
    }
}
