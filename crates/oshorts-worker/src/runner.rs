//! Pipeline stage runner.
//!
//! Owns one job from admission to its terminal state: five ordered stages,
//! progress and log writes on stage entry, transient-error retry inside
//! stages, partial result publishing as clips land, and terminal writes on
//! both success and failure.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use oshorts_captions::{build_cues, CaptionError, CueTrack};
use oshorts_models::{
    CaptionSettings, ClipResult, Job, JobId, JobResult, JobStatus, SegmentCandidate, Transcript,
};
use oshorts_store::{JobStore, RetryConfig};
use oshorts_tracker::{CropPlacement, SmoothedCameraman, TrackerConfig};

use crate::collaborators::{with_timeout, ClipFrames, Collaborators, EncodeRequest};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::stages::Stage;
use crate::vault::CredentialVault;

/// Most clips produced per job; analysis output beyond this is truncated.
pub const MAX_CLIPS: usize = 15;

/// Fewest usable segments a job may proceed with; below this the
/// analysis stage fails.
pub const MIN_CLIPS: usize = 3;

/// Executes one job's full pipeline.
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    config: WorkerConfig,
    tracker_config: TrackerConfig,
    vault: Arc<CredentialVault>,
    collaborators: Collaborators,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        config: WorkerConfig,
        tracker_config: TrackerConfig,
        vault: Arc<CredentialVault>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            store,
            config,
            tracker_config,
            vault,
            collaborators,
        }
    }

    /// Run the job to a terminal state. Errors become the job's `error`
    /// field; this never returns one to the dispatcher.
    pub async fn run(&self, id: &JobId) {
        info!(job_id = %id, "Starting job");

        match self.execute(id).await {
            Ok(()) => info!(job_id = %id, "Job finished"),
            Err(e) => {
                error!(job_id = %id, error = %e, "Job failed");
                self.vault.forget(id);
                if let Err(write_err) = self
                    .store
                    .set_status(id, JobStatus::Failed, Some(e.to_string()))
                    .await
                {
                    error!(job_id = %id, error = %write_err, "Could not record job failure");
                }
            }
        }
    }

    async fn execute(&self, id: &JobId) -> WorkerResult<()> {
        let Some(job) = self.store.get(id).await? else {
            warn!(job_id = %id, "Job record missing (expired?), skipping");
            return Ok(());
        };
        if job.is_terminal() {
            warn!(job_id = %id, status = %job.status, "Job already terminal, skipping");
            return Ok(());
        }

        // Keys live only in process memory; a requeued job after a restart
        // falls back to the default or fails here.
        let api_key = self.vault.take_key(id)?;

        self.store.set_status(id, JobStatus::Processing, None).await?;
        self.store
            .append_log(id, "Job started by worker.".into())
            .await?;

        let work_dir = self.config.job_output_dir(id.as_str());
        tokio::fs::create_dir_all(&work_dir).await?;

        self.enter_stage(id, Stage::Downloading).await?;
        let source = job.params.source.clone();
        let video = self
            .retrying("download", || {
                with_timeout(
                    "download",
                    self.config.download_timeout,
                    self.collaborators.downloader.download(&source, &work_dir),
                )
            })
            .await?;

        self.enter_stage(id, Stage::Transcribing).await?;
        let transcript = self
            .retrying("transcription", || {
                with_timeout(
                    "transcription",
                    self.config.transcribe_timeout,
                    self.collaborators.transcriber.transcribe(&video),
                )
            })
            .await?;

        self.enter_stage(id, Stage::Analyzing).await?;
        let candidates = self.analyze(id, &transcript, &api_key).await?;

        self.enter_stage(id, Stage::CreatingClips).await?;
        let clips = self
            .create_clips(id, &job, &video, &transcript, &candidates, &work_dir)
            .await?;

        self.enter_stage(id, Stage::Finalizing).await?;
        let result = JobResult {
            clips,
            transcript: Some(transcript),
        };
        self.store.complete(id, result).await?;
        self.store.append_log(id, "Job complete.".into()).await?;

        Ok(())
    }

    async fn enter_stage(&self, id: &JobId, stage: Stage) -> WorkerResult<()> {
        self.store
            .update_progress(id, stage.percent(), stage.label().into())
            .await?;
        self.store
            .append_log(id, format!("{}...", stage.label()))
            .await?;
        Ok(())
    }

    async fn analyze(
        &self,
        id: &JobId,
        transcript: &Transcript,
        api_key: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>> {
        let raw = self
            .retrying("analysis", || {
                with_timeout(
                    "analysis",
                    self.config.analyze_timeout,
                    self.collaborators.analyzer.analyze(transcript, api_key),
                )
            })
            .await?;

        let mut candidates: Vec<SegmentCandidate> =
            raw.into_iter().filter(|c| c.is_usable()).collect();

        if candidates.is_empty() {
            return Err(WorkerError::NoSegmentsFound);
        }
        if candidates.len() < MIN_CLIPS {
            return Err(WorkerError::TooFewSegments(candidates.len(), MIN_CLIPS));
        }
        if candidates.len() > MAX_CLIPS {
            candidates.truncate(MAX_CLIPS);
        }

        self.store
            .append_log(id, format!("Selected {} segments.", candidates.len()))
            .await?;

        Ok(candidates)
    }

    async fn create_clips(
        &self,
        id: &JobId,
        job: &Job,
        video: &Path,
        transcript: &Transcript,
        candidates: &[SegmentCandidate],
        work_dir: &Path,
    ) -> WorkerResult<Vec<ClipResult>> {
        let captions_enabled = job.params.caption_settings.enabled();
        let mut clips = Vec::with_capacity(candidates.len());

        for (i, candidate) in candidates.iter().enumerate() {
            let index = (i + 1) as u32;
            self.store
                .append_log(
                    id,
                    format!("Processing clip {}/{}", index, candidates.len()),
                )
                .await?;

            let frames = self
                .retrying("subject detection", || {
                    with_timeout(
                        "subject detection",
                        self.config.encode_timeout,
                        self.collaborators
                            .detector
                            .detect_subjects(video, candidate.start, candidate.end),
                    )
                })
                .await?;
            let crop_plan = self.build_crop_plan(&frames)?;

            let captions = if captions_enabled {
                self.build_captions(id, &job.params.caption_settings, transcript, candidate)
                    .await?
            } else {
                None
            };

            let filename = format!("clip_{}.mp4", index);
            let output = work_dir.join(&filename);
            self.retrying("encode", || {
                with_timeout(
                    "encode",
                    self.config.encode_timeout,
                    self.collaborators.encoder.encode(EncodeRequest {
                        source: video,
                        start: candidate.start,
                        end: candidate.end,
                        crop_plan: &crop_plan,
                        captions: captions.as_ref(),
                        output: &output,
                    }),
                )
            })
            .await?;

            self.store
                .append_log(id, format!("Clip saved to {}", filename))
                .await?;

            clips.push(ClipResult {
                index,
                video_url: format!("/videos/{}/{}", id, filename),
                title: candidate.title.clone(),
                description_tiktok: candidate.description_tiktok.clone(),
                description_instagram: candidate.description_instagram.clone(),
                description_youtube: candidate.description_youtube.clone(),
            });

            // Pollers see clips as they land, before the job completes.
            self.store
                .set_result(
                    id,
                    JobResult {
                        clips: clips.clone(),
                        transcript: None,
                    },
                )
                .await?;
        }

        Ok(clips)
    }

    fn build_crop_plan(&self, frames: &ClipFrames) -> WorkerResult<Vec<CropPlacement>> {
        let mut cameraman = SmoothedCameraman::new(
            self.tracker_config.clone(),
            frames.width,
            frames.height,
            frames.fps,
        )?;
        Ok(frames
            .detections
            .iter()
            .map(|d| cameraman.track(d))
            .collect())
    }

    async fn build_captions(
        &self,
        id: &JobId,
        settings: &CaptionSettings,
        transcript: &Transcript,
        candidate: &SegmentCandidate,
    ) -> WorkerResult<Option<CueTrack>> {
        let slice = transcript.slice(candidate.start, candidate.end);
        match build_cues(&slice, settings) {
            Ok(track) => {
                if track.degraded {
                    self.store
                        .append_log(
                            id,
                            "Word timestamps unavailable; captions degraded to segment timing."
                                .into(),
                        )
                        .await?;
                }
                Ok(Some(track))
            }
            // A silent stretch of the source; the clip just has no captions.
            Err(CaptionError::EmptyTranscript) => Ok(None),
            Err(CaptionError::Disabled) => Ok(None),
        }
    }

    /// Retry a transient-failing operation with bounded backoff. Fatal
    /// errors escalate immediately.
    async fn retrying<T, F, Fut>(&self, name: &'static str, op: F) -> WorkerResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = WorkerResult<T>>,
    {
        let retry = RetryConfig::new(name);
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let delay = retry.delay_for_attempt(attempt);
                    warn!("{} attempt {} failed, retrying in {:?}: {}", name, attempt, delay, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use oshorts_models::{
        CaptionSettings, CaptionStyle, JobParams, SourceRef, TranscriptSegment, Word,
    };
    use oshorts_store::MemoryJobStore;
    use oshorts_tracker::{BoundingBox, Detection};

    use crate::collaborators::{
        ClipEncoder, ContentAnalyzer, MediaDownloader, SubjectDetector, Transcriber,
    };

    struct StubDownloader;

    #[async_trait]
    impl MediaDownloader for StubDownloader {
        async fn download(&self, _source: &SourceRef, work_dir: &Path) -> WorkerResult<PathBuf> {
            Ok(work_dir.join("source.mp4"))
        }
    }

    struct StubTranscriber;

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, _video: &Path) -> WorkerResult<Transcript> {
            let segments = (0..12)
                .map(|i| {
                    let start = i as f64 * 10.0;
                    TranscriptSegment {
                        text: format!("sentence {}", i),
                        start,
                        end: start + 10.0,
                        words: vec![
                            Word {
                                word: "sentence".into(),
                                start,
                                end: start + 1.0,
                            },
                            Word {
                                word: format!("{}", i),
                                start: start + 1.0,
                                end: start + 2.0,
                            },
                        ],
                    }
                })
                .collect();
            Ok(Transcript { segments })
        }
    }

    struct StubAnalyzer {
        count: usize,
    }

    #[async_trait]
    impl ContentAnalyzer for StubAnalyzer {
        async fn analyze(
            &self,
            _transcript: &Transcript,
            _api_key: &str,
        ) -> WorkerResult<Vec<SegmentCandidate>> {
            Ok((0..self.count)
                .map(|i| SegmentCandidate {
                    start: i as f64 * 10.0,
                    end: i as f64 * 10.0 + 8.0,
                    title: format!("Clip {}", i + 1),
                    description_tiktok: "tiktok".into(),
                    description_instagram: "instagram".into(),
                    description_youtube: "youtube".into(),
                })
                .collect())
        }
    }

    struct FlakyAnalyzer {
        inner: StubAnalyzer,
        failures: AtomicU32,
    }

    #[async_trait]
    impl ContentAnalyzer for FlakyAnalyzer {
        async fn analyze(
            &self,
            transcript: &Transcript,
            api_key: &str,
        ) -> WorkerResult<Vec<SegmentCandidate>> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            }).is_ok() {
                return Err(WorkerError::analysis_failed("upstream hiccup"));
            }
            self.inner.analyze(transcript, api_key).await
        }
    }

    struct StubDetector;

    #[async_trait]
    impl SubjectDetector for StubDetector {
        async fn detect_subjects(
            &self,
            _video: &Path,
            _start: f64,
            _end: f64,
        ) -> WorkerResult<ClipFrames> {
            let det = Detection::new(BoundingBox::new(800.0, 400.0, 200.0, 200.0), 0.9, 1);
            Ok(ClipFrames {
                width: 1920,
                height: 1080,
                fps: 30.0,
                detections: vec![vec![det]; 30],
            })
        }
    }

    /// Records how many clips were already published to the store each
    /// time a new encode starts.
    struct SpyEncoder {
        store: Arc<MemoryJobStore>,
        id: JobId,
        clips_seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ClipEncoder for SpyEncoder {
        async fn encode(&self, _request: EncodeRequest<'_>) -> WorkerResult<()> {
            let published = self
                .store
                .get(&self.id)
                .await
                .unwrap()
                .and_then(|j| j.result)
                .map(|r| r.clips.len())
                .unwrap_or(0);
            self.clips_seen.lock().unwrap().push(published);
            Ok(())
        }
    }

    struct OkEncoder;

    #[async_trait]
    impl ClipEncoder for OkEncoder {
        async fn encode(&self, _request: EncodeRequest<'_>) -> WorkerResult<()> {
            Ok(())
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            output_dir: std::env::temp_dir().join("oshorts-runner-tests"),
            ..WorkerConfig::default()
        }
    }

    async fn queued_job(store: &Arc<MemoryJobStore>, style: CaptionStyle) -> JobId {
        let job = Job::new(JobParams {
            source: SourceRef::Url("https://example.com/talk.mp4".into()),
            caption_settings: CaptionSettings {
                include_captions: true,
                style,
                color: None,
                outline_color: None,
            },
        });
        let id = job.job_id.clone();
        store.create(&job).await.unwrap();
        id
    }

    fn runner(
        store: Arc<MemoryJobStore>,
        analyzer: Arc<dyn ContentAnalyzer>,
        encoder: Arc<dyn ClipEncoder>,
        vault: Arc<CredentialVault>,
    ) -> JobRunner {
        JobRunner::new(
            store,
            test_config(),
            TrackerConfig::default(),
            vault,
            Collaborators {
                downloader: Arc::new(StubDownloader),
                transcriber: Arc::new(StubTranscriber),
                analyzer,
                detector: Arc::new(StubDetector),
                encoder,
            },
        )
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_clamped_clips() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::Classic).await;
        let vault = Arc::new(CredentialVault::new(Some("server-key".into())));

        // Analyzer offers 20 candidates; output is capped at 15.
        let r = runner(
            Arc::clone(&store),
            Arc::new(StubAnalyzer { count: 20 }),
            Arc::new(OkEncoder),
            vault,
        );
        r.run(&id).await;

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percentage, 100);
        assert!(job.error.is_none());

        let result = job.result.expect("completed job has a result");
        assert_eq!(result.clips.len(), MAX_CLIPS);
        assert!(result.transcript.is_some());
        for clip in &result.clips {
            assert!(!clip.title.is_empty());
            assert!(!clip.description_tiktok.is_empty());
            assert!(!clip.description_instagram.is_empty());
            assert!(!clip.description_youtube.is_empty());
            assert!(clip.video_url.starts_with(&format!("/videos/{}/", id)));
        }

        // Stage labels appear in the log in pipeline order.
        let log = job.logs.join("\n");
        let positions: Vec<usize> = Stage::ALL
            .iter()
            .map(|s| log.find(s.label()).expect("stage logged"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_partial_results_published_as_clips_land() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::None).await;
        let vault = Arc::new(CredentialVault::new(Some("server-key".into())));

        let encoder = Arc::new(SpyEncoder {
            store: Arc::clone(&store),
            id: id.clone(),
            clips_seen: Mutex::new(Vec::new()),
        });
        let r = runner(
            Arc::clone(&store),
            Arc::new(StubAnalyzer { count: 4 }),
            Arc::clone(&encoder) as Arc<dyn ClipEncoder>,
            vault,
        );
        r.run(&id).await;

        // Encode N starts with N-1 clips already visible to pollers.
        let seen = encoder.clips_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_segments_is_distinguished_failure() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::Classic).await;
        let vault = Arc::new(CredentialVault::new(Some("server-key".into())));

        let r = runner(
            Arc::clone(&store),
            Arc::new(StubAnalyzer { count: 0 }),
            Arc::new(OkEncoder),
            vault,
        );
        r.run(&id).await;

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("No viral segments found"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_too_few_segments_fails_job() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::Classic).await;
        let vault = Arc::new(CredentialVault::new(Some("server-key".into())));

        // Two usable segments is below the floor; the job must not
        // complete with a thin result.
        let r = runner(
            Arc::clone(&store),
            Arc::new(StubAnalyzer { count: 2 }),
            Arc::new(OkEncoder),
            vault,
        );
        r.run(&id).await;

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("at least 3"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_job() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::Classic).await;
        let vault = Arc::new(CredentialVault::new(None));

        let r = runner(
            Arc::clone(&store),
            Arc::new(StubAnalyzer { count: 3 }),
            Arc::new(OkEncoder),
            vault,
        );
        r.run(&id).await;

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_transient_analysis_failure_is_retried() {
        let store = Arc::new(MemoryJobStore::new());
        let id = queued_job(&store, CaptionStyle::Classic).await;
        let vault = Arc::new(CredentialVault::new(Some("server-key".into())));

        let analyzer = Arc::new(FlakyAnalyzer {
            inner: StubAnalyzer { count: 3 },
            failures: AtomicU32::new(2),
        });
        let r = runner(Arc::clone(&store), analyzer, Arc::new(OkEncoder), vault);
        r.run(&id).await;

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap().clips.len(), 3);
    }
}
