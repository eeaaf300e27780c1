//! HTTP client for the ML sidecar service.
//!
//! Transcription and per-frame person detection run in a separate process
//! that owns the heavyweight models; this client is the only thing the
//! pipeline knows about it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use oshorts_models::{Transcript, TranscriptSegment, Word};
use oshorts_tracker::{BoundingBox, Detection, FrameDetections};
use oshorts_worker::{ClipFrames, SubjectDetector, Transcriber, WorkerError, WorkerResult};

/// Configuration for the sidecar client.
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Base URL of the ML service
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            // Transcribing a long video can take minutes.
            timeout: Duration::from_secs(900),
        }
    }
}

impl SidecarConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ML_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("ML_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.timeout.as_secs()),
            ),
        }
    }
}

/// Client for the transcription/detection sidecar.
pub struct SidecarClient {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    video_path: &'a str,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    segments: Vec<WireSegment>,
}

#[derive(Deserialize)]
struct WireSegment {
    text: String,
    start: f64,
    end: f64,
    #[serde(default)]
    words: Vec<WireWord>,
}

#[derive(Deserialize)]
struct WireWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    video_path: &'a str,
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct DetectResponse {
    width: u32,
    height: u32,
    fps: f64,
    /// One entry per sampled frame, in order.
    frames: Vec<Vec<WireDetection>>,
}

#[derive(Deserialize)]
struct WireDetection {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    score: f64,
    track_id: u32,
}

impl SidecarClient {
    pub fn new(config: SidecarConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::config_error(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn from_env() -> WorkerResult<Self> {
        Self::new(SidecarConfig::from_env())
    }

    /// Whether the sidecar answers its health endpoint.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("ML sidecar health check failed: {}", e);
                false
            }
        }
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        request: &Req,
        wrap: fn(String) -> WorkerError,
    ) -> WorkerResult<Resp> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url, "Calling ML sidecar");

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| wrap(format!("sidecar request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("sidecar returned {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| wrap(format!("malformed sidecar response: {}", e)))
    }
}

#[async_trait]
impl Transcriber for SidecarClient {
    async fn transcribe(&self, video: &Path) -> WorkerResult<Transcript> {
        let path = video.to_string_lossy();
        let request = TranscribeRequest { video_path: &path };
        let response: TranscribeResponse = self
            .post_json("/transcribe", &request, WorkerError::TranscriptionFailed)
            .await?;

        Ok(Transcript {
            segments: response
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    text: s.text,
                    start: s.start,
                    end: s.end,
                    words: s
                        .words
                        .into_iter()
                        .map(|w| Word {
                            word: w.word,
                            start: w.start,
                            end: w.end,
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl SubjectDetector for SidecarClient {
    async fn detect_subjects(
        &self,
        video: &Path,
        start: f64,
        end: f64,
    ) -> WorkerResult<ClipFrames> {
        let path = video.to_string_lossy();
        let request = DetectRequest {
            video_path: &path,
            start,
            end,
        };
        let response: DetectResponse = self
            .post_json("/detect", &request, WorkerError::DetectionFailed)
            .await?;

        let detections: Vec<FrameDetections> = response
            .frames
            .into_iter()
            .map(|frame| {
                frame
                    .into_iter()
                    .map(|d| {
                        Detection::new(
                            BoundingBox::new(d.x, d.y, d.width, d.height),
                            d.score,
                            d.track_id,
                        )
                    })
                    .collect()
            })
            .collect();

        Ok(ClipFrames {
            width: response.width,
            height: response.height,
            fps: response.fps,
            detections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SidecarConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_detect_response_decodes() {
        let json = r#"{
            "width": 1920, "height": 1080, "fps": 30.0,
            "frames": [
                [{"x": 10.0, "y": 20.0, "width": 100.0, "height": 200.0, "score": 0.9, "track_id": 1}],
                []
            ]
        }"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.frames.len(), 2);
        assert_eq!(response.frames[0][0].track_id, 1);
    }

    #[test]
    fn test_transcribe_response_tolerates_missing_words() {
        let json = r#"{"segments": [{"text": "hi", "start": 0.0, "end": 1.0}]}"#;
        let response: TranscribeResponse = serde_json::from_str(json).unwrap();
        assert!(response.segments[0].words.is_empty());
    }
}
