//! Gemini content analysis.
//!
//! Sends the timestamped transcript to the Gemini API and parses the
//! returned JSON into segment candidates. Models are tried in order so a
//! preview model being down does not fail the job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use oshorts_models::{SegmentCandidate, Transcript};
use oshorts_worker::{ContentAnalyzer, WorkerError, WorkerResult};

const GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

/// Content analyzer backed by the Gemini API.
pub struct GeminiAnalyzer {
    http: Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: String,
}

/// Shape the prompt asks the model to return.
#[derive(Deserialize)]
struct AnalysisPayload {
    segments: Vec<WireSegment>,
}

#[derive(Deserialize)]
struct WireSegment {
    start_seconds: f64,
    end_seconds: f64,
    title: String,
    #[serde(default)]
    description_tiktok: String,
    #[serde(default)]
    description_instagram: String,
    #[serde(default)]
    description_youtube: String,
}

impl GeminiAnalyzer {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    fn build_prompt(transcript: &Transcript) -> String {
        let mut lines = String::new();
        for segment in &transcript.segments {
            lines.push_str(&format!(
                "[{:.1} - {:.1}] {}\n",
                segment.start,
                segment.end,
                segment.text.trim()
            ));
        }

        format!(
            r#"You are a short-form video editor. From the transcript below, pick the segments most likely to go viral as standalone vertical clips.

Return ONLY a single JSON object with this schema:
{{
  "segments": [
    {{
      "start_seconds": 0.0,
      "end_seconds": 0.0,
      "title": "Punchy clip title",
      "description_tiktok": "TikTok caption with hashtags",
      "description_instagram": "Instagram Reels caption",
      "description_youtube": "YouTube Shorts title/description"
    }}
  ]
}}

Rules:
- Use the exact timestamps from the transcript for start_seconds and end_seconds.
- Each segment must be 20 to 90 seconds long and self-contained.
- Pick 3 to 15 segments, best first.
- Every segment needs a non-empty title and all three descriptions.

TRANSCRIPT:
{lines}"#
        )
    }

    async fn call_model(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| WorkerError::analysis_failed(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::analysis_failed(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let gemini: GeminiResponse = response.json().await.map_err(|e| {
            WorkerError::analysis_failed(format!("Malformed Gemini response: {}", e))
        })?;

        let text = gemini
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| WorkerError::analysis_failed("No content in Gemini response"))?;

        parse_payload(text)
    }
}

impl Default for GeminiAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the model's JSON, tolerating markdown code fences.
fn parse_payload(text: &str) -> WorkerResult<Vec<SegmentCandidate>> {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    let payload: AnalysisPayload = serde_json::from_str(text.trim())
        .map_err(|e| WorkerError::analysis_failed(format!("Bad segments JSON: {}", e)))?;

    Ok(payload
        .segments
        .into_iter()
        .map(|s| SegmentCandidate {
            start: s.start_seconds,
            end: s.end_seconds,
            title: s.title,
            description_tiktok: s.description_tiktok,
            description_instagram: s.description_instagram,
            description_youtube: s.description_youtube,
        })
        .collect())
}

#[async_trait]
impl ContentAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        transcript: &Transcript,
        api_key: &str,
    ) -> WorkerResult<Vec<SegmentCandidate>> {
        let prompt = Self::build_prompt(transcript);

        let mut last_error = None;
        for model in GEMINI_MODELS {
            info!(model, "Requesting segment analysis");
            match self.call_model(model, api_key, &prompt).await {
                Ok(candidates) => {
                    info!(model, count = candidates.len(), "Analysis succeeded");
                    return Ok(candidates);
                }
                Err(e) => {
                    warn!(model, error = %e, "Analysis attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| WorkerError::analysis_failed("All Gemini models failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oshorts_models::TranscriptSegment;

    #[test]
    fn test_parse_payload_with_fences() {
        let text = r#"```json
{"segments": [{"start_seconds": 10.0, "end_seconds": 45.0, "title": "Hook",
  "description_tiktok": "t", "description_instagram": "i", "description_youtube": "y"}]}
```"#;
        let candidates = parse_payload(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Hook");
        assert_eq!(candidates[0].start, 10.0);
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert!(matches!(
            parse_payload("not json at all"),
            Err(WorkerError::AnalysisFailed(_))
        ));
    }

    #[test]
    fn test_prompt_carries_timestamps() {
        let transcript = Transcript {
            segments: vec![TranscriptSegment {
                text: "hello there".into(),
                start: 12.3,
                end: 45.6,
                words: vec![],
            }],
        };
        let prompt = GeminiAnalyzer::build_prompt(&transcript);
        assert!(prompt.contains("[12.3 - 45.6] hello there"));
        assert!(prompt.contains("start_seconds"));
    }
}
