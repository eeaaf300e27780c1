//! Result payloads for completed jobs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// One produced clip. Immutable once written into a job's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipResult {
    /// Ordinal index within the job (1-based, matches the output filename)
    pub index: u32,
    /// Serving URL scoped under the job id, e.g. `/videos/{job_id}/{file}`
    pub video_url: String,
    /// AI-generated title
    pub title: String,
    /// Short-form description (TikTok)
    pub description_tiktok: String,
    /// Reel description (Instagram)
    pub description_instagram: String,
    /// Long-form title (YouTube Shorts)
    pub description_youtube: String,
}

/// The result payload of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct JobResult {
    #[serde(default)]
    pub clips: Vec<ClipResult>,
    /// Source transcript, kept for editor/subtitle features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
}

impl JobResult {
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
