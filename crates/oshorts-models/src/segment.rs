//! Candidate segments returned by the content-analysis collaborator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One viral-segment candidate with its generated copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentCandidate {
    /// Start time in seconds within the source video
    pub start: f64,
    /// End time in seconds within the source video
    pub end: f64,
    /// Suggested title for the clip
    pub title: String,
    /// Short-form description (TikTok)
    pub description_tiktok: String,
    /// Reel description (Instagram)
    pub description_instagram: String,
    /// Long-form title (YouTube Shorts)
    pub description_youtube: String,
}

impl SegmentCandidate {
    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// A candidate is usable when its window is positive and it has a title.
    pub fn is_usable(&self) -> bool {
        self.end > self.start && !self.title.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usability() {
        let good = SegmentCandidate {
            start: 10.0,
            end: 40.0,
            title: "The moment everything changed".into(),
            description_tiktok: "watch till the end".into(),
            description_instagram: "full story on the channel".into(),
            description_youtube: "The Moment Everything Changed".into(),
        };
        assert!(good.is_usable());
        assert!((good.duration() - 30.0).abs() < 1e-9);

        let inverted = SegmentCandidate { start: 40.0, end: 10.0, ..good.clone() };
        assert!(!inverted.is_usable());

        let untitled = SegmentCandidate { title: "  ".into(), ..good };
        assert!(!untitled.is_usable());
    }
}
