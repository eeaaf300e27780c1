//! Transcript shapes returned by the transcription collaborator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single word with its timing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Word {
    pub word: String,
    /// Start time in seconds from clip start
    pub start: f64,
    /// End time in seconds from clip start
    pub end: f64,
}

/// A sentence-level transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    /// Word-level timings, empty if the engine produced none
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Word-level timed text for a whole source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Transcript {
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Flatten all word timings across segments.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.segments.iter().flat_map(|s| s.words.iter())
    }

    /// Whether any segment carries word-level timing.
    pub fn has_word_timing(&self) -> bool {
        self.segments.iter().any(|s| !s.words.is_empty())
    }

    /// Segments overlapping the given time window, rebased to the window start.
    pub fn slice(&self, start: f64, end: f64) -> Transcript {
        let segments = self
            .segments
            .iter()
            .filter(|s| s.end > start && s.start < end)
            .map(|s| TranscriptSegment {
                text: s.text.clone(),
                start: (s.start - start).max(0.0),
                end: (s.end - start).min(end - start),
                words: s
                    .words
                    .iter()
                    .filter(|w| w.end > start && w.start < end)
                    .map(|w| Word {
                        word: w.word.clone(),
                        start: (w.start - start).max(0.0),
                        end: (w.end - start).min(end - start),
                    })
                    .collect(),
            })
            .collect();
        Transcript { segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        Transcript {
            segments: vec![
                TranscriptSegment {
                    text: "hello world".into(),
                    start: 0.0,
                    end: 2.0,
                    words: vec![
                        Word { word: "hello".into(), start: 0.0, end: 0.8 },
                        Word { word: "world".into(), start: 1.0, end: 1.8 },
                    ],
                },
                TranscriptSegment {
                    text: "second segment".into(),
                    start: 5.0,
                    end: 8.0,
                    words: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_word_timing_detection() {
        assert!(transcript().has_word_timing());

        let bare = Transcript {
            segments: vec![TranscriptSegment {
                text: "no words".into(),
                start: 0.0,
                end: 1.0,
                words: vec![],
            }],
        };
        assert!(!bare.has_word_timing());
    }

    #[test]
    fn test_slice_rebases_times() {
        let sliced = transcript().slice(1.0, 6.0);
        assert_eq!(sliced.segments.len(), 2);

        // First segment clipped at window start: 0.0..1.0 in rebased time
        assert_eq!(sliced.segments[0].start, 0.0);
        assert!((sliced.segments[0].end - 1.0).abs() < 1e-9);
        // Only "world" survives the window
        assert_eq!(sliced.segments[0].words.len(), 1);
        assert_eq!(sliced.segments[0].words[0].word, "world");

        // Second segment starts at 4.0 rebased
        assert!((sliced.segments[1].start - 4.0).abs() < 1e-9);
    }
}
