//! Cue track building.
//!
//! Groups transcript words into display cues. Each cue holds the text shown
//! for one display window; karaoke styles additionally carry per-word
//! highlight windows. When word-level timestamps are unavailable, cues fall
//! back to segment granularity.

use serde::{Deserialize, Serialize};
use tracing::warn;

use oshorts_models::{CaptionSettings, Transcript};

use crate::error::{CaptionError, CaptionResult};
use crate::preset::StylePreset;

/// How long one caption stays on screen before the next group starts.
pub const DISPLAY_WINDOW_SECONDS: f64 = 3.0;

/// Highlight window for one word within a cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordWindow {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// One on-screen caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Per-word highlight windows. Empty for non-karaoke styles and for
    /// segment-granularity fallback cues.
    pub words: Vec<WordWindow>,
}

/// Time-aligned cue track handed to the encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueTrack {
    pub style: StylePreset,
    pub cues: Vec<CaptionCue>,
    /// Set when a word-highlight style had to fall back to segment timing.
    pub degraded: bool,
}

/// Build the cue track for one clip's transcript slice.
///
/// Karaoke without word timestamps degrades to per-segment cues and flags
/// the track; the caller logs it but the job carries on.
pub fn build_cues(transcript: &Transcript, settings: &CaptionSettings) -> CaptionResult<CueTrack> {
    let style = StylePreset::resolve(settings)?;

    if transcript.segments.is_empty() {
        return Err(CaptionError::EmptyTranscript);
    }

    let wants_words = settings.style.requires_word_timing();
    let has_words = transcript.has_word_timing();

    if wants_words && !has_words {
        warn!("Word timestamps unavailable, degrading karaoke captions to segment timing");
        return Ok(CueTrack {
            style,
            cues: segment_cues(transcript),
            degraded: true,
        });
    }

    let cues = if has_words {
        word_cues(transcript, wants_words)
    } else {
        segment_cues(transcript)
    };

    Ok(CueTrack {
        style,
        cues,
        degraded: false,
    })
}

/// One cue per transcript segment.
fn segment_cues(transcript: &Transcript) -> Vec<CaptionCue> {
    transcript
        .segments
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| CaptionCue {
            start: s.start,
            end: s.end,
            text: s.text.trim().to_string(),
            words: Vec::new(),
        })
        .collect()
}

/// Group words into display-window cues.
fn word_cues(transcript: &Transcript, keep_word_windows: bool) -> Vec<CaptionCue> {
    let mut cues = Vec::new();
    let mut current: Vec<WordWindow> = Vec::new();

    let flush = |current: &mut Vec<WordWindow>, cues: &mut Vec<CaptionCue>| {
        if current.is_empty() {
            return;
        }
        let start = current[0].start;
        let end = current[current.len() - 1].end;
        let text = current
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let words = if keep_word_windows {
            std::mem::take(current)
        } else {
            current.clear();
            Vec::new()
        };
        cues.push(CaptionCue { start, end, text, words });
    };

    for word in transcript.words() {
        let text = word.word.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(first) = current.first() {
            if word.end - first.start > DISPLAY_WINDOW_SECONDS {
                flush(&mut current, &mut cues);
            }
        }

        current.push(WordWindow {
            text: text.to_string(),
            start: word.start,
            end: word.end,
        });
    }
    flush(&mut current, &mut cues);

    cues
}
