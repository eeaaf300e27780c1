//! Caption styling and cue building.
//!
//! Resolves a submission's caption settings into a concrete [`StylePreset`]
//! and turns a transcript into a time-aligned [`CueTrack`] for the encoder.
//! Style names and color overrides are validated at the submission boundary;
//! by the time this crate runs, settings are well-formed and the only
//! remaining degradation is karaoke without word-level timestamps.

mod cue;
mod error;
mod preset;

pub use cue::{build_cues, CaptionCue, CueTrack, WordWindow, DISPLAY_WINDOW_SECONDS};
pub use error::{CaptionError, CaptionResult};
pub use preset::{FontWeight, StylePreset, TextCase};
