//! Caption error types.

use thiserror::Error;

pub type CaptionResult<T> = Result<T, CaptionError>;

#[derive(Debug, Error)]
pub enum CaptionError {
    /// Settings have captions turned off or style `none`; the runner should
    /// not have asked for a cue track at all.
    #[error("Captions are disabled for this job")]
    Disabled,

    #[error("Transcript has no segments")]
    EmptyTranscript,
}
