//! Tracker error types.

use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("Invalid tracker config: {0}")]
    InvalidConfig(String),
}
