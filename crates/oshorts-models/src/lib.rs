//! Shared data models for the OpenShorts backend.
//!
//! Everything that crosses a crate boundary lives here: the job record
//! persisted in the store, caption settings attached to a submission,
//! transcripts, AI analysis candidates, clip results, and the read-side
//! projections polled by clients.

mod caption;
mod clip;
mod job;
mod projection;
mod segment;
mod transcript;

pub use caption::{CaptionColorError, CaptionSettings, CaptionStyle, CaptionStyleParseError, HexColor};
pub use clip::{ClipResult, JobResult};
pub use job::{Job, JobId, JobParams, JobStatus, SourceRef, MAX_LOG_LINES};
pub use projection::{JobStatusResponse, JobResultResponse, SubmitResponse};
pub use segment::SegmentCandidate;
pub use transcript::{Transcript, TranscriptSegment, Word};
