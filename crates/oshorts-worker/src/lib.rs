//! Job execution for OpenShorts.
//!
//! The dispatcher admits queued jobs into a bounded worker pool in FIFO
//! order; each admitted job runs the five-stage pipeline (download,
//! transcribe, analyze, create clips, finalize) to a terminal state while
//! holding a slot guard that releases exactly once. Startup recovery
//! requeues unfinished jobs from the store, and the artifact reaper keeps
//! the output directory in step with the store's TTL.

mod admission;
mod collaborators;
mod config;
mod dispatcher;
mod error;
mod reaper;
mod recovery;
mod runner;
mod stages;
mod vault;

pub use admission::{AdmissionController, Slot};
pub use collaborators::{
    with_timeout, ClipEncoder, ClipFrames, Collaborators, ContentAnalyzer, EncodeRequest,
    MediaDownloader, SubjectDetector, Transcriber,
};
pub use config::WorkerConfig;
pub use dispatcher::{job_queue, Dispatcher, JobSender};
pub use error::{WorkerError, WorkerResult};
pub use reaper::ArtifactReaper;
pub use recovery::recover_jobs;
pub use runner::{JobRunner, MAX_CLIPS, MIN_CLIPS};
pub use stages::Stage;
pub use vault::CredentialVault;
