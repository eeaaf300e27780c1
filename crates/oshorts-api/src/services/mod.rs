//! Production collaborator implementations.

mod downloader;
mod encoder;
mod gemini;
mod sidecar;

pub use downloader::YtDlpDownloader;
pub use encoder::FfmpegEncoder;
pub use gemini::GeminiAnalyzer;
pub use sidecar::{SidecarClient, SidecarConfig};

use std::sync::Arc;

use oshorts_worker::{Collaborators, WorkerResult};

/// Wire the production collaborators from the environment. The sidecar
/// client is shared between transcription and detection.
pub fn wire_collaborators() -> WorkerResult<Collaborators> {
    let sidecar = Arc::new(SidecarClient::from_env()?);
    Ok(Collaborators {
        downloader: Arc::new(YtDlpDownloader::from_env()),
        transcriber: Arc::clone(&sidecar) as Arc<dyn oshorts_worker::Transcriber>,
        analyzer: Arc::new(GeminiAnalyzer::new()),
        detector: sidecar,
        encoder: Arc::new(FfmpegEncoder::new()),
    })
}
