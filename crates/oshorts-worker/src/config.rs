//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs processed concurrently
    pub max_concurrent_jobs: usize,
    /// Directory where per-job clip artifacts are written
    pub output_dir: PathBuf,
    /// Timeout for the download collaborator
    pub download_timeout: Duration,
    /// Timeout for the transcription collaborator
    pub transcribe_timeout: Duration,
    /// Timeout for the content-analysis collaborator
    pub analyze_timeout: Duration,
    /// Timeout for encoding one clip
    pub encode_timeout: Duration,
    /// How often the artifact reaper checks for expired jobs
    pub reaper_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            output_dir: PathBuf::from("output"),
            download_timeout: Duration::from_secs(600),
            transcribe_timeout: Duration::from_secs(900),
            analyze_timeout: Duration::from_secs(300),
            encode_timeout: Duration::from_secs(600),
            reaper_interval: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            download_timeout: Duration::from_secs(env_parse(
                "DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout.as_secs(),
            )),
            transcribe_timeout: Duration::from_secs(env_parse(
                "TRANSCRIBE_TIMEOUT_SECS",
                defaults.transcribe_timeout.as_secs(),
            )),
            analyze_timeout: Duration::from_secs(env_parse(
                "ANALYZE_TIMEOUT_SECS",
                defaults.analyze_timeout.as_secs(),
            )),
            encode_timeout: Duration::from_secs(env_parse(
                "ENCODE_TIMEOUT_SECS",
                defaults.encode_timeout.as_secs(),
            )),
            reaper_interval: Duration::from_secs(env_parse(
                "REAPER_INTERVAL_SECS",
                defaults.reaper_interval.as_secs(),
            )),
        }
    }

    /// Artifact directory for one job.
    pub fn job_output_dir(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(job_id)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
