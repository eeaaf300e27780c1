//! Source video acquisition.
//!
//! URL sources are fetched with yt-dlp; uploaded sources were already
//! spooled by the upload handler and only need moving into the job's work
//! directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use oshorts_models::SourceRef;
use oshorts_worker::{MediaDownloader, WorkerError, WorkerResult};

/// Downloader backed by the yt-dlp binary.
pub struct YtDlpDownloader {
    /// Netscape-format cookies file for authenticated platforms.
    cookies_path: Option<PathBuf>,
}

impl YtDlpDownloader {
    pub fn new(cookies_path: Option<PathBuf>) -> Self {
        Self { cookies_path }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("YTDLP_COOKIES_FILE")
                .ok()
                .map(PathBuf::from)
                .filter(|p| p.exists()),
        )
    }

    async fn fetch_url(&self, url: &str, output: &Path) -> WorkerResult<()> {
        which::which("yt-dlp")
            .map_err(|_| WorkerError::config_error("yt-dlp binary not found on PATH"))?;

        let output_str = output.to_string_lossy();
        let mut args = vec![
            "--no-playlist",
            "-f",
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            "-o",
            &output_str,
        ];

        let cookies = self.cookies_path.as_deref().map(Path::to_string_lossy);
        if let Some(cp) = cookies.as_deref() {
            args.push("--cookies");
            args.push(cp);
        }
        args.push(url);

        debug!(url, "Running yt-dlp");
        let result = Command::new("yt-dlp")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(WorkerError::download_failed(format!(
                "yt-dlp failed: {}",
                stderr.lines().last().unwrap_or("unknown error")
            )));
        }

        if !output.exists() {
            return Err(WorkerError::download_failed("Output file not created"));
        }

        let size = output.metadata()?.len();
        info!(
            output = %output.display(),
            size_mb = size as f64 / (1024.0 * 1024.0),
            "Downloaded source video"
        );
        Ok(())
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download(&self, source: &SourceRef, work_dir: &Path) -> WorkerResult<PathBuf> {
        tokio::fs::create_dir_all(work_dir).await?;
        let target = work_dir.join("source.mp4");

        match source {
            SourceRef::Url(url) => {
                self.fetch_url(url, &target).await?;
            }
            SourceRef::Upload(path) => {
                let spooled = Path::new(path);
                if !spooled.exists() {
                    return Err(WorkerError::download_failed(format!(
                        "Uploaded file missing: {}",
                        spooled.display()
                    )));
                }
                // rename is atomic on the same filesystem; fall back to a
                // copy when the upload dir lives on another mount.
                if tokio::fs::rename(spooled, &target).await.is_err() {
                    tokio::fs::copy(spooled, &target).await?;
                    let _ = tokio::fs::remove_file(spooled).await;
                }
                info!(target = %target.display(), "Moved uploaded source into work dir");
            }
        }

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_source_moves_into_work_dir() {
        let uploads = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        let spooled = uploads.path().join("abc_talk.mp4");
        tokio::fs::write(&spooled, b"video bytes").await.unwrap();

        let downloader = YtDlpDownloader::new(None);
        let source = SourceRef::Upload(spooled.to_string_lossy().into_owned());
        let path = downloader.download(&source, work.path()).await.unwrap();

        assert_eq!(path, work.path().join("source.mp4"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"video bytes");
        assert!(!spooled.exists());
    }

    #[tokio::test]
    async fn test_missing_upload_is_download_failure() {
        let work = tempfile::tempdir().unwrap();
        let downloader = YtDlpDownloader::new(None);
        let source = SourceRef::Upload("/nonexistent/upload.mp4".into());

        let err = downloader.download(&source, work.path()).await.unwrap_err();
        assert!(matches!(err, WorkerError::DownloadFailed(_)));
    }
}
