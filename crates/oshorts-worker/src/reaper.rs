//! Artifact reaper.
//!
//! Clip files live under `output/{job_id}/` while the job record lives in
//! the store with a 24-hour TTL. The reaper periodically deletes output
//! directories whose record has expired, so artifacts share the job's
//! lifetime without their own bookkeeping.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use oshorts_models::JobId;
use oshorts_store::JobStore;

use crate::error::WorkerResult;

pub struct ArtifactReaper {
    store: Arc<dyn JobStore>,
    output_dir: PathBuf,
    interval: Duration,
}

impl ArtifactReaper {
    pub fn new(store: Arc<dyn JobStore>, output_dir: PathBuf, interval: Duration) -> Self {
        Self {
            store,
            output_dir,
            interval,
        }
    }

    /// Periodic sweep loop. Never returns; run it as its own task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so startup recovery
        // finishes before the first sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Reaped expired job artifacts"),
                Err(e) => warn!(error = %e, "Artifact sweep failed"),
            }
        }
    }

    /// Delete output directories whose job record no longer exists.
    pub async fn sweep(&self) -> WorkerResult<usize> {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            // No output yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };

            let id = JobId::from_string(name);
            if self.store.get(&id).await?.is_none() {
                tokio::fs::remove_dir_all(entry.path()).await?;
                info!(job_id = %id, "Removed artifacts for expired job");
                removed += 1;
            }
        }

        Ok(removed)
    }
}
