//! In-memory job store.
//!
//! Used by tests and by local development without a Redis instance. Applies
//! the same whole-record snapshot semantics as the Redis store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use oshorts_models::{Job, JobId};

use crate::error::StoreResult;
use crate::JobStore;

/// Job store backed by a process-local map. No TTL enforcement; records
/// live until the process exits.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records. Test helper.
    pub fn len(&self) -> usize {
        self.jobs.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        jobs.insert(job.job_id.to_string(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        Ok(jobs.get(id.as_str()).cloned())
    }

    async fn update(
        &self,
        id: &JobId,
        mutate: Box<dyn for<'a> FnOnce(&'a mut Job) + Send>,
    ) -> StoreResult<Option<Job>> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        match jobs.get_mut(id.as_str()) {
            Some(job) => {
                mutate(job);
                Ok(Some(job.clone()))
            }
            None => Ok(None),
        }
    }

    async fn scan_ids(&self) -> StoreResult<Vec<JobId>> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        Ok(jobs.keys().map(JobId::from_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oshorts_models::{CaptionSettings, JobParams, JobStatus, SourceRef};

    fn job() -> Job {
        Job::new(JobParams {
            source: SourceRef::Url("https://example.com/v.mp4".into()),
            caption_settings: CaptionSettings::default(),
        })
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let store = MemoryJobStore::new();
        let job = job();
        let id = job.job_id.clone();

        store.create(&job).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().status, JobStatus::Queued);

        let updated = store
            .update(&id, Box::new(|j| j.start()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert!(updated.started_at.is_some());
    }

    #[tokio::test]
    async fn test_update_through_trait_object() {
        let store = MemoryJobStore::new();
        let job = job();
        let id = job.job_id.clone();
        store.create(&job).await.unwrap();

        // Callers hold `Arc<dyn JobStore>`; the mutation closure must be
        // usable through the trait object.
        let dyn_store: &dyn JobStore = &store;
        let updated = dyn_store
            .update(&id, Box::new(|j| j.set_progress(30, "Transcribing audio")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.progress_percentage, 30);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryJobStore::new();
        let missing = JobId::new();
        let result = store.update(&missing, Box::new(|j| j.start())).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_convenience_ops() {
        let store = MemoryJobStore::new();
        let job = job();
        let id = job.job_id.clone();
        store.create(&job).await.unwrap();

        store.set_status(&id, JobStatus::Processing, None).await.unwrap();
        store
            .update_progress(&id, 30, "Transcribing audio".into())
            .await
            .unwrap();
        store.append_log(&id, "transcript ready".into()).await.unwrap();

        let snapshot = store.get(&id).await.unwrap().unwrap();
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.progress_percentage, 30);
        assert!(snapshot.logs.iter().any(|l| l.contains("transcript ready")));
    }
}
