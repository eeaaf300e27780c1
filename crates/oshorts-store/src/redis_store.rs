//! Redis-backed job store.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use oshorts_models::{Job, JobId};

use crate::error::{StoreError, StoreResult};
use crate::retry::{retry_async, RetryConfig};
use crate::JobStore;

/// Key namespace shared with the artifact reaper: a job's record and its
/// output directory are both addressed by the job id.
pub const JOB_KEY_PREFIX: &str = "openshorts:job:";

/// 24 hours from submission, regardless of how often the record is written.
pub const JOB_TTL_SECONDS: u64 = 24 * 60 * 60;

/// Job store backed by Redis. Writes retry with bounded backoff so a
/// brief Redis hiccup mid-job does not fail the pipeline.
pub struct RedisJobStore {
    client: redis::Client,
    retry: RetryConfig,
}

impl RedisJobStore {
    /// Create a store from a Redis URL. Fails fast if the URL is malformed;
    /// connectivity is checked per operation (and via [`JobStore::ping`]).
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::unavailable(format!("invalid Redis URL: {}", e)))?;
        Ok(Self {
            client,
            retry: RetryConfig::new("redis"),
        })
    }

    async fn connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }

    fn key(id: &JobId) -> String {
        format!("{}{}", JOB_KEY_PREFIX, id)
    }

    fn decode(id: &JobId, payload: String) -> StoreResult<Job> {
        serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }

    async fn create(&self, job: &Job) -> StoreResult<()> {
        let key = Self::key(&job.job_id);
        let payload = serde_json::to_string(job)?;
        retry_async(&self.retry, StoreError::is_transient, || async {
            let mut conn = self.connection().await?;
            // EX anchors the TTL at creation; later writes use KEEPTTL.
            conn.set_ex::<_, _, ()>(&key, &payload, JOB_TTL_SECONDS)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
        .into_result()?;
        debug!(job_id = %job.job_id, "Created job record");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn.get(Self::key(id)).await?;
        match payload {
            Some(p) => Ok(Some(Self::decode(id, p)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: &JobId,
        mutate: Box<dyn for<'a> FnOnce(&'a mut Job) + Send>,
    ) -> StoreResult<Option<Job>> {
        let key = Self::key(id);

        let payload = retry_async(&self.retry, StoreError::is_transient, || async {
            let mut conn = self.connection().await?;
            Ok::<_, StoreError>(conn.get::<_, Option<String>>(&key).await?)
        })
        .await
        .into_result()?;
        let Some(payload) = payload else {
            return Ok(None);
        };

        let mut job = Self::decode(id, payload)?;
        // The mutation is FnOnce, so it runs exactly once; only the
        // surrounding reads and writes are replayed on transient errors.
        mutate(&mut job);
        let updated = serde_json::to_string(&job)?;

        retry_async(&self.retry, StoreError::is_transient, || async {
            let mut conn = self.connection().await?;
            // KEEPTTL preserves the expiry set at creation, so the 24-hour
            // window stays anchored to submission time.
            redis::cmd("SET")
                .arg(&key)
                .arg(&updated)
                .arg("KEEPTTL")
                .query_async::<()>(&mut conn)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
        .into_result()?;

        Ok(Some(job))
    }

    async fn scan_ids(&self) -> StoreResult<Vec<JobId>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", JOB_KEY_PREFIX);

        let mut ids = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                if let Some(id) = key.strip_prefix(JOB_KEY_PREFIX) {
                    ids.push(JobId::from_string(id));
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(ids)
    }
}
