//! In-memory credential vault.
//!
//! Per-request API keys are held in process memory only, keyed by job id.
//! They are never written to the store, so a requeued job after a restart
//! falls back to the configured default key or fails with a distinguished
//! error.

use std::collections::HashMap;
use std::sync::Mutex;

use oshorts_models::JobId;

use crate::error::{WorkerError, WorkerResult};

/// Holds per-job API keys and the optional server default.
pub struct CredentialVault {
    keys: Mutex<HashMap<JobId, String>>,
    default_key: Option<String>,
}

impl CredentialVault {
    pub fn new(default_key: Option<String>) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            default_key,
        }
    }

    /// Whether a submission without its own key can still run.
    pub fn has_default(&self) -> bool {
        self.default_key.is_some()
    }

    /// Remember a per-request key for a job.
    pub fn store_key(&self, id: &JobId, key: String) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.insert(id.clone(), key);
    }

    /// Take the job's key, falling back to the default. Removes the
    /// per-job entry so keys do not outlive their job.
    pub fn take_key(&self, id: &JobId) -> WorkerResult<String> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(key) = keys.remove(id) {
            return Ok(key);
        }
        self.default_key
            .clone()
            .ok_or(WorkerError::MissingCredential)
    }

    /// Drop a job's key without using it (terminal failure before launch).
    pub fn forget(&self, id: &JobId) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        keys.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_job_key_wins_and_is_consumed() {
        let vault = CredentialVault::new(Some("default".into()));
        let id = JobId::from_string("j1");

        vault.store_key(&id, "override".into());
        assert_eq!(vault.take_key(&id).unwrap(), "override");
        // Second take falls back to the default.
        assert_eq!(vault.take_key(&id).unwrap(), "default");
    }

    #[test]
    fn test_missing_key_and_no_default_errors() {
        let vault = CredentialVault::new(None);
        let id = JobId::from_string("j2");
        assert!(matches!(
            vault.take_key(&id),
            Err(WorkerError::MissingCredential)
        ));
    }
}
