//! Shared application state.

use std::sync::Arc;

use oshorts_store::JobStore;
use oshorts_worker::{CredentialVault, JobSender, WorkerConfig};

use crate::config::ApiConfig;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub worker_config: Arc<WorkerConfig>,
    pub store: Arc<dyn JobStore>,
    pub queue: JobSender,
    pub vault: Arc<CredentialVault>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        worker_config: WorkerConfig,
        store: Arc<dyn JobStore>,
        queue: JobSender,
        vault: Arc<CredentialVault>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            worker_config: Arc::new(worker_config),
            store,
            queue,
            vault,
        }
    }
}
