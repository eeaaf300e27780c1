//! OpenShorts service binary.
//!
//! Runs the HTTP API, the job dispatcher, startup recovery, and the
//! artifact reaper in one process.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oshorts_store::{JobStore, RedisJobStore};
use oshorts_tracker::TrackerConfig;
use oshorts_worker::{
    job_queue, recover_jobs, AdmissionController, ArtifactReaper, CredentialVault, Dispatcher,
    JobRunner, WorkerConfig,
};

use oshorts_api::services::wire_collaborators;
use oshorts_api::{create_router, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production.
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("oshorts=info".parse().expect("static directive parses"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting openshorts");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        max_concurrent_jobs = worker_config.max_concurrent_jobs,
        "Loaded configuration"
    );

    let store: Arc<dyn JobStore> = match RedisJobStore::new(&config.redis_url) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Invalid REDIS_URL: {}", e);
            std::process::exit(1);
        }
    };

    let collaborators = match wire_collaborators() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to wire collaborators: {}", e);
            std::process::exit(1);
        }
    };

    let vault = Arc::new(CredentialVault::new(config.gemini_api_key.clone()));
    if !vault.has_default() {
        warn!("GEMINI_API_KEY not set; every submission must carry X-Gemini-Key");
    }

    let (sender, receiver) = job_queue();

    let runner = Arc::new(JobRunner::new(
        Arc::clone(&store),
        worker_config.clone(),
        TrackerConfig::default(),
        Arc::clone(&vault),
        collaborators,
    ));
    let admission = Arc::new(AdmissionController::new(worker_config.max_concurrent_jobs));
    let dispatcher = Dispatcher::new(admission, Arc::clone(&runner), receiver);
    tokio::spawn(dispatcher.run());

    // Requeue jobs the previous process left behind before accepting new
    // submissions.
    match recover_jobs(&store, &sender).await {
        Ok(0) => {}
        Ok(count) => info!(count, "Recovered jobs from previous run"),
        Err(e) => warn!("Startup recovery failed: {}", e),
    }

    let reaper = ArtifactReaper::new(
        Arc::clone(&store),
        worker_config.output_dir.clone(),
        worker_config.reaper_interval,
    );
    tokio::spawn(reaper.run());

    let state = AppState::new(config.clone(), worker_config, store, sender, vault);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
