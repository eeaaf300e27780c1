//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    get_job_result, get_job_status, health, process_video, upload_video,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes() as usize;

    let api_routes = Router::new()
        .route("/process", post(process_video))
        .route(
            "/upload",
            post(upload_video)
                // The handler enforces the cap while spooling; the body limit
                // only needs to not cut the stream off first.
                .layer(DefaultBodyLimit::max(upload_limit + 1024 * 1024)),
        )
        .route("/jobs/:job_id", get(get_job_status))
        .route("/jobs/:job_id/result", get(get_job_result));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v2", api_routes)
        // Finished clips are addressed as /videos/{job_id}/{file}.
        .nest_service(
            "/videos",
            ServeDir::new(state.worker_config.output_dir.clone()),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
