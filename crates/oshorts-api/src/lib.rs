//! HTTP surface and service wiring for OpenShorts.
//!
//! One process runs the axum API, the dispatcher, startup recovery, and
//! the artifact reaper. Submissions are validated here; everything past
//! the queue boundary lives in the worker crate.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
