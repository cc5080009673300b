//! API Module
//!
//! HTTP API layer for repository administration.

pub mod error;
pub mod extract;
pub mod health;
pub mod log;
pub mod repos;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Provisioning
        .route("/admin/repos", get(repos::overview))
        .route("/admin/repos/cloning", get(repos::cloning))
        .route("/admin/repos/create_new_repo", post(repos::create_new_repo))
        .route("/admin/repos/delete_repo", post(repos::delete_repo))
        // Operation logs
        .route("/admin/log/{file_name}", get(log::tail_log))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
