//! Repository admin handlers

use axum::{extract::State, http::StatusCode, Json};
use repodock_core::{ActivityOverview, CloningStatus};
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::api::extract::AdminForm;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRepoRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRepoRequest {
    #[serde(default)]
    pub name: String,
}

/// POST /admin/repos/create_new_repo
/// Schedule a clone; answers before the clone runs
pub async fn create_new_repo(
    State(state): State<AppState>,
    AdminForm(req): AdminForm<CreateRepoRequest>,
) -> ApiResult<StatusCode> {
    state.dispatcher.request_clone(&req.url).await?;
    Ok(StatusCode::OK)
}

/// POST /admin/repos/delete_repo
/// Schedule a deletion
pub async fn delete_repo(
    State(state): State<AppState>,
    AdminForm(req): AdminForm<DeleteRepoRequest>,
) -> ApiResult<StatusCode> {
    state.dispatcher.request_delete(&req.name).await?;
    Ok(StatusCode::OK)
}

/// GET /admin/repos
pub async fn overview(State(state): State<AppState>) -> ApiResult<Json<ActivityOverview>> {
    Ok(Json(state.reporter.overview().await?))
}

/// GET /admin/repos/cloning
pub async fn cloning(State(state): State<AppState>) -> ApiResult<Json<CloningStatus>> {
    Ok(Json(state.reporter.cloning_status().await?))
}
