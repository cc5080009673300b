//! Operation log handler

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use repodock_core::oplog::MAX_TAIL_LINES;
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TailParams {
    pub lines: Option<usize>,
}

/// GET /admin/log/{file_name}
/// Last lines of an operation log as plain text
pub async fn tail_log(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Query(params): Query<TailParams>,
) -> ApiResult<impl IntoResponse> {
    let lines = state
        .reporter
        .tail_log(&file_name, params.lines.unwrap_or(MAX_TAIL_LINES))?;

    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}
