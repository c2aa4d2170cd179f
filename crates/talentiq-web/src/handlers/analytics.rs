//! Usage analytics endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/v1/analytics/summary/{project_id} — grand totals plus
/// per-action and per-model breakdown.
pub async fn summary(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.usage.project_summary(&project_id).await?;
    Ok(Json(serde_json::to_value(summary).map_err(talentiq_common::TalentiqError::from)?))
}

/// GET /api/v1/analytics/files/{project_id} — per-file usage breakdown.
pub async fn files(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let files = state.usage.usage_by_file(&project_id).await?;
    Ok(Json(json!({ "project_id": project_id, "files": files })))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

/// GET /api/v1/analytics/logs/{project_id} — paginated raw rows.
pub async fn logs(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 200);
    let result = state.usage.list_paginated(&project_id, page, page_size).await?;
    Ok(Json(serde_json::to_value(result).map_err(talentiq_common::TalentiqError::from)?))
}
