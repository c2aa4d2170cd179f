//! Ad-hoc vector search and collection inspection.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchVectorsRequest {
    pub query_text: String,
    #[serde(default = "default_k")]
    pub k: u64,
}

fn default_k() -> u64 {
    5
}

/// POST /api/v1/vectors/candidate/search/{project_id}
pub async fn search(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(request): Json<SearchVectorsRequest>,
) -> Result<Json<Value>, ApiError> {
    let hits = state
        .indexer
        .search(&project_id, &request.query_text, request.k)
        .await?;
    Ok(Json(json!({ "results": hits })))
}

/// GET /api/v1/vectors/candidate/info/{project_id}
pub async fn info(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let info = state.indexer.collection_info(&project_id).await?;
    Ok(Json(json!({ "collection_info": info })))
}
