//! Screening endpoint: buffered JSON or NDJSON streaming, full or smart.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use talentiq_common::TalentiqError;
use talentiq_screening::ScreenOptions;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ScreenQuery {
    #[serde(default = "default_smart")]
    pub smart: bool,
    #[serde(default)]
    pub stream: bool,
}

fn default_smart() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    #[serde(default)]
    pub file_ids: Option<Vec<String>>,
    #[serde(default = "default_min_top_count")]
    pub min_top_count: usize,
    #[serde(default = "default_anonymize")]
    pub anonymize: bool,
}

fn default_min_top_count() -> usize {
    5
}

fn default_anonymize() -> bool {
    true
}

/// POST /api/v1/llm/screen/{project_id}?smart=&stream=
pub async fn screen(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Query(query): Query<ScreenQuery>,
    Json(request): Json<ScreenRequest>,
) -> Result<Response, ApiError> {
    let core = state.screening_core();
    let options = ScreenOptions {
        file_ids: request.file_ids.clone(),
        min_top_count: request.min_top_count,
        anonymize: request.anonymize,
    };

    if query.stream {
        let lines = if query.smart {
            core.smart_screen_stream(&project_id, options).await?
        } else {
            core.screen_stream(&project_id, request.file_ids, request.anonymize)
                .await?
        };

        let body = Body::from_stream(lines.map(Ok::<String, Infallible>));
        return Response::builder()
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .map_err(|e| ApiError(TalentiqError::Internal(e.to_string())));
    }

    let results = if query.smart {
        core.smart_screen(&project_id, &options).await?
    } else {
        core.full_screen(&project_id, options.file_ids.as_deref(), options.anonymize)
            .await?
    };

    Ok(Json(json!({
        "signal": "screening_complete",
        "project_id": project_id,
        "total_screened": results.len(),
        "results": results,
    }))
    .into_response())
}
