//! Job-description endpoint.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use talentiq_common::TalentiqError;
use talentiq_db::JobDescription;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub weights: Option<Map<String, Value>>,
    #[serde(default)]
    pub custom_rubric: Option<String>,
}

/// POST /api/v1/llm/job-description/{project_id} — create or update the
/// project's JD.
pub async fn save_job_description(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(request): Json<JobDescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if request.title.trim().is_empty() || request.description.trim().is_empty() {
        return Err(ApiError(TalentiqError::Validation(
            "title and description are required".to_string(),
        )));
    }

    state.projects().get_or_create(&project_id).await?;

    let mut jd = JobDescription::new(&project_id, request.title, request.description);
    jd.prompt = request.prompt;
    jd.weights = request.weights;
    jd.custom_rubric = request.custom_rubric;

    let saved = state.job_descriptions().create_or_update(jd).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "signal": "job_description_saved",
            "project_id": project_id,
            "title": saved.title,
        })),
    ))
}
