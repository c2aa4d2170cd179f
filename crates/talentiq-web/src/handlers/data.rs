//! Upload and processing endpoints.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use talentiq_common::TalentiqError;
use talentiq_db::Project;
use talentiq_ingestion::IncomingFile;

use crate::error::ApiError;
use crate::state::SharedState;

fn validate_project_id(project_id: &str) -> Result<(), ApiError> {
    if Project::is_valid_id(project_id) {
        Ok(())
    } else {
        Err(ApiError(TalentiqError::Validation(format!(
            "project_id must be alphanumeric, got '{project_id}'"
        ))))
    }
}

/// POST /api/v1/data/upload/{project_id} — multipart bundle of résumés
/// and/or archives.
pub async fn upload(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    validate_project_id(&project_id)?;
    state.projects().get_or_create(&project_id).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TalentiqError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| field.name().unwrap_or("file").to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| TalentiqError::Validation(format!("failed to read upload: {e}")))?;

        files.push(IncomingFile { name, content_type, bytes: bytes.to_vec() });
    }

    if files.is_empty() {
        return Err(ApiError(TalentiqError::Validation(
            "upload contained no files".to_string(),
        )));
    }

    let assets = state
        .upload_expander()
        .expand_and_store(&project_id, files)
        .await?;

    let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
    let total_bytes: i64 = assets.iter().map(|a| a.size_bytes).sum();
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "signal": "upload_complete",
            "project_id": project_id,
            "files": names,
            "count": assets.len(),
            "total_size_mb": total_bytes as f64 / (1024.0 * 1024.0),
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ProcessResumesRequest {
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub do_reset: bool,
}

/// POST /api/v1/llm/process-resumes/{project_id} — extract, structure,
/// chunk, and vectorize.
pub async fn process_resumes(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
    Json(request): Json<ProcessResumesRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_project_id(&project_id)?;
    state.projects().get_or_create(&project_id).await?;

    let report = state
        .ingestion_engine()
        .process_and_store(&project_id, &request.file_ids, request.do_reset)
        .await?;

    Ok(Json(json!({
        "signal": "resumes_processed",
        "project_id": project_id,
        "processed": report.processed,
        "chunks_created": report.chunks_created,
        "errors": report.errors,
    })))
}

/// DELETE /api/v1/data/project/{project_id} — drop the project, every
/// row it owns, its stored files, and its vector collection.
pub async fn delete_project(
    State(state): State<SharedState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validate_project_id(&project_id)?;

    state.projects().delete_cascade(&project_id).await?;
    state.indexer.delete_collection(&project_id).await?;

    let asset_dir = std::path::Path::new(&state.settings.storage.upload_dir).join(&project_id);
    if asset_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&asset_dir).await {
            tracing::warn!(project_id, error = %e, "Failed to remove asset directory");
        }
    }

    Ok(Json(json!({
        "signal": "project_deleted",
        "project_id": project_id,
    })))
}
