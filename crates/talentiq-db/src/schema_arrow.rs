//! Arrow schema and conversion utilities for LanceDB.
//!
//! Record batch conversion for every table. Timestamps are stored as
//! RFC 3339 strings and nested maps as JSON strings, which keeps the
//! schemas flat and the filters simple.

use crate::error::{DbError, Result};
use crate::schema::*;
use arrow_array::{Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

// ── Shared column readers ─────────────────────────────────────────────────────

fn get_string(batch: &RecordBatch, col: usize, row: usize) -> Result<String> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Utf8")))?;
    Ok(arr.value(row).to_string())
}

fn get_opt_string(batch: &RecordBatch, col: usize, row: usize) -> Result<Option<String>> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Utf8")))?;
    if arr.is_null(row) {
        Ok(None)
    } else {
        Ok(Some(arr.value(row).to_string()))
    }
}

fn get_i64(batch: &RecordBatch, col: usize, row: usize) -> Result<i64> {
    let arr = batch
        .column(col)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DbError::Arrow(format!("column {col} is not Int64")))?;
    Ok(arr.value(row))
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s).map_err(|e| DbError::InvalidQuery(e.to_string()))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json_map(raw: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

// =============================================================================
// Project
// =============================================================================

pub fn project_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

pub fn project_to_record(project: &Project) -> Result<RecordBatch> {
    RecordBatch::try_new(
        project_schema(),
        vec![
            Arc::new(StringArray::from(vec![project.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![project.project_id.as_str()])),
            Arc::new(StringArray::from(vec![project.created_at.to_rfc3339()])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_project(batch: &RecordBatch, row: usize) -> Result<Project> {
    Ok(Project {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        created_at: parse_timestamp(&get_string(batch, 2, row)?),
    })
}

// =============================================================================
// Asset
// =============================================================================

pub fn asset_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("mime_type", DataType::Utf8, false),
        Field::new("size_bytes", DataType::Int64, false),
        Field::new("url", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

pub fn asset_to_record(asset: &Asset) -> Result<RecordBatch> {
    RecordBatch::try_new(
        asset_schema(),
        vec![
            Arc::new(StringArray::from(vec![asset.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![asset.project_id.as_str()])),
            Arc::new(StringArray::from(vec![asset.name.as_str()])),
            Arc::new(StringArray::from(vec![asset.mime_type.as_str()])),
            Arc::new(Int64Array::from(vec![asset.size_bytes])),
            Arc::new(StringArray::from(vec![asset.url.as_str()])),
            Arc::new(StringArray::from(vec![asset.created_at.to_rfc3339()])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_asset(batch: &RecordBatch, row: usize) -> Result<Asset> {
    Ok(Asset {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        name: get_string(batch, 2, row)?,
        mime_type: get_string(batch, 3, row)?,
        size_bytes: get_i64(batch, 4, row)?,
        url: get_string(batch, 5, row)?,
        created_at: parse_timestamp(&get_string(batch, 6, row)?),
    })
}

// =============================================================================
// Resume
// =============================================================================

pub fn resume_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("file_id", DataType::Utf8, false),
        Field::new("candidate_name", DataType::Utf8, false),
        Field::new("contact_info", DataType::Utf8, false),
        Field::new("full_content", DataType::Utf8, false),
        Field::new("parsed_data", DataType::Utf8, false),
        Field::new("extraction_method", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

pub fn resume_to_record(resume: &Resume) -> Result<RecordBatch> {
    let contact_info = serde_json::to_string(&resume.contact_info)?;
    let parsed_data = serde_json::to_string(&resume.parsed_data)?;
    RecordBatch::try_new(
        resume_schema(),
        vec![
            Arc::new(StringArray::from(vec![resume.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![resume.project_id.as_str()])),
            Arc::new(StringArray::from(vec![resume.file_id.as_str()])),
            Arc::new(StringArray::from(vec![resume.candidate_name.as_str()])),
            Arc::new(StringArray::from(vec![contact_info])),
            Arc::new(StringArray::from(vec![resume.full_content.as_str()])),
            Arc::new(StringArray::from(vec![parsed_data])),
            Arc::new(StringArray::from(vec![resume.extraction_method.as_str()])),
            Arc::new(StringArray::from(vec![resume.created_at.to_rfc3339()])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_resume(batch: &RecordBatch, row: usize) -> Result<Resume> {
    Ok(Resume {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        file_id: get_string(batch, 2, row)?,
        candidate_name: get_string(batch, 3, row)?,
        contact_info: parse_json_map(&get_string(batch, 4, row)?),
        full_content: get_string(batch, 5, row)?,
        parsed_data: parse_json_map(&get_string(batch, 6, row)?),
        extraction_method: ExtractionMethod::from_str(&get_string(batch, 7, row)?),
        created_at: parse_timestamp(&get_string(batch, 8, row)?),
    })
}

// =============================================================================
// Chunk
// =============================================================================

pub fn chunk_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("chunk_order", DataType::Int64, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

pub fn chunk_to_record(chunk: &Chunk) -> Result<RecordBatch> {
    let metadata = serde_json::to_string(&chunk.metadata)?;
    RecordBatch::try_new(
        chunk_schema(),
        vec![
            Arc::new(StringArray::from(vec![chunk.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![chunk.project_id.as_str()])),
            Arc::new(StringArray::from(vec![chunk.content.as_str()])),
            Arc::new(StringArray::from(vec![metadata])),
            Arc::new(Int64Array::from(vec![chunk.chunk_order])),
            Arc::new(StringArray::from(vec![chunk.created_at.to_rfc3339()])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn chunks_to_record(chunks: &[Chunk]) -> Result<RecordBatch> {
    let ids: Vec<String> = chunks.iter().map(|c| c.id.to_string()).collect();
    let project_ids: Vec<&str> = chunks.iter().map(|c| c.project_id.as_str()).collect();
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let metadata: Vec<String> = chunks
        .iter()
        .map(|c| serde_json::to_string(&c.metadata))
        .collect::<std::result::Result<_, _>>()?;
    let orders: Vec<i64> = chunks.iter().map(|c| c.chunk_order).collect();
    let created: Vec<String> = chunks.iter().map(|c| c.created_at.to_rfc3339()).collect();

    RecordBatch::try_new(
        chunk_schema(),
        vec![
            Arc::new(StringArray::from(ids)) as Arc<dyn Array>,
            Arc::new(StringArray::from(project_ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(metadata)),
            Arc::new(Int64Array::from(orders)),
            Arc::new(StringArray::from(created)),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_chunk(batch: &RecordBatch, row: usize) -> Result<Chunk> {
    let raw_metadata = get_string(batch, 3, row)?;
    let metadata: ChunkMetadata = serde_json::from_str(&raw_metadata)?;
    Ok(Chunk {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        content: get_string(batch, 2, row)?,
        metadata,
        chunk_order: get_i64(batch, 4, row)?,
        created_at: parse_timestamp(&get_string(batch, 5, row)?),
    })
}

// =============================================================================
// Job Description
// =============================================================================

pub fn job_description_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
        Field::new("prompt", DataType::Utf8, true),
        Field::new("weights", DataType::Utf8, true),
        Field::new("custom_rubric", DataType::Utf8, true),
        Field::new("created_at", DataType::Utf8, false),
        Field::new("updated_at", DataType::Utf8, false),
    ]))
}

pub fn job_description_to_record(jd: &JobDescription) -> Result<RecordBatch> {
    let weights = jd
        .weights
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    RecordBatch::try_new(
        job_description_schema(),
        vec![
            Arc::new(StringArray::from(vec![jd.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![jd.project_id.as_str()])),
            Arc::new(StringArray::from(vec![jd.title.as_str()])),
            Arc::new(StringArray::from(vec![jd.description.as_str()])),
            Arc::new(StringArray::from(vec![jd.prompt.as_deref()])),
            Arc::new(StringArray::from(vec![weights.as_deref()])),
            Arc::new(StringArray::from(vec![jd.custom_rubric.as_deref()])),
            Arc::new(StringArray::from(vec![jd.created_at.to_rfc3339()])),
            Arc::new(StringArray::from(vec![jd.updated_at.to_rfc3339()])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_job_description(batch: &RecordBatch, row: usize) -> Result<JobDescription> {
    let weights = get_opt_string(batch, 5, row)?.map(|raw| parse_json_map(&raw));
    Ok(JobDescription {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        title: get_string(batch, 2, row)?,
        description: get_string(batch, 3, row)?,
        prompt: get_opt_string(batch, 4, row)?,
        weights,
        custom_rubric: get_opt_string(batch, 6, row)?,
        created_at: parse_timestamp(&get_string(batch, 7, row)?),
        updated_at: parse_timestamp(&get_string(batch, 8, row)?),
    })
}

// =============================================================================
// Usage Log
// =============================================================================

pub fn usage_log_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("project_id", DataType::Utf8, false),
        Field::new("file_id", DataType::Utf8, true),
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("model_id", DataType::Utf8, false),
        Field::new("action_type", DataType::Utf8, false),
        Field::new("prompt_tokens", DataType::Int64, false),
        Field::new("completion_tokens", DataType::Int64, false),
        Field::new("total_tokens", DataType::Int64, false),
        Field::new("latency_ms", DataType::Int64, false),
    ]))
}

pub fn usage_log_to_record(log: &UsageLog) -> Result<RecordBatch> {
    RecordBatch::try_new(
        usage_log_schema(),
        vec![
            Arc::new(StringArray::from(vec![log.id.to_string()])) as Arc<dyn Array>,
            Arc::new(StringArray::from(vec![log.project_id.as_str()])),
            Arc::new(StringArray::from(vec![log.file_id.as_deref()])),
            Arc::new(StringArray::from(vec![log.timestamp.to_rfc3339()])),
            Arc::new(StringArray::from(vec![log.model_id.as_str()])),
            Arc::new(StringArray::from(vec![log.action_type.as_str()])),
            Arc::new(Int64Array::from(vec![log.prompt_tokens])),
            Arc::new(Int64Array::from(vec![log.completion_tokens])),
            Arc::new(Int64Array::from(vec![log.total_tokens])),
            Arc::new(Int64Array::from(vec![log.latency_ms])),
        ],
    )
    .map_err(|e| DbError::Arrow(e.to_string()))
}

pub fn record_to_usage_log(batch: &RecordBatch, row: usize) -> Result<UsageLog> {
    Ok(UsageLog {
        id: parse_uuid(&get_string(batch, 0, row)?)?,
        project_id: get_string(batch, 1, row)?,
        file_id: get_opt_string(batch, 2, row)?,
        timestamp: parse_timestamp(&get_string(batch, 3, row)?),
        model_id: get_string(batch, 4, row)?,
        action_type: get_string(batch, 5, row)?,
        prompt_tokens: get_i64(batch, 6, row)?,
        completion_tokens: get_i64(batch, 7, row)?,
        total_tokens: get_i64(batch, 8, row)?,
        latency_ms: get_i64(batch, 9, row)?,
    })
}
