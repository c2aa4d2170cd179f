//! Row types for the LanceDB tables.
//!
//! Nested maps (contact info, parsed résumé data, chunk metadata, JD
//! weights) are stored as JSON strings in Utf8 columns; the conversion
//! lives in `schema_arrow`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// =============================================================================
// Project
// =============================================================================

/// The root scope that owns every other entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Project ids are human-chosen and embedded in collection names and
    /// filter expressions, so they must stay alphanumeric.
    pub fn is_valid_id(project_id: &str) -> bool {
        !project_id.is_empty() && project_id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

// =============================================================================
// Asset
// =============================================================================

/// A stored uploaded file. `(project_id, name)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub project_id: String,
    /// Storage name of the form `{project_id}_{uuid}.{ext}`.
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Filesystem path of the stored bytes.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or("")
    }
}

// =============================================================================
// Resume
// =============================================================================

/// How a résumé's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Local,
    LlmFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Local => "local",
            ExtractionMethod::LlmFallback => "llm_fallback",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "llm_fallback" => ExtractionMethod::LlmFallback,
            _ => ExtractionMethod::Local,
        }
    }
}

/// A processed candidate. `(project_id, file_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    pub project_id: String,
    /// The owning asset's storage name.
    pub file_id: String,
    pub candidate_name: String,
    pub contact_info: Map<String, Value>,
    /// The text actually fed to the screening LLM.
    pub full_content: String,
    /// Structured sections: summary, work_history, education, skills,
    /// certifications, projects, languages. Empty when structuring failed;
    /// the chunker falls back to raw splitting in that case.
    pub parsed_data: Map<String, Value>,
    pub extraction_method: ExtractionMethod,
    pub created_at: DateTime<Utc>,
}

impl Resume {
    pub fn new(project_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            file_id: file_id.into(),
            candidate_name: "Unknown".to_string(),
            contact_info: Map::new(),
            full_content: String::new(),
            parsed_data: Map::new(),
            extraction_method: ExtractionMethod::Local,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Chunk
// =============================================================================

/// Retrieval metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_id: String,
    pub section_type: String,
}

/// A unit of retrieval, mirrored into the vector backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub project_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// 1-based, monotone within a résumé.
    pub chunk_order: i64,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        project_id: impl Into<String>,
        content: impl Into<String>,
        metadata: ChunkMetadata,
        chunk_order: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            content: content.into(),
            metadata,
            chunk_order,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Job Description
// =============================================================================

/// One per project; create-or-update semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub id: Uuid,
    pub project_id: String,
    pub title: String,
    pub description: String,
    /// Extra screening instructions appended to the JD context.
    pub prompt: Option<String>,
    /// Criterion name → weight.
    pub weights: Option<Map<String, Value>>,
    pub custom_rubric: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobDescription {
    pub fn new(
        project_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            title: title.into(),
            description: description.into(),
            prompt: None,
            weights: None,
            custom_rubric: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Usage Log
// =============================================================================

/// Append-only record of one LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: Uuid,
    pub project_id: String,
    pub file_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub model_id: String,
    pub action_type: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub latency_ms: i64,
}

// =============================================================================
// Table names
// =============================================================================

pub const TABLE_PROJECTS: &str = "projects";
pub const TABLE_ASSETS: &str = "assets";
pub const TABLE_RESUMES: &str = "resumes";
pub const TABLE_CHUNKS: &str = "chunks";
pub const TABLE_JOB_DESCRIPTIONS: &str = "job_descriptions";
pub const TABLE_USAGE_LOGS: &str = "usage_logs";
