//! Generation backend trait and shared request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use talentiq_common::TokenUsage;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(String),
    #[error("File error: {0}")]
    File(#[from] std::io::Error),
}

impl From<LlmError> for talentiq_common::TalentiqError {
    fn from(err: LlmError) -> Self {
        talentiq_common::TalentiqError::Llm(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// Per-call generation options.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Ask the provider for a JSON-typed response body.
    pub json_response: bool,
}

impl GenerationConfig {
    /// Full screening calls: low temperature, JSON mode.
    pub fn screening() -> Self {
        Self { temperature: Some(0.1), max_output_tokens: Some(4096), json_response: true }
    }

    /// Single-file structured extraction.
    pub fn extraction() -> Self {
        Self { temperature: Some(0.0), max_output_tokens: Some(4096), json_response: true }
    }

    /// Batch structuring of several résumés at once.
    pub fn batch_structuring() -> Self {
        Self { temperature: Some(0.0), max_output_tokens: Some(8192), json_response: true }
    }

    /// Short JSON utility calls (keyword extraction and the like).
    pub fn json() -> Self {
        Self { temperature: None, max_output_tokens: None, json_response: true }
    }
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Handle to a file made available to a provider.
///
/// `remote_uri`/`remote_name` are set when the provider's file API took
/// the upload; `path` always points at the original bytes so a composite
/// backend can retry extraction against a provider without a file API.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub remote_name: Option<String>,
    pub remote_uri: Option<String>,
    pub path: PathBuf,
    pub mime_type: String,
}

impl FileRef {
    pub fn local(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            remote_name: None,
            remote_uri: None,
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// One structured résumé as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResume {
    #[serde(default = "default_candidate_name")]
    pub candidate_name: String,
    #[serde(default)]
    pub contact_info: Map<String, Value>,
    #[serde(default)]
    pub parsed_data: Map<String, Value>,
}

fn default_candidate_name() -> String {
    "Unknown".to_string()
}

impl ParsedResume {
    /// Placeholder for slots the provider failed to fill.
    pub fn unknown() -> Self {
        Self {
            candidate_name: default_candidate_name(),
            contact_info: Map::new(),
            parsed_data: Map::new(),
        }
    }
}

/// Result of a batch-structuring call.
#[derive(Debug, Clone)]
pub struct StructuredBatch {
    pub resumes: Vec<ParsedResume>,
    pub model: String,
    pub usage: TokenUsage,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, LlmError>;

    /// Upload a raw file to the provider's file API.
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileRef, LlmError>;

    /// Fallback extraction: structure a résumé straight from an uploaded
    /// file. The response body is the JSON encoding of a [`ParsedResume`].
    async fn extract_structured_resume(&self, file_ref: &FileRef)
        -> Result<LlmResponse, LlmError>;

    /// Structure several locally-extracted résumé texts in one call.
    async fn structure_resume_batch(&self, texts: &[String])
        -> Result<StructuredBatch, LlmError>;

    /// Embed texts for storage, L2-normalized.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Embed a single query for retrieval, L2-normalized.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    fn model_id(&self) -> &str;
    fn embedding_dimension(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// L2-normalize an embedding in place.
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Parse a JSON array of structured résumés, tolerating a single object.
pub(crate) fn parse_resume_array(raw: &str) -> Result<Vec<ParsedResume>, LlmError> {
    let value: Value = serde_json::from_str(raw.trim())?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(LlmError::from))
            .collect(),
        Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
        other => Err(LlmError::InvalidResponse(format!(
            "expected a JSON array of resumes, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_parse_resume_array() {
        let raw = r#"[
            {"candidate_name": "Jane", "contact_info": {"email": "j@x.io"}, "parsed_data": {"skills": ["rust"]}},
            {"parsed_data": {}}
        ]"#;
        let resumes = parse_resume_array(raw).unwrap();
        assert_eq!(resumes.len(), 2);
        assert_eq!(resumes[0].candidate_name, "Jane");
        assert_eq!(resumes[1].candidate_name, "Unknown");
    }

    #[test]
    fn test_parse_single_object_as_one_element() {
        let raw = r#"{"candidate_name": "Solo"}"#;
        let resumes = parse_resume_array(raw).unwrap();
        assert_eq!(resumes.len(), 1);
        assert_eq!(resumes[0].candidate_name, "Solo");
    }

    #[test]
    fn test_parse_rejects_scalar() {
        assert!(parse_resume_array("42").is_err());
    }
}
