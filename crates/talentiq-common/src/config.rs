//! Configuration loading for TalentIQ.
//! Reads talentiq.toml from the current directory or the path in the
//! TALENTIQ_CONFIG env var; every knob has a serde default so a missing
//! file yields a fully usable configuration. API keys come from the
//! environment, never from the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TalentiqError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload count limit, enforced both pre- and post-expansion.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Total upload byte budget in MiB.
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,
    /// Streaming copy chunk for single-file uploads.
    #[serde(default = "default_file_chunk_size")]
    pub file_default_chunk_size: usize,
}

fn default_max_files() -> usize { 200 }
fn default_max_total_size_mb() -> u64 { 50 }
fn default_file_chunk_size() -> usize { 1_048_576 }

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_total_size_mb: default_max_total_size_mb(),
            file_default_chunk_size: default_file_chunk_size(),
        }
    }
}

impl UploadConfig {
    pub fn max_total_size_bytes(&self) -> u64 {
        self.max_total_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Primary provider: "gemini" or "groq".
    #[serde(default = "default_backend")]
    pub generation_backend: String,
    #[serde(default = "default_generation_model")]
    pub generation_model_id: String,
    /// Model used for the LLM extraction fallback; defaults to the
    /// generation model when unset.
    #[serde(default)]
    pub cv_extraction_model_id: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model_id: String,
    #[serde(default = "default_groq_model")]
    pub groq_model_id: String,
    /// Route failed primary calls to the secondary provider.
    #[serde(default)]
    pub enable_fallback: bool,
    /// Semaphore size for every LLM fan-out.
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    /// Provider RPC timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend() -> String { "gemini".to_string() }
fn default_generation_model() -> String { "gemini-2.0-flash".to_string() }
fn default_embedding_model() -> String { "gemini-embedding-001".to_string() }
fn default_groq_model() -> String { "llama-3.3-70b-versatile".to_string() }
fn default_concurrency() -> usize { 50 }
fn default_timeout_secs() -> u64 { 60 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            generation_backend: default_backend(),
            generation_model_id: default_generation_model(),
            cv_extraction_model_id: None,
            embedding_model_id: default_embedding_model(),
            groq_model_id: default_groq_model(),
            enable_fallback: false,
            concurrency_limit: default_concurrency(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn extraction_model_id(&self) -> &str {
        self.cv_extraction_model_id
            .as_deref()
            .unwrap_or(&self.generation_model_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    /// Dense embedding dimensionality.
    #[serde(default = "default_embedding_size")]
    pub embedding_model_size: u64,
    /// Distance metric: "cosine", "dot", "euclid", or "manhattan".
    #[serde(default = "default_distance")]
    pub distance: String,
}

fn default_qdrant_url() -> String { "http://localhost:6334".to_string() }
fn default_embedding_size() -> u64 { 768 }
fn default_distance() -> String { "cosine".to_string() }

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            embedding_model_size: default_embedding_size(),
            distance: default_distance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// LanceDB data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Root directory for uploaded asset files (one subdir per project).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

fn default_data_dir() -> String { "./data/db".to_string() }
fn default_upload_dir() -> String { "./data/uploads".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            upload_dir: default_upload_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String { "127.0.0.1:3001".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

impl Settings {
    /// Load settings from TALENTIQ_CONFIG, ./talentiq.toml, or defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TALENTIQ_CONFIG")
            .unwrap_or_else(|_| "talentiq.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| TalentiqError::Config(format!("{}: {e}", path.display())))
    }

    /// API key for the named provider, from the environment.
    pub fn api_key(provider: &str) -> Option<String> {
        let var = match provider {
            "gemini" => "GEMINI_API_KEY",
            "groq" => "GROQ_API_KEY",
            _ => return None,
        };
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.upload.max_files, 200);
        assert_eq!(s.upload.max_total_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(s.llm.concurrency_limit, 50);
        assert_eq!(s.vector.embedding_model_size, 768);
        assert_eq!(s.vector.distance, "cosine");
    }

    #[test]
    fn test_partial_file_overrides() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[upload]\nmax_files = 10\n\n[llm]\nconcurrency_limit = 4").unwrap();
        let s = Settings::load_from(f.path()).unwrap();
        assert_eq!(s.upload.max_files, 10);
        assert_eq!(s.llm.concurrency_limit, 4);
        // Untouched sections keep their defaults
        assert_eq!(s.upload.max_total_size_mb, 50);
        assert_eq!(s.vector.distance, "cosine");
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let s = Settings::load_from("/nonexistent/talentiq.toml").unwrap();
        assert_eq!(s.upload.max_files, 200);
    }

    #[test]
    fn test_extraction_model_falls_back_to_generation() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.extraction_model_id(), cfg.generation_model_id);
    }
}
