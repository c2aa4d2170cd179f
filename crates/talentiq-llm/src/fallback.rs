//! Composite provider: primary with secondary fallback.
//!
//! Generation, extraction, and batch structuring retry against the
//! secondary when the primary fails. Embeddings never fall back — they
//! are model-specific and mixing models would corrupt the vector index.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::backend::{
    FileRef, GenerationBackend, GenerationConfig, LlmError, LlmResponse, StructuredBatch,
};

pub struct FallbackBackend {
    primary: Arc<dyn GenerationBackend>,
    secondary: Arc<dyn GenerationBackend>,
}

impl FallbackBackend {
    pub fn new(primary: Arc<dyn GenerationBackend>, secondary: Arc<dyn GenerationBackend>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl GenerationBackend for FallbackBackend {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, LlmError> {
        match self.primary.generate(prompt, config).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(error = %e, "Primary generation failed, falling back to secondary");
                self.secondary.generate(prompt, config).await
            }
        }
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileRef, LlmError> {
        match self.primary.upload_file(path, mime_type).await {
            Ok(file_ref) => Ok(file_ref),
            Err(e) => {
                // Keep the local path so extraction can still try the
                // secondary provider.
                tracing::warn!(error = %e, "Primary file upload failed, keeping local ref");
                Ok(FileRef::local(path, mime_type))
            }
        }
    }

    async fn extract_structured_resume(
        &self,
        file_ref: &FileRef,
    ) -> Result<LlmResponse, LlmError> {
        if file_ref.remote_uri.is_some() {
            match self.primary.extract_structured_resume(file_ref).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(error = %e, "Primary extraction failed, falling back to secondary");
                }
            }
        }
        self.secondary.extract_structured_resume(file_ref).await
    }

    async fn structure_resume_batch(
        &self,
        texts: &[String],
    ) -> Result<StructuredBatch, LlmError> {
        match self.primary.structure_resume_batch(texts).await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                tracing::warn!(error = %e, "Primary batch structuring failed, falling back to secondary");
                self.secondary.structure_resume_batch(texts).await
            }
        }
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.primary.embed_documents(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.primary.embed_query(text).await
    }

    fn model_id(&self) -> &str {
        self.primary.model_id()
    }

    fn embedding_dimension(&self) -> usize {
        self.primary.embedding_dimension()
    }
}
