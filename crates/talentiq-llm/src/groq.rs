//! Groq backend (remote, secondary).
//!
//! OpenAI-compatible chat completions. Groq has no file API and no
//! embedding endpoint, so uploads resolve to local refs and embeddings
//! are unsupported; the fallback composite only routes generation and
//! structuring here.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use talentiq_common::TokenUsage;

use crate::backend::{
    FileRef, GenerationBackend, GenerationConfig, LlmError, LlmResponse, ParsedResume,
    StructuredBatch,
};
use crate::prompts::{batch_structure_prompt, RESUME_STRUCTURE_PROMPT};

const API_BASE: &str = "https://api.groq.com/openai/v1";

pub struct GroqBackend {
    pub model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GroqBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl GenerationBackend for GroqBackend {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{API_BASE}/chat/completions");
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": config.max_output_tokens.unwrap_or(4096),
            "temperature": config.temperature.unwrap_or(0.1),
        });
        if config.json_response {
            body["response_format"] = json!({"type": "json_object"});
        }

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!("Groq HTTP {status}: {detail}")));
        }

        let body: Value = resp.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing choice content".to_string()))?
            .to_string();

        Ok(LlmResponse {
            content,
            model: body["model"].as_str().unwrap_or(&self.model).to_string(),
            usage: TokenUsage {
                prompt_tokens: body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
                completion_tokens: body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
                total_tokens: body["usage"]["total_tokens"].as_u64().unwrap_or(0),
            },
        })
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileRef, LlmError> {
        // No file API: hand back a local ref so extraction can inline
        // plain-text content.
        Ok(FileRef::local(path, mime_type))
    }

    async fn extract_structured_resume(
        &self,
        file_ref: &FileRef,
    ) -> Result<LlmResponse, LlmError> {
        if file_ref.mime_type != "text/plain" {
            return Err(LlmError::Unsupported(format!(
                "Groq cannot extract from {} files",
                file_ref.mime_type
            )));
        }

        let text = tokio::fs::read_to_string(&file_ref.path).await?;
        let prompt = format!("{RESUME_STRUCTURE_PROMPT}\n\n--- RESUME ---\n{text}");
        self.generate(&prompt, &GenerationConfig::extraction()).await
    }

    async fn structure_resume_batch(
        &self,
        texts: &[String],
    ) -> Result<StructuredBatch, LlmError> {
        let prompt = batch_structure_prompt(texts);
        let response = self
            .generate(&prompt, &GenerationConfig::batch_structuring())
            .await?;
        let resumes: Vec<ParsedResume> = crate::backend::parse_resume_array(&response.content)?;
        Ok(StructuredBatch {
            resumes,
            model: response.model,
            usage: response.usage,
        })
    }

    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::Unsupported("Groq has no embedding endpoint".to_string()))
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        Err(LlmError::Unsupported("Groq has no embedding endpoint".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn embedding_dimension(&self) -> usize {
        0
    }
}
