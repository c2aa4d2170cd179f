//! Gemini backend (remote, primary).
//!
//! Uses the Generative Language REST API: `generateContent` for text,
//! `batchEmbedContents`/`embedContent` for embeddings, and the file API
//! for raw résumé uploads used by the extraction fallback.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use talentiq_common::TokenUsage;

use crate::backend::{
    l2_normalize, FileRef, GenerationBackend, GenerationConfig, LlmError, LlmResponse,
    ParsedResume, StructuredBatch,
};
use crate::prompts::{batch_structure_prompt, RESUME_STRUCTURE_PROMPT};

const API_BASE: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiBackend {
    pub model: String,
    pub embedding_model: String,
    embedding_dimension: usize,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        embedding_model: impl Into<String>,
        embedding_dimension: usize,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model: model.into(),
            embedding_model: embedding_model.into(),
            embedding_dimension,
            api_key: api_key.into(),
            client,
        })
    }

    fn generation_body(&self, parts: Vec<Value>, config: &GenerationConfig) -> Value {
        let mut generation_config = json!({
            "temperature": config.temperature.unwrap_or(0.1),
            "maxOutputTokens": config.max_output_tokens.unwrap_or(2048),
        });
        if config.json_response {
            generation_config["responseMimeType"] = json!("application/json");
        }
        json!({
            "contents": [{"parts": parts}],
            "generationConfig": generation_config,
        })
    }

    async fn generate_with_parts(
        &self,
        parts: Vec<Value>,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!(
            "{API_BASE}/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = self.generation_body(parts, config);

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!("Gemini HTTP {status}: {detail}")));
        }

        let body: Value = resp.json().await?;
        let content = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing candidate text".to_string()))?
            .to_string();

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage: parse_usage_metadata(&body),
        })
    }

    async fn embed(&self, texts: &[String], task_type: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!(
            "{API_BASE}/v1beta/models/{}:batchEmbedContents?key={}",
            self.embedding_model, self.api_key
        );
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{}", self.embedding_model),
                    "content": {"parts": [{"text": text}]},
                    "taskType": task_type,
                    "outputDimensionality": self.embedding_dimension,
                })
            })
            .collect();

        let resp = self
            .client
            .post(&url)
            .json(&json!({"requests": requests}))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(LlmError::Unavailable(format!("Gemini embedding HTTP {status}")));
        }

        let body: Value = resp.json().await?;
        let raw = body["embeddings"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing embeddings array".to_string()))?;

        let mut embeddings = Vec::with_capacity(raw.len());
        for item in raw {
            let mut vector: Vec<f32> = serde_json::from_value(item["values"].clone())?;
            l2_normalize(&mut vector);
            embeddings.push(vector);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<LlmResponse, LlmError> {
        self.generate_with_parts(vec![json!({"text": prompt})], config)
            .await
    }

    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileRef, LlmError> {
        let bytes = tokio::fs::read(path).await?;
        let url = format!("{API_BASE}/upload/v1beta/files?key={}", self.api_key);

        let resp = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(LlmError::Unavailable(format!("Gemini file upload HTTP {status}")));
        }

        let body: Value = resp.json().await?;
        let name = body["file"]["name"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing file name".to_string()))?
            .to_string();
        let uri = body["file"]["uri"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing file uri".to_string()))?
            .to_string();

        // The file API processes uploads asynchronously; wait until ACTIVE.
        let mut state = body["file"]["state"].as_str().unwrap_or("ACTIVE").to_string();
        while state == "PROCESSING" {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let poll_url = format!("{API_BASE}/v1beta/{name}?key={}", self.api_key);
            let polled: Value = self.client.get(&poll_url).send().await?.json().await?;
            state = polled["state"].as_str().unwrap_or("ACTIVE").to_string();
        }
        if state == "FAILED" {
            return Err(LlmError::Unavailable(format!(
                "Gemini file processing failed for {}",
                path.display()
            )));
        }

        Ok(FileRef {
            remote_name: Some(name),
            remote_uri: Some(uri),
            path: path.to_path_buf(),
            mime_type: mime_type.to_string(),
        })
    }

    async fn extract_structured_resume(
        &self,
        file_ref: &FileRef,
    ) -> Result<LlmResponse, LlmError> {
        let uri = file_ref.remote_uri.as_deref().ok_or_else(|| {
            LlmError::Unavailable("file was not uploaded to Gemini".to_string())
        })?;

        let parts = vec![
            json!({"fileData": {"mimeType": file_ref.mime_type, "fileUri": uri}}),
            json!({"text": RESUME_STRUCTURE_PROMPT}),
        ];
        self.generate_with_parts(parts, &GenerationConfig::extraction())
            .await
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

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.embed(texts, "RETRIEVAL_DOCUMENT").await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let texts = vec![text.to_string()];
        let mut embeddings = self.embed(&texts, "RETRIEVAL_QUERY").await?;
        embeddings
            .pop()
            .ok_or_else(|| LlmError::InvalidResponse("empty embedding response".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }
}

fn parse_usage_metadata(body: &Value) -> TokenUsage {
    let meta = &body["usageMetadata"];
    TokenUsage {
        prompt_tokens: meta["promptTokenCount"].as_u64().unwrap_or(0),
        completion_tokens: meta["candidatesTokenCount"].as_u64().unwrap_or(0),
        total_tokens: meta["totalTokenCount"].as_u64().unwrap_or(0),
    }
}
