//! Factory: build a generation backend from settings.

use std::sync::Arc;
use std::time::Duration;
use talentiq_common::Settings;

use crate::backend::{GenerationBackend, LlmError};
use crate::fallback::FallbackBackend;
use crate::gemini::GeminiBackend;
use crate::groq::GroqBackend;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    Gemini,
    Groq,
}

impl BackendKind {
    pub fn parse(name: &str) -> Result<Self, LlmError> {
        match name.trim().to_lowercase().as_str() {
            "gemini" => Ok(BackendKind::Gemini),
            "groq" => Ok(BackendKind::Groq),
            other => Err(LlmError::Unavailable(format!("Invalid LLM provider: '{other}'"))),
        }
    }
}

/// Build the configured generation backend. When fallback is enabled and
/// the primary is Gemini with a Groq key present, the result is a
/// composite that retries failed calls against Groq.
pub fn build_generation_backend(
    settings: &Settings,
    model_id: Option<&str>,
) -> Result<Arc<dyn GenerationBackend>, LlmError> {
    let kind = BackendKind::parse(&settings.llm.generation_backend)?;
    let timeout = Duration::from_secs(settings.llm.request_timeout_secs.max(60));

    match kind {
        BackendKind::Groq => {
            let api_key = Settings::api_key("groq")
                .ok_or_else(|| LlmError::Unavailable("GROQ_API_KEY is not set".to_string()))?;
            let backend = GroqBackend::new(
                api_key,
                model_id.unwrap_or(&settings.llm.groq_model_id),
                timeout,
            )?;
            Ok(Arc::new(backend))
        }
        BackendKind::Gemini => {
            let api_key = Settings::api_key("gemini")
                .ok_or_else(|| LlmError::Unavailable("GEMINI_API_KEY is not set".to_string()))?;
            let primary: Arc<dyn GenerationBackend> = Arc::new(GeminiBackend::new(
                api_key,
                model_id.unwrap_or(&settings.llm.generation_model_id),
                &settings.llm.embedding_model_id,
                settings.vector.embedding_model_size as usize,
                timeout,
            )?);

            if settings.llm.enable_fallback {
                if let Some(groq_key) = Settings::api_key("groq") {
                    let secondary: Arc<dyn GenerationBackend> =
                        Arc::new(GroqBackend::new(groq_key, &settings.llm.groq_model_id, timeout)?);
                    tracing::info!(
                        primary = primary.model_id(),
                        secondary = secondary.model_id(),
                        "LLM fallback enabled"
                    );
                    return Ok(Arc::new(FallbackBackend::new(primary, secondary)));
                }
                tracing::warn!("LLM fallback enabled but GROQ_API_KEY is not set");
            }

            Ok(primary)
        }
    }
}
