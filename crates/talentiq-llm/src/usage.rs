//! Latency + token tracking around generation calls.

use std::sync::Arc;
use std::time::Instant;
use talentiq_common::{ActionType, UsageEvent, UsageSink};

use crate::backend::{GenerationBackend, GenerationConfig, LlmError, LlmResponse};

/// Wrap a `generate` call with latency measurement and usage logging.
///
/// The sink write happens after the call returns and can never fail the
/// call itself; calls that report no token usage are not recorded.
pub async fn tracked_generate(
    backend: &dyn GenerationBackend,
    prompt: &str,
    config: &GenerationConfig,
    sink: Option<&Arc<dyn UsageSink>>,
    project_id: &str,
    file_id: Option<&str>,
    action: ActionType,
) -> Result<LlmResponse, LlmError> {
    let started = Instant::now();
    let response = backend.generate(prompt, config).await?;
    let latency_ms = started.elapsed().as_millis() as u64;

    if let Some(sink) = sink {
        if !response.usage.is_empty() {
            sink.record(UsageEvent {
                project_id: project_id.to_string(),
                file_id: file_id.map(|s| s.to_string()),
                model_id: response.model.clone(),
                action,
                usage: response.usage,
                latency_ms,
            })
            .await;
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use talentiq_common::TokenUsage;

    use crate::backend::{FileRef, StructuredBatch};

    struct StubBackend {
        usage: TokenUsage,
    }

    #[async_trait]
    impl GenerationBackend for StubBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: "{}".to_string(),
                model: "stub-model".to_string(),
                usage: self.usage,
            })
        }

        async fn upload_file(&self, path: &Path, mime: &str) -> Result<FileRef, LlmError> {
            Ok(FileRef::local(path, mime))
        }

        async fn extract_structured_resume(
            &self,
            _file_ref: &FileRef,
        ) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Unsupported("stub".to_string()))
        }

        async fn structure_resume_batch(
            &self,
            _texts: &[String],
        ) -> Result<StructuredBatch, LlmError> {
            Err(LlmError::Unsupported("stub".to_string()))
        }

        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Err(LlmError::Unsupported("stub".to_string()))
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Err(LlmError::Unsupported("stub".to_string()))
        }

        fn model_id(&self) -> &str {
            "stub-model"
        }

        fn embedding_dimension(&self) -> usize {
            0
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<UsageEvent>>,
    }

    #[async_trait]
    impl UsageSink for RecordingSink {
        async fn record(&self, event: UsageEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn test_tracked_generate_records_usage() {
        let backend = StubBackend {
            usage: TokenUsage { prompt_tokens: 10, completion_tokens: 4, total_tokens: 14 },
        };
        let sink = Arc::new(RecordingSink::default());
        let dyn_sink: Arc<dyn UsageSink> = sink.clone();

        let response = tracked_generate(
            &backend,
            "hello",
            &GenerationConfig::json(),
            Some(&dyn_sink),
            "p1",
            Some("p1_a.pdf"),
            ActionType::Screening,
        )
        .await
        .unwrap();

        assert_eq!(response.model, "stub-model");
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].project_id, "p1");
        assert_eq!(events[0].file_id.as_deref(), Some("p1_a.pdf"));
        assert_eq!(events[0].action, ActionType::Screening);
        assert_eq!(events[0].usage.total_tokens, 14);
    }

    #[tokio::test]
    async fn test_tracked_generate_skips_empty_usage() {
        let backend = StubBackend { usage: TokenUsage::default() };
        let sink = Arc::new(RecordingSink::default());
        let dyn_sink: Arc<dyn UsageSink> = sink.clone();

        tracked_generate(
            &backend,
            "hello",
            &GenerationConfig::json(),
            Some(&dyn_sink),
            "p1",
            None,
            ActionType::Generation,
        )
        .await
        .unwrap();

        assert!(sink.events.lock().unwrap().is_empty());
    }
}
