//! Usage-accounting seam.
//!
//! Every LLM call is reported through a [`UsageSink`]; the document store
//! provides the durable implementation. Sinks must never fail the primary
//! call, so `record` is infallible — implementations log and swallow
//! their own write errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What kind of LLM call produced a usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Screening,
    CvExtractionFallback,
    CvStructuringBatch,
    JdExtraction,
    Generation,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Screening => "screening",
            ActionType::CvExtractionFallback => "cv_extraction_fallback",
            ActionType::CvStructuringBatch => "cv_structuring_batch",
            ActionType::JdExtraction => "jd_extraction",
            ActionType::Generation => "generation",
        }
    }
}

/// Token usage reported by a provider, normalized to one shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

/// One recorded LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub project_id: String,
    pub file_id: Option<String>,
    pub model_id: String,
    pub action: ActionType,
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, event: UsageEvent);
}
