//! talentiq-llm — Generation-service abstraction layer.
//!
//! The generation service is a capability set: text generation, raw-file
//! upload, structured résumé extraction, batch structuring, and document
//! and query embeddings. Implementations are HTTP providers (Gemini,
//! Groq); `FallbackBackend` composes a primary and a secondary provider
//! behind the same trait.

pub mod backend;
pub mod factory;
pub mod fallback;
pub mod gemini;
pub mod groq;
pub mod prompts;
pub mod usage;

pub use backend::{
    FileRef, GenerationBackend, GenerationConfig, LlmError, LlmResponse, ParsedResume,
    StructuredBatch,
};
pub use factory::build_generation_backend;
pub use fallback::FallbackBackend;
pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use usage::tracked_generate;
