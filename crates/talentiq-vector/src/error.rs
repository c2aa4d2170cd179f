//! Vector backend error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorError>;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<qdrant_client::QdrantError> for VectorError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        VectorError::Qdrant(err.to_string())
    }
}

impl From<talentiq_llm::LlmError> for VectorError {
    fn from(err: talentiq_llm::LlmError) -> Self {
        VectorError::Embedding(err.to_string())
    }
}

impl From<VectorError> for talentiq_common::TalentiqError {
    fn from(err: VectorError) -> Self {
        talentiq_common::TalentiqError::VectorBackend(err.to_string())
    }
}
