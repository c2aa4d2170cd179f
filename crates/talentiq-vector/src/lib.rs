//! talentiq-vector — Hybrid vector indexing and retrieval.
//!
//! One Qdrant collection per project, holding a named dense vector
//! (provider embeddings) and a named sparse vector (`bm25`, encoded
//! locally). Queries send both representations as prefetches and fuse
//! the rankings with Reciprocal Rank Fusion; chunk hits are aggregated
//! to résumé-level scores for the screening tiers.

pub mod bm25;
pub mod error;
pub mod indexer;
pub mod store;

pub use bm25::Bm25SparseEncoder;
pub use error::{Result, VectorError};
pub use indexer::{ChunkHit, IndexableChunk, RankedCandidate, VectorIndexer};
pub use store::VectorStore;
