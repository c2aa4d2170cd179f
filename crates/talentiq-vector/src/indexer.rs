//! Per-project indexing and résumé-level ranking.

use qdrant_client::qdrant::{NamedVectors, PointStruct, ScoredPoint, Vector};
use qdrant_client::Payload;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use talentiq_llm::GenerationBackend;
use uuid::Uuid;

use crate::bm25::Bm25SparseEncoder;
use crate::error::{Result, VectorError};
use crate::store::{VectorStore, TEXT_PAYLOAD_FIELD};

/// Chunk scores folded into a file-level score: mean of the top N hits.
const TOP_CHUNKS_PER_FILE: usize = 3;

/// A chunk handed over for indexing.
#[derive(Debug, Clone)]
pub struct IndexableChunk {
    pub id: Uuid,
    pub content: String,
    pub file_id: String,
    pub section_type: String,
    pub chunk_order: i64,
}

/// One chunk-level hit from a hybrid query.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkHit {
    pub id: String,
    pub score: f64,
    pub content: String,
    pub file_id: String,
    pub section_type: String,
}

/// A résumé-level ranking entry.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub file_id: String,
    pub score: f64,
    pub preview: String,
}

pub struct VectorIndexer {
    store: VectorStore,
    backend: Arc<dyn GenerationBackend>,
    encoder: Bm25SparseEncoder,
}

impl VectorIndexer {
    pub fn new(store: VectorStore, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            store,
            backend,
            encoder: Bm25SparseEncoder::default(),
        }
    }

    pub fn collection_name(project_id: &str) -> String {
        format!("project_{project_id}")
    }

    /// Embed and upsert chunks into the project collection as hybrid
    /// points. With `do_reset` the collection is dropped and recreated
    /// first.
    pub async fn upsert_vectors(
        &self,
        project_id: &str,
        chunks: &[IndexableChunk],
        do_reset: bool,
    ) -> Result<()> {
        let collection = Self::collection_name(project_id);

        if do_reset {
            self.store.delete_collection(&collection).await?;
        }
        self.store.ensure_collection(&collection).await?;

        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let dense_vectors = self.backend.embed_documents(&texts).await?;
        if dense_vectors.len() != chunks.len() {
            return Err(VectorError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                dense_vectors.len()
            )));
        }

        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, dense) in chunks.iter().zip(dense_vectors) {
            let (indices, values) = self.encoder.encode_document(&chunk.content);

            let vectors = NamedVectors::default()
                .add_vector(crate::store::DENSE_VECTOR_NAME, Vector::new_dense(dense))
                .add_vector(
                    crate::store::SPARSE_VECTOR_NAME,
                    Vector::new_sparse(indices, values),
                );

            let payload = Payload::try_from(json!({
                "text": chunk.content,
                "file_id": chunk.file_id,
                "section_type": chunk.section_type,
                "chunk_order": chunk.chunk_order,
            }))
            .map_err(|e| VectorError::InvalidPayload(e.to_string()))?;

            points.push(PointStruct::new(chunk.id.to_string(), vectors, payload));
        }

        tracing::info!(
            collection = %collection,
            points = points.len(),
            reset = do_reset,
            "Upserting hybrid points"
        );
        self.store.upsert(&collection, points).await
    }

    /// Hybrid search over a project's chunks.
    pub async fn search(
        &self,
        project_id: &str,
        query_text: &str,
        k: u64,
    ) -> Result<Vec<ChunkHit>> {
        let collection = Self::collection_name(project_id);

        let dense = self.backend.embed_query(query_text).await?;
        let sparse = self.encoder.encode_query(query_text);

        let points = self.store.hybrid_query(&collection, dense, sparse, k).await?;
        Ok(points.into_iter().map(scored_point_to_hit).collect())
    }

    /// Hybrid search aggregated to résumé level: mean of top-3 chunk
    /// scores per file, preview from the first-ranked chunk.
    pub async fn search_and_aggregate(
        &self,
        project_id: &str,
        query_text: &str,
        k: u64,
    ) -> Result<Vec<RankedCandidate>> {
        let hits = self.search(project_id, query_text, k).await?;
        Ok(aggregate_hits(&hits))
    }

    pub async fn collection_info(&self, project_id: &str) -> Result<crate::store::CollectionInfo> {
        self.store
            .collection_info(&Self::collection_name(project_id))
            .await
    }

    pub async fn delete_collection(&self, project_id: &str) -> Result<()> {
        self.store
            .delete_collection(&Self::collection_name(project_id))
            .await
    }

    pub async fn delete_points(&self, project_id: &str, ids: Vec<String>) -> Result<()> {
        self.store
            .delete_points(&Self::collection_name(project_id), ids)
            .await
    }
}

fn scored_point_to_hit(point: ScoredPoint) -> ChunkHit {
    let id = match point.id.as_ref().and_then(|p| p.point_id_options.as_ref()) {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u.clone(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    };

    ChunkHit {
        id,
        score: point.score as f64,
        content: payload_str(&point, TEXT_PAYLOAD_FIELD),
        file_id: payload_str(&point, "file_id"),
        section_type: payload_str(&point, "section_type"),
    }
}

fn payload_str(point: &ScoredPoint, key: &str) -> String {
    point
        .payload
        .get(key)
        .and_then(|value| match &value.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Group chunk hits by file and fold to file-level scores.
///
/// Hits must arrive ranked (descending fused score); the first hit seen
/// for a file supplies its preview text.
pub fn aggregate_hits(hits: &[ChunkHit]) -> Vec<RankedCandidate> {
    let mut file_scores: HashMap<String, Vec<f64>> = HashMap::new();
    let mut previews: HashMap<String, String> = HashMap::new();

    for hit in hits {
        if hit.file_id.is_empty() {
            continue;
        }
        file_scores
            .entry(hit.file_id.clone())
            .or_default()
            .push(hit.score);
        previews
            .entry(hit.file_id.clone())
            .or_insert_with(|| hit.content.clone());
    }

    let mut ranked: Vec<RankedCandidate> = file_scores
        .into_iter()
        .map(|(file_id, mut scores)| {
            scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            let top = &scores[..scores.len().min(TOP_CHUNKS_PER_FILE)];
            let score = top.iter().sum::<f64>() / top.len() as f64;
            let preview = previews.remove(&file_id).unwrap_or_default();
            RankedCandidate { file_id, score, preview }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(file_id: &str, score: f64, content: &str) -> ChunkHit {
        ChunkHit {
            id: Uuid::new_v4().to_string(),
            score,
            content: content.to_string(),
            file_id: file_id.to_string(),
            section_type: "raw".to_string(),
        }
    }

    #[test]
    fn test_aggregate_takes_mean_of_top_three() {
        let hits = vec![
            hit("a.pdf", 0.9, "first a"),
            hit("a.pdf", 0.8, "second a"),
            hit("a.pdf", 0.7, "third a"),
            hit("a.pdf", 0.1, "ignored low chunk"),
            hit("b.pdf", 0.5, "first b"),
        ];

        let ranked = aggregate_hits(&hits);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].file_id, "a.pdf");
        assert!((ranked[0].score - 0.8).abs() < 1e-9);
        assert_eq!(ranked[0].preview, "first a");
        assert!((ranked[1].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_fewer_than_three_chunks() {
        let ranked = aggregate_hits(&[hit("solo.pdf", 0.6, "only")]);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_sorted_descending() {
        let hits = vec![
            hit("low.pdf", 0.2, "low"),
            hit("high.pdf", 0.9, "high"),
            hit("mid.pdf", 0.5, "mid"),
        ];
        let ranked = aggregate_hits(&hits);
        let scores: Vec<f64> = ranked.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_aggregate_skips_hits_without_file_id() {
        let mut orphan = hit("", 0.9, "orphan");
        orphan.file_id = String::new();
        let ranked = aggregate_hits(&[orphan]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(VectorIndexer::collection_name("hiring1"), "project_hiring1");
    }
}
