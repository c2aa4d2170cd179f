//! Thin Qdrant wrapper: collection lifecycle, hybrid upsert, RRF query.

use qdrant_client::qdrant::{
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder, Distance,
    FieldType, Fusion, PointStruct, PointsIdsList, PrefetchQueryBuilder, Query,
    QueryPointsBuilder, ScoredPoint, SparseVectorParamsBuilder, SparseVectorsConfigBuilder,
    TextIndexParamsBuilder, TokenizerType, UpsertPointsBuilder, VectorParamsBuilder,
    VectorsConfigBuilder,
};
use qdrant_client::Qdrant;
use serde::Serialize;

use crate::error::{Result, VectorError};

/// Named vector slots inside every collection.
pub const DENSE_VECTOR_NAME: &str = "dense";
pub const SPARSE_VECTOR_NAME: &str = "bm25";

/// Payload field carrying the chunk text; full-text indexed.
pub const TEXT_PAYLOAD_FIELD: &str = "text";

pub struct VectorStore {
    client: Qdrant,
    dense_dim: u64,
    distance: Distance,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    pub status: String,
}

impl VectorStore {
    pub fn new(url: &str, dense_dim: u64, distance: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self {
            client,
            dense_dim,
            distance: parse_distance(distance),
        })
    }

    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.client.collection_exists(name).await?)
    }

    /// Create the collection if missing: named dense vector, named sparse
    /// `bm25` slot, and a word-tokenized lowercase text index on the
    /// `text` payload field.
    pub async fn ensure_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }

        let mut vectors_config = VectorsConfigBuilder::default();
        vectors_config.add_named_vector_params(
            DENSE_VECTOR_NAME,
            VectorParamsBuilder::new(self.dense_dim, self.distance),
        );

        let mut sparse_config = SparseVectorsConfigBuilder::default();
        sparse_config
            .add_named_vector_params(SPARSE_VECTOR_NAME, SparseVectorParamsBuilder::default());

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .sparse_vectors_config(sparse_config),
            )
            .await?;

        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(name, TEXT_PAYLOAD_FIELD, FieldType::Text)
                    .field_index_params(
                        TextIndexParamsBuilder::new(TokenizerType::Word)
                            .lowercase(true)
                            .min_token_len(2)
                            .build(),
                    ),
            )
            .await?;

        tracing::info!(collection = name, dim = self.dense_dim, "Created vector collection");
        Ok(())
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            self.client.delete_collection(name).await?;
            tracing::info!(collection = name, "Deleted vector collection");
        }
        Ok(())
    }

    pub async fn upsert(&self, name: &str, points: Vec<PointStruct>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
            .await?;
        Ok(())
    }

    /// Hybrid query: dense and sparse prefetches fused with RRF.
    pub async fn hybrid_query(
        &self,
        name: &str,
        dense: Vec<f32>,
        sparse: (Vec<u32>, Vec<f32>),
        k: u64,
    ) -> Result<Vec<ScoredPoint>> {
        if !self.collection_exists(name).await? {
            return Err(VectorError::CollectionNotFound(name.to_string()));
        }

        let (indices, values) = sparse;
        let sparse_pairs: Vec<(u32, f32)> = indices.into_iter().zip(values).collect();

        let response = self
            .client
            .query(
                QueryPointsBuilder::new(name)
                    .add_prefetch(
                        PrefetchQueryBuilder::default()
                            .query(Query::new_nearest(dense))
                            .using(DENSE_VECTOR_NAME)
                            .limit(k),
                    )
                    .add_prefetch(
                        PrefetchQueryBuilder::default()
                            .query(Query::new_nearest(sparse_pairs.as_slice()))
                            .using(SPARSE_VECTOR_NAME)
                            .limit(k),
                    )
                    .query(Query::new_fusion(Fusion::Rrf))
                    .limit(k)
                    .with_payload(true),
            )
            .await?;

        Ok(response.result)
    }

    pub async fn delete_points(&self, name: &str, ids: Vec<String>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let point_ids = ids.into_iter().map(Into::into).collect();
        self.client
            .delete_points(
                DeletePointsBuilder::new(name)
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await?;
        Ok(())
    }

    pub async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        if !self.collection_exists(name).await? {
            return Err(VectorError::CollectionNotFound(name.to_string()));
        }
        let response = self.client.collection_info(name).await?;
        let info = response
            .result
            .ok_or_else(|| VectorError::CollectionNotFound(name.to_string()))?;
        Ok(CollectionInfo {
            name: name.to_string(),
            points_count: info.points_count.unwrap_or(0),
            status: format!("{:?}", info.status()),
        })
    }
}

fn parse_distance(name: &str) -> Distance {
    match name.to_lowercase().as_str() {
        "dot" => Distance::Dot,
        "euclid" | "euclidean" => Distance::Euclid,
        "manhattan" => Distance::Manhattan,
        _ => Distance::Cosine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("cosine"), Distance::Cosine);
        assert_eq!(parse_distance("DOT"), Distance::Dot);
        assert_eq!(parse_distance("euclidean"), Distance::Euclid);
        assert_eq!(parse_distance("unknown"), Distance::Cosine);
    }
}
