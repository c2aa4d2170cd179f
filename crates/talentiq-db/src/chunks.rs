//! Chunk repository.
//!
//! Chunks are bulk-inserted during ingestion and bulk-deleted when a
//! project is reprocessed with reset.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{self, Chunk};
use crate::schema_arrow::{chunks_to_record, record_to_chunk};
use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// Rows per insert batch.
const INSERT_BATCH_SIZE: usize = 200;

#[derive(Clone)]
pub struct ChunkRepository {
    db: Arc<Database>,
}

impl ChunkRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert chunks in batches of [`INSERT_BATCH_SIZE`].
    pub async fn insert_bulk(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_CHUNKS)
            .execute()
            .await?;

        for batch in chunks.chunks(INSERT_BATCH_SIZE) {
            let record = chunks_to_record(batch)?;
            let table_schema = record.schema();
            let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);
            table.add(iter).execute().await?;
        }

        tracing::debug!(count = chunks.len(), "Inserted chunks");
        Ok(chunks.len())
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Chunk>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_CHUNKS)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("project_id = '{project_id}'"))
            .execute()
            .await?;

        let mut chunks = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                chunks.push(record_to_chunk(&batch, i)?);
            }
        }
        chunks.sort_by(|a, b| {
            a.metadata
                .file_id
                .cmp(&b.metadata.file_id)
                .then(a.chunk_order.cmp(&b.chunk_order))
        });
        Ok(chunks)
    }

    pub async fn delete_by_project_id(&self, project_id: &str) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_CHUNKS)
            .execute()
            .await?;
        table
            .delete(&format!("project_id = '{project_id}'"))
            .await?;
        Ok(())
    }

    pub async fn count_by_project_id(&self, project_id: &str) -> Result<u64> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_CHUNKS)
            .execute()
            .await?;
        let count = table
            .count_rows(Some(format!("project_id = '{project_id}'")))
            .await?;
        Ok(count as u64)
    }
}
