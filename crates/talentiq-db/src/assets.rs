//! Asset repository.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{self, Asset};
use crate::schema_arrow::{asset_to_record, record_to_asset};
use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

#[derive(Clone)]
pub struct AssetRepository {
    db: Arc<Database>,
}

impl AssetRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, asset: &Asset) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_ASSETS)
            .execute()
            .await?;

        let record = asset_to_record(asset)?;
        let table_schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);
        table.add(iter).execute().await?;
        Ok(())
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Asset>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_ASSETS)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("project_id = '{project_id}'"))
            .execute()
            .await?;

        let mut assets = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                assets.push(record_to_asset(&batch, i)?);
            }
        }
        // Storage order is not meaningful; keep listings stable by name.
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    pub async fn find_by_name(&self, project_id: &str, name: &str) -> Result<Option<Asset>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_ASSETS)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!(
                "project_id = '{project_id}' AND name = '{name}'"
            ))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_asset(&batch, 0)?));
            }
        }

        Ok(None)
    }

    pub async fn delete_by_project_id(&self, project_id: &str) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_ASSETS)
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
            .open_table(schema::TABLE_ASSETS)
            .execute()
            .await?;
        let count = table
            .count_rows(Some(format!("project_id = '{project_id}'")))
            .await?;
        Ok(count as u64)
    }
}
