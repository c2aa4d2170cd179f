//! Job description repository. One JD per project, create-or-update.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{self, JobDescription};
use crate::schema_arrow::{job_description_to_record, record_to_job_description};
use arrow_array::RecordBatchIterator;
use chrono::Utc;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

#[derive(Clone)]
pub struct JobDescriptionRepository {
    db: Arc<Database>,
}

impl JobDescriptionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get_by_project_id(&self, project_id: &str) -> Result<Option<JobDescription>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_JOB_DESCRIPTIONS)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("project_id = '{project_id}'"))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_job_description(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Create the project's JD, or replace it keeping the original
    /// creation time.
    pub async fn create_or_update(&self, mut jd: JobDescription) -> Result<JobDescription> {
        if let Some(existing) = self.get_by_project_id(&jd.project_id).await? {
            jd.id = existing.id;
            jd.created_at = existing.created_at;
        }
        jd.updated_at = Utc::now();

        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_JOB_DESCRIPTIONS)
            .execute()
            .await?;

        table
            .delete(&format!("project_id = '{}'", jd.project_id))
            .await?;

        let record = job_description_to_record(&jd)?;
        let table_schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);
        table.add(iter).execute().await?;

        tracing::info!(project_id = %jd.project_id, title = %jd.title, "Saved job description");
        Ok(jd)
    }
}
