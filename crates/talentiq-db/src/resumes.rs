//! Résumé repository.
//!
//! `(project_id, file_id)` is unique: `create` is an upsert that replaces
//! any existing row for the same asset, so re-ingestion of a file never
//! produces duplicates.

use crate::database::Database;
use crate::error::Result;
use crate::schema::{self, Resume};
use crate::schema_arrow::{record_to_resume, resume_to_record};
use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

#[derive(Clone)]
pub struct ResumeRepository {
    db: Arc<Database>,
}

impl ResumeRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a résumé, replacing any prior row with the same
    /// `(project_id, file_id)`.
    pub async fn create(&self, resume: &Resume) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_RESUMES)
            .execute()
            .await?;

        table
            .delete(&format!(
                "project_id = '{}' AND file_id = '{}'",
                resume.project_id, resume.file_id
            ))
            .await?;

        let record = resume_to_record(resume)?;
        let table_schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);
        table.add(iter).execute().await?;
        Ok(())
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> Result<Vec<Resume>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_RESUMES)
            .execute()
            .await?;

        let mut stream = table
            .query()
            .only_if(format!("project_id = '{project_id}'"))
            .execute()
            .await?;

        let mut resumes = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                resumes.push(record_to_resume(&batch, i)?);
            }
        }
        resumes.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        Ok(resumes)
    }

    pub async fn find_by_file_ids(
        &self,
        project_id: &str,
        file_ids: &[String],
    ) -> Result<Vec<Resume>> {
        if file_ids.is_empty() {
            return Ok(Vec::new());
        }

        let quoted: Vec<String> = file_ids.iter().map(|f| format!("'{f}'")).collect();
        let filter = format!(
            "project_id = '{project_id}' AND file_id IN ({})",
            quoted.join(", ")
        );

        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_RESUMES)
            .execute()
            .await?;

        let mut stream = table.query().only_if(filter).execute().await?;

        let mut resumes = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                resumes.push(record_to_resume(&batch, i)?);
            }
        }
        Ok(resumes)
    }

    pub async fn delete_by_project_id(&self, project_id: &str) -> Result<()> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_RESUMES)
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
            .open_table(schema::TABLE_RESUMES)
            .execute()
            .await?;
        let count = table
            .count_rows(Some(format!("project_id = '{project_id}'")))
            .await?;
        Ok(count as u64)
    }
}
