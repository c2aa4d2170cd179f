//! Project repository.
//!
//! Projects are created on first reference (get-or-create) and own every
//! other entity; deleting a project cascades across all six tables. The
//! vector collection is dropped by the caller, which holds the vector
//! backend handle.

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::schema::{self, Project};
use crate::schema_arrow::{project_to_record, record_to_project};
use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProjectRepository {
    db: Arc<Database>,
}

impl ProjectRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find_by_project_id(&self, project_id: &str) -> Result<Option<Project>> {
        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_PROJECTS)
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
                return Ok(Some(record_to_project(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Fetch a project, creating it on first reference.
    pub async fn get_or_create(&self, project_id: &str) -> Result<Project> {
        if !Project::is_valid_id(project_id) {
            return Err(DbError::InvalidQuery(format!(
                "project_id must be alphanumeric, got '{project_id}'"
            )));
        }

        if let Some(existing) = self.find_by_project_id(project_id).await? {
            return Ok(existing);
        }

        let project = Project::new(project_id);
        let record = project_to_record(&project)?;
        let table_schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], table_schema);

        let table = self
            .db
            .connection()
            .open_table(schema::TABLE_PROJECTS)
            .execute()
            .await?;
        table.add(iter).execute().await?;

        tracing::info!(project_id, "Created project");
        Ok(project)
    }

    /// Delete a project and every row it owns across all tables.
    pub async fn delete_cascade(&self, project_id: &str) -> Result<()> {
        let owned_tables = [
            schema::TABLE_ASSETS,
            schema::TABLE_RESUMES,
            schema::TABLE_CHUNKS,
            schema::TABLE_JOB_DESCRIPTIONS,
            schema::TABLE_USAGE_LOGS,
            schema::TABLE_PROJECTS,
        ];

        for name in owned_tables {
            let table = self.db.connection().open_table(name).execute().await?;
            table
                .delete(&format!("project_id = '{project_id}'"))
                .await?;
        }

        tracing::info!(project_id, "Deleted project and owned rows");
        Ok(())
    }
}
