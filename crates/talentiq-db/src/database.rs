//! Database connection and table management.
//!
//! Provides a unified interface for LanceDB operations. All six tables
//! are created up front with their Arrow schemas; LanceDB requires a
//! schema-bearing (possibly empty) batch iterator to create a table.

use crate::error::Result;
use crate::schema;
use crate::schema_arrow;
use arrow_array::RecordBatchIterator;
use arrow_schema::Schema;
use lancedb::connection::Connection;
use std::path::Path;
use std::sync::Arc;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create a database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str).execute().await?;

        Ok(Self { conn, path: path_str })
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Initialize all tables, creating any that don't exist yet.
    pub async fn initialize(&self) -> Result<()> {
        let tables: [(&str, Arc<Schema>); 6] = [
            (schema::TABLE_PROJECTS, schema_arrow::project_schema()),
            (schema::TABLE_ASSETS, schema_arrow::asset_schema()),
            (schema::TABLE_RESUMES, schema_arrow::resume_schema()),
            (schema::TABLE_CHUNKS, schema_arrow::chunk_schema()),
            (
                schema::TABLE_JOB_DESCRIPTIONS,
                schema_arrow::job_description_schema(),
            ),
            (schema::TABLE_USAGE_LOGS, schema_arrow::usage_log_schema()),
        ];

        for (name, table_schema) in tables {
            if !self.table_exists(name).await? {
                let empty_iter = RecordBatchIterator::new(vec![], table_schema);
                self.conn.create_table(name, empty_iter).execute().await?;
                tracing::info!(table = name, "Created table");
            }
        }

        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.contains(&name.to_string()))
    }
}
