//! SQLite-backed chunk store.
//!
//! In the deployed system chunk payloads live in a blob store written
//! by ingestion; this adapter keeps them in a table with the same
//! read-only contract.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Chunk;
use crate::domain::ports::ChunkStore;

#[derive(Clone)]
pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Writes a chunk payload. Used by tests and ingestion tooling.
    pub async fn put(&self, project: &str, object_id: &str, chunk: &Chunk) -> DomainResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO chunks (project, object_id, payload) VALUES (?, ?, ?)",
        )
        .bind(project)
        .bind(object_id)
        .bind(serde_json::to_string(chunk)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn get(&self, project: &str, object_id: &str) -> DomainResult<Chunk> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM chunks WHERE project = ? AND object_id = ?")
                .bind(project)
                .bind(object_id)
                .fetch_optional(&self.pool)
                .await?;
        let (payload,) = row.ok_or_else(|| {
            DomainError::Serialization(format!("chunk object {object_id} not found"))
        })?;
        serde_json::from_str(&payload).map_err(DomainError::from)
    }
}
