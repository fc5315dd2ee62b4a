//! SQLite implementation of the clustering-state repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChunkState, ClusterId};
use crate::domain::ports::{ReadNextOptions, StateRepository};
use crate::services::keyspace::estimate_chunks_from_id;

use super::{fmt_ts, parse_ts};

#[derive(Clone)]
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct StateRow {
    project: String,
    chunk_id: String,
    object_id: String,
    partition_time: String,
    algorithms_version: i64,
    rules_version: String,
    clusters: String,
}

impl StateRow {
    fn into_state(self) -> DomainResult<ChunkState> {
        let clusters: Vec<Vec<ClusterId>> = serde_json::from_str(&self.clusters)?;
        Ok(ChunkState {
            project: self.project,
            chunk_id: self.chunk_id,
            object_id: self.object_id,
            partition_time: parse_ts(&self.partition_time)?,
            algorithms_version: self.algorithms_version,
            rules_version: parse_ts(&self.rules_version)?,
            clusters,
        })
    }
}

const SELECT_COLUMNS: &str = "project, chunk_id, object_id, partition_time, \
     algorithms_version, rules_version, clusters";

#[async_trait]
impl StateRepository for SqliteStateRepository {
    async fn create(&self, entry: &ChunkState) -> DomainResult<()> {
        entry.validate().map_err(DomainError::ValidationFailed)?;
        sqlx::query(
            "INSERT INTO clustering_state (project, chunk_id, object_id,
               partition_time, algorithms_version, rules_version, clusters,
               last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.project)
        .bind(&entry.chunk_id)
        .bind(&entry.object_id)
        .bind(fmt_ts(entry.partition_time))
        .bind(entry.algorithms_version)
        .bind(fmt_ts(entry.rules_version))
        .bind(serde_json::to_string(&entry.clusters)?)
        .bind(fmt_ts(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, project: &str, chunk_id: &str) -> DomainResult<Option<ChunkState>> {
        let row: Option<StateRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM clustering_state
             WHERE project = ? AND chunk_id = ?"
        ))
        .bind(project)
        .bind(chunk_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(StateRow::into_state).transpose()
    }

    async fn update(&self, entry: &ChunkState) -> DomainResult<()> {
        entry.validate().map_err(DomainError::ValidationFailed)?;
        let result = sqlx::query(
            "UPDATE clustering_state SET object_id = ?, partition_time = ?,
               algorithms_version = ?, rules_version = ?, clusters = ?,
               last_updated = ?
             WHERE project = ? AND chunk_id = ?",
        )
        .bind(&entry.object_id)
        .bind(fmt_ts(entry.partition_time))
        .bind(entry.algorithms_version)
        .bind(fmt_ts(entry.rules_version))
        .bind(serde_json::to_string(&entry.clusters)?)
        .bind(fmt_ts(Utc::now()))
        .bind(&entry.project)
        .bind(&entry.chunk_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::ChunkStateNotFound { chunk_id: entry.chunk_id.clone() });
        }
        Ok(())
    }

    async fn read_next_n(
        &self,
        project: &str,
        opts: &ReadNextOptions,
        n: usize,
    ) -> DomainResult<Vec<ChunkState>> {
        let rows: Vec<StateRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM clustering_state
             WHERE project = ?
               AND chunk_id > ? AND chunk_id <= ?
               AND (algorithms_version < ? OR rules_version < ?)
             ORDER BY chunk_id
             LIMIT ?"
        ))
        .bind(project)
        .bind(&opts.start_chunk_id)
        .bind(&opts.end_chunk_id)
        .bind(opts.algorithms_version)
        .bind(fmt_ts(opts.rules_version))
        .bind(i64::try_from(n).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StateRow::into_state).collect()
    }

    async fn estimate_chunks(&self, project: &str) -> DomainResult<u64> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT chunk_id FROM clustering_state
             WHERE project = ?
             ORDER BY chunk_id ASC
             LIMIT 1 OFFSET 100",
        )
        .bind(project)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            // There was no 100th chunk; the project has fewer than 100.
            None => Ok(99),
            Some((chunk_id,)) => estimate_chunks_from_id(&chunk_id),
        }
    }
}
