//! SQLite-backed shard task queue.
//!
//! A local stand-in for the deployed task-queue transport. Delivery is
//! at-least-once: a claimed task whose worker dies is re-claimable
//! after requeue, and shard processing is idempotent by design.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::ShardTask;
use crate::domain::ports::{ClaimedShardTask, ShardQueue};

use super::fmt_ts;

#[derive(Clone)]
pub struct SqliteShardQueue {
    pool: SqlitePool,
}

impl SqliteShardQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns claimed-but-incomplete tasks to the pending state, e.g.
    /// after a crash. Relies on shard idempotence for safety.
    pub async fn requeue_claimed(&self) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE shard_tasks SET status = 'pending', claimed_at = NULL
             WHERE status = 'claimed'",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ShardQueue for SqliteShardQueue {
    async fn schedule(&self, title: &str, task: &ShardTask) -> DomainResult<()> {
        // The unique title collapses duplicate enqueues of the same
        // (project, attempt, shard).
        sqlx::query("INSERT OR IGNORE INTO shard_tasks (title, payload) VALUES (?, ?)")
            .bind(title)
            .bind(serde_json::to_string(task)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn claim_next(&self) -> DomainResult<Option<ClaimedShardTask>> {
        let row: Option<(i64, String)> = sqlx::query_as(
            "UPDATE shard_tasks SET status = 'claimed', claimed_at = ?
             WHERE id = (
                 SELECT id FROM shard_tasks WHERE status = 'pending'
                 ORDER BY id LIMIT 1
             )
             RETURNING id, payload",
        )
        .bind(fmt_ts(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some((id, payload)) => {
                let task: ShardTask = serde_json::from_str(&payload)?;
                Ok(Some(ClaimedShardTask { id, task }))
            }
        }
    }

    async fn complete(&self, id: i64) -> DomainResult<()> {
        sqlx::query(
            "UPDATE shard_tasks SET status = 'done', completed_at = ? WHERE id = ?",
        )
        .bind(fmt_ts(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
