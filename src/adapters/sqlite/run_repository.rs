//! SQLite implementation of the reclustering-run repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ReclusteringRun;
use crate::domain::ports::RunRepository;

use super::{fmt_ts, parse_ts};

#[derive(Clone)]
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    project: String,
    attempt_timestamp: String,
    shard_count: i64,
    shards_reported: i64,
    progress: i64,
    rules_version: String,
    algorithms_version: i64,
}

impl RunRow {
    fn into_run(self) -> DomainResult<ReclusteringRun> {
        Ok(ReclusteringRun {
            project: self.project,
            attempt_timestamp: parse_ts(&self.attempt_timestamp)?,
            shard_count: self.shard_count,
            shards_reported: self.shards_reported,
            progress: self.progress,
            rules_version: parse_ts(&self.rules_version)?,
            algorithms_version: self.algorithms_version,
        })
    }
}

const SELECT_COLUMNS: &str = "project, attempt_timestamp, shard_count, \
     shards_reported, progress, rules_version, algorithms_version";

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn read_last(&self, project: &str) -> DomainResult<Option<ReclusteringRun>> {
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM reclustering_runs
             WHERE project = ?
             ORDER BY attempt_timestamp DESC
             LIMIT 1"
        ))
        .bind(project)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RunRow::into_run).transpose()
    }

    async fn get(
        &self,
        project: &str,
        attempt_timestamp: DateTime<Utc>,
    ) -> DomainResult<Option<ReclusteringRun>> {
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM reclustering_runs
             WHERE project = ? AND attempt_timestamp = ?"
        ))
        .bind(project)
        .bind(fmt_ts(attempt_timestamp))
        .fetch_optional(&self.pool)
        .await?;
        row.map(RunRow::into_run).transpose()
    }

    async fn read_last_and_create(
        &self,
        project: &str,
        create: &(dyn for<'a> Fn(Option<&'a ReclusteringRun>) -> DomainResult<ReclusteringRun>
                      + Send
                      + Sync),
    ) -> DomainResult<ReclusteringRun> {
        // Read and insert share one transaction, so two overlapping
        // attempts for the same project cannot both commit.
        let mut tx = self.pool.begin().await?;

        let row: Option<RunRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM reclustering_runs
             WHERE project = ?
             ORDER BY attempt_timestamp DESC
             LIMIT 1"
        ))
        .bind(project)
        .fetch_optional(&mut *tx)
        .await?;
        let last = row.map(RunRow::into_run).transpose()?;

        let new_run = create(last.as_ref())?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO reclustering_runs (project, attempt_timestamp,
               shard_count, shards_reported, progress, rules_version,
               algorithms_version)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_run.project)
        .bind(fmt_ts(new_run.attempt_timestamp))
        .bind(new_run.shard_count)
        .bind(new_run.shards_reported)
        .bind(new_run.progress)
        .bind(fmt_ts(new_run.rules_version))
        .bind(new_run.algorithms_version)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            // A run for this attempt already exists.
            return Err(DomainError::OverlappingAttempt);
        }

        tx.commit().await?;
        Ok(new_run)
    }

    async fn report_shard_progress(
        &self,
        project: &str,
        attempt_timestamp: DateTime<Utc>,
        shard_start: &str,
        progress: i64,
    ) -> DomainResult<()> {
        let attempt = fmt_ts(attempt_timestamp);
        let mut tx = self.pool.begin().await?;

        let previous: Option<(i64,)> = sqlx::query_as(
            "SELECT progress FROM reclustering_shard_progress
             WHERE project = ? AND attempt_timestamp = ? AND shard_start = ?",
        )
        .bind(project)
        .bind(&attempt)
        .bind(shard_start)
        .fetch_optional(&mut *tx)
        .await?;

        let (shards_delta, progress_delta) = match previous {
            None => (1, progress),
            Some((prev,)) => (0, progress - prev),
        };

        sqlx::query(
            "INSERT OR REPLACE INTO reclustering_shard_progress
               (project, attempt_timestamp, shard_start, progress)
             VALUES (?, ?, ?, ?)",
        )
        .bind(project)
        .bind(&attempt)
        .bind(shard_start)
        .bind(progress)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE reclustering_runs
             SET shards_reported = shards_reported + ?,
                 progress = progress + ?
             WHERE project = ? AND attempt_timestamp = ?",
        )
        .bind(shards_delta)
        .bind(progress_delta)
        .bind(project)
        .bind(&attempt)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::RunNotFound(project.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}
