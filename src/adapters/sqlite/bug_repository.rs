//! SQLite implementation of the bug-cluster repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BugCluster, BugId, ClusterId};
use crate::domain::ports::BugClusterRepository;

use super::{fmt_ts, parse_ts};

#[derive(Clone)]
pub struct SqliteBugClusterRepository {
    pool: SqlitePool,
}

impl SqliteBugClusterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BugClusterRow {
    project: String,
    bug_system: String,
    bug_id: String,
    cluster_algorithm: String,
    cluster_id: String,
    is_active: i64,
    priority: Option<String>,
    creation_time: String,
    last_updated: String,
}

impl BugClusterRow {
    fn into_bug_cluster(self) -> DomainResult<BugCluster> {
        Ok(BugCluster {
            project: self.project,
            bug: BugId { system: self.bug_system, id: self.bug_id },
            cluster_id: ClusterId { algorithm: self.cluster_algorithm, id: self.cluster_id },
            is_active: self.is_active != 0,
            priority: self.priority,
            creation_time: parse_ts(&self.creation_time)?,
            last_updated: parse_ts(&self.last_updated)?,
        })
    }
}

const SELECT_COLUMNS: &str = "project, bug_system, bug_id, cluster_algorithm, \
     cluster_id, is_active, priority, creation_time, last_updated";

#[async_trait]
impl BugClusterRepository for SqliteBugClusterRepository {
    async fn create(&self, bug_cluster: &BugCluster) -> DomainResult<()> {
        // The partial unique index on active rows enforces the
        // one-active-bug-per-cluster invariant at the store level.
        sqlx::query(
            "INSERT INTO bug_clusters (project, bug_system, bug_id,
               cluster_algorithm, cluster_id, is_active, priority,
               creation_time, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bug_cluster.project)
        .bind(&bug_cluster.bug.system)
        .bind(&bug_cluster.bug.id)
        .bind(&bug_cluster.cluster_id.algorithm)
        .bind(&bug_cluster.cluster_id.id)
        .bind(i64::from(bug_cluster.is_active))
        .bind(&bug_cluster.priority)
        .bind(fmt_ts(bug_cluster.creation_time))
        .bind(fmt_ts(bug_cluster.last_updated))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, bug_cluster: &BugCluster) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE bug_clusters SET cluster_algorithm = ?, cluster_id = ?,
               is_active = ?, priority = ?, last_updated = ?
             WHERE project = ? AND bug_system = ? AND bug_id = ?",
        )
        .bind(&bug_cluster.cluster_id.algorithm)
        .bind(&bug_cluster.cluster_id.id)
        .bind(i64::from(bug_cluster.is_active))
        .bind(&bug_cluster.priority)
        .bind(fmt_ts(bug_cluster.last_updated))
        .bind(&bug_cluster.project)
        .bind(&bug_cluster.bug.system)
        .bind(&bug_cluster.bug.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::Database(format!(
                "bug cluster {} does not exist",
                bug_cluster.bug
            )));
        }
        Ok(())
    }

    async fn read_active(&self, project: &str) -> DomainResult<Vec<BugCluster>> {
        let rows: Vec<BugClusterRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM bug_clusters
             WHERE project = ? AND is_active = 1
             ORDER BY bug_system, bug_id"
        ))
        .bind(project)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BugClusterRow::into_bug_cluster).collect()
    }

    async fn get_active_by_cluster(
        &self,
        project: &str,
        cluster_id: &ClusterId,
    ) -> DomainResult<Option<BugCluster>> {
        let row: Option<BugClusterRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM bug_clusters
             WHERE project = ? AND cluster_algorithm = ? AND cluster_id = ?
               AND is_active = 1"
        ))
        .bind(project)
        .bind(&cluster_id.algorithm)
        .bind(&cluster_id.id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BugClusterRow::into_bug_cluster).transpose()
    }

    async fn get_by_bug(&self, project: &str, bug: &BugId) -> DomainResult<Option<BugCluster>> {
        let row: Option<BugClusterRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM bug_clusters
             WHERE project = ? AND bug_system = ? AND bug_id = ?"
        ))
        .bind(project)
        .bind(&bug.system)
        .bind(&bug.id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BugClusterRow::into_bug_cluster).transpose()
    }
}
