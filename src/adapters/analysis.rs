//! Impact reader over the analytics summary table.
//!
//! The external analytics layer maintains `cluster_summaries`, one row
//! per cluster with its rolling impact counts serialized as JSON. This
//! adapter reads it back through the [`ImpactReader`] port; rows that
//! fail to parse are logged and skipped rather than failing the pass.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ClusterId, ClusterImpact, ImpactThreshold};
use crate::domain::ports::ImpactReader;

#[derive(Clone)]
pub struct SqliteImpactReader {
    pool: SqlitePool,
}

impl SqliteImpactReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Writes a cluster summary row. Used by tests and the analytics
    /// ingestion tooling.
    pub async fn put(&self, project: &str, impact: &ClusterImpact) -> DomainResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO cluster_summaries
               (project, cluster_algorithm, cluster_id, summary)
             VALUES (?, ?, ?, ?)",
        )
        .bind(project)
        .bind(&impact.cluster_id.algorithm)
        .bind(&impact.cluster_id.id)
        .bind(serde_json::to_string(impact)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes a cluster summary row (the cluster's impact aged out).
    pub async fn delete(&self, project: &str, cluster_id: &ClusterId) -> DomainResult<()> {
        sqlx::query(
            "DELETE FROM cluster_summaries
             WHERE project = ? AND cluster_algorithm = ? AND cluster_id = ?",
        )
        .bind(project)
        .bind(&cluster_id.algorithm)
        .bind(&cluster_id.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ImpactReader for SqliteImpactReader {
    async fn read_impactful_clusters(
        &self,
        project: &str,
        threshold: &ImpactThreshold,
        always_include: &[ClusterId],
    ) -> DomainResult<Vec<ClusterImpact>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT summary FROM cluster_summaries WHERE project = ?")
                .bind(project)
                .fetch_all(&self.pool)
                .await?;

        let mut results = Vec::new();
        for (summary,) in rows {
            let impact: ClusterImpact = match serde_json::from_str(&summary) {
                Ok(impact) => impact,
                Err(e) => {
                    warn!(project = %project, error = %e, "skipping unparseable cluster summary");
                    continue;
                }
            };
            let include = impact.meets_threshold(threshold)
                || always_include.contains(&impact.cluster_id);
            if include {
                results.push(impact);
            }
        }
        Ok(results)
    }
}
