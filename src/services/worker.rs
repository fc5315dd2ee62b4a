//! The reclustering worker.
//!
//! Processes one shard task: brings every chunk in the shard's key
//! range up to the owning run's target rules and algorithms versions.
//! Safe to retry in full: the algorithms are deterministic and chunks
//! already at the target versions are not read again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clustering::{cluster_failure, Ruleset, ALGORITHMS_VERSION};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChunkState, ShardTask, SHARD_COMPLETE};
use crate::domain::ports::{
    ChunkStore, ReadNextOptions, RuleRepository, RunRepository, StateRepository,
};

use super::keyspace::shard_progress;

/// Chunks read per storage round trip.
const BATCH_SIZE: usize = 10;

/// Tracks and reports one shard's progress against its run.
///
/// Progress is reported as an absolute value per shard; the repository
/// folds changes into the run's aggregate, so a retried task that
/// re-reports values it already reported leaves the aggregate intact.
struct ProgressToken {
    run_repository: Arc<dyn RunRepository>,
    project: String,
    attempt_timestamp: DateTime<Utc>,
    shard_start: String,
    reported: Option<i64>,
}

impl ProgressToken {
    fn new(
        run_repository: Arc<dyn RunRepository>,
        project: String,
        attempt_timestamp: DateTime<Utc>,
        shard_start: String,
    ) -> Self {
        Self { run_repository, project, attempt_timestamp, shard_start, reported: None }
    }

    async fn report(&mut self, progress: i64) -> DomainResult<()> {
        if self.reported.is_some_and(|prev| progress <= prev) {
            return Ok(());
        }
        self.run_repository
            .report_shard_progress(
                &self.project,
                self.attempt_timestamp,
                &self.shard_start,
                progress,
            )
            .await?;
        self.reported = Some(progress);
        Ok(())
    }
}

/// Processes shard tasks produced by the orchestrator.
pub struct Worker {
    run_repository: Arc<dyn RunRepository>,
    state_repository: Arc<dyn StateRepository>,
    rule_repository: Arc<dyn RuleRepository>,
    chunk_store: Arc<dyn ChunkStore>,
}

impl Worker {
    pub fn new(
        run_repository: Arc<dyn RunRepository>,
        state_repository: Arc<dyn StateRepository>,
        rule_repository: Arc<dyn RuleRepository>,
        chunk_store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self { run_repository, state_repository, rule_repository, chunk_store }
    }

    /// Re-clusters every outdated chunk in the task's range, reporting
    /// progress into the owning run. Returns the number of chunks
    /// updated.
    pub async fn process(&self, task: &ShardTask) -> DomainResult<usize> {
        let run = self
            .run_repository
            .get(&task.project, task.attempt_time)
            .await?
            .ok_or_else(|| DomainError::RunNotFound(task.project.clone()))?;

        let ruleset = Ruleset::refresh(&task.project, self.rule_repository.as_ref()).await?;
        if ruleset.version() < run.rules_version {
            // The rule store has not caught up with the version the run
            // targets; surface for task-queue retry rather than writing
            // state stamped with a version we did not evaluate.
            return Err(DomainError::Database(format!(
                "rule store behind run target: {} < {}",
                ruleset.version(),
                run.rules_version
            )));
        }

        let mut token = ProgressToken::new(
            Arc::clone(&self.run_repository),
            task.project.clone(),
            task.attempt_time,
            task.start_chunk_id.clone(),
        );

        let opts = ReadNextOptions {
            start_chunk_id: task.start_chunk_id.clone(),
            end_chunk_id: task.end_chunk_id.clone(),
            algorithms_version: run.algorithms_version,
            rules_version: run.rules_version,
        };

        let mut updated = 0usize;
        let mut next_start = task.start_chunk_id.clone();
        loop {
            let batch_opts = ReadNextOptions { start_chunk_id: next_start.clone(), ..opts.clone() };
            let entries = self
                .state_repository
                .read_next_n(&task.project, &batch_opts, BATCH_SIZE)
                .await?;
            if entries.is_empty() {
                break;
            }

            for entry in &entries {
                match self.recluster_chunk(&ruleset, entry).await {
                    Ok(()) => updated += 1,
                    Err(DomainError::Serialization(e)) => {
                        // One bad record must not block the whole
                        // partition.
                        warn!(
                            project = %task.project,
                            chunk_id = %entry.chunk_id,
                            error = %e,
                            "skipping chunk that failed to parse"
                        );
                    }
                    Err(e) => return Err(e),
                }

                let progress = shard_progress(
                    &task.start_chunk_id,
                    &task.end_chunk_id,
                    &entry.chunk_id,
                )?;
                token.report(progress).await?;
            }

            next_start = entries
                .last()
                .map(|e| e.chunk_id.clone())
                .unwrap_or(next_start);
        }

        token.report(SHARD_COMPLETE).await?;
        info!(
            project = %task.project,
            start = %task.start_chunk_id,
            end = %task.end_chunk_id,
            updated,
            "shard reclustering complete"
        );
        Ok(updated)
    }

    /// Re-clusters one chunk and writes the new state.
    async fn recluster_chunk(&self, ruleset: &Ruleset, entry: &ChunkState) -> DomainResult<()> {
        let chunk = self.chunk_store.get(&entry.project, &entry.object_id).await?;
        if chunk.failures.len() != entry.clusters.len() {
            return Err(DomainError::Serialization(format!(
                "chunk {} has {} failures but state has {} cluster entries",
                entry.chunk_id,
                chunk.failures.len(),
                entry.clusters.len()
            )));
        }

        let mut clusters = Vec::with_capacity(chunk.failures.len());
        for (index, failure) in chunk.failures.iter().enumerate() {
            let existing = entry.matched_rule_ids(index);
            clusters.push(cluster_failure(ruleset, entry.rules_version, existing, failure));
        }

        let new_entry = ChunkState {
            algorithms_version: ALGORITHMS_VERSION,
            rules_version: ruleset.version(),
            clusters,
            ..entry.clone()
        };
        new_entry
            .validate()
            .map_err(DomainError::ValidationFailed)?;
        self.state_repository.update(&new_entry).await?;
        debug!(chunk_id = %entry.chunk_id, "chunk re-clustered");
        Ok(())
    }
}
