//! The reclustering orchestrator.
//!
//! Runs on a fixed-interval tick. Each attempt allocates the worker
//! budget across projects, records a new reclustering run per project
//! and enqueues one shard task per worker, covering the whole chunk
//! keyspace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{info, warn};

use crate::clustering::ALGORITHMS_VERSION;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, ReclusteringRun, ShardTask};
use crate::domain::ports::{RuleRepository, RunRepository, ShardQueue, StateRepository};

use super::keyspace::worker_splits;

/// The outcome of one orchestrator tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// True when the tick did not align to an interval boundary (or
    /// reclustering is disabled) and no work was attempted.
    pub skipped: bool,
    /// Projects that completed planning successfully.
    pub succeeded: Vec<String>,
    /// Per-project planning errors. One project's failure never blocks
    /// the others.
    pub failed: Vec<(String, DomainError)>,
}

impl TickReport {
    fn skipped() -> Self {
        Self { skipped: true, ..Self::default() }
    }
}

/// Periodic planner that fans re-clustering work out to shard workers.
pub struct Orchestrator {
    config: Config,
    run_repository: Arc<dyn RunRepository>,
    state_repository: Arc<dyn StateRepository>,
    rule_repository: Arc<dyn RuleRepository>,
    shard_queue: Arc<dyn ShardQueue>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        run_repository: Arc<dyn RunRepository>,
        state_repository: Arc<dyn StateRepository>,
        rule_repository: Arc<dyn RuleRepository>,
        shard_queue: Arc<dyn ShardQueue>,
    ) -> Self {
        Self { config, run_repository, state_repository, rule_repository, shard_queue }
    }

    /// Handles one cron invocation at time `now`.
    ///
    /// Returns a configuration error when the worker budget cannot
    /// cover the configured projects; per-project planning errors are
    /// collected in the report instead of aborting the tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> DomainResult<TickReport> {
        let projects: Vec<String> = self.config.projects.keys().cloned().collect();
        if projects.is_empty() {
            return Ok(TickReport::skipped());
        }

        let workers = self.config.reclustering_workers;
        let interval_minutes = i64::from(self.config.reclustering_interval_minutes);
        if workers == 0 || interval_minutes == 0 {
            warn!("reclustering is disabled by configuration");
            return Ok(TickReport::skipped());
        }

        // The cron transport may deliver more than once per interval.
        // Only the invocation whose minute lands exactly on an interval
        // boundary proceeds.
        let interval = Duration::minutes(interval_minutes);
        let current_minute = truncate_to(now, Duration::minutes(1));
        let attempt_start = truncate_to(now, interval);
        if attempt_start != current_minute {
            info!(
                attempt_start = %attempt_start,
                current_minute = %current_minute,
                "tick does not align to the reclustering interval; skipping"
            );
            return Ok(TickReport::skipped());
        }
        let attempt_end = attempt_start + interval;

        let worker_counts = self.project_worker_counts(&projects, workers).await?;

        let mut report = TickReport::default();
        for project in &projects {
            let allocated = worker_counts[project];
            match self
                .orchestrate_project(project, attempt_start, attempt_end, allocated)
                .await
            {
                Ok(()) => report.succeeded.push(project.clone()),
                Err(e) => {
                    warn!(project = %project, error = %e, "project reclustering cycle failed");
                    report.failed.push((project.clone(), e));
                }
            }
        }
        Ok(report)
    }

    /// Distributes the worker budget across projects: one worker each,
    /// with the remainder allocated proportional to each project's
    /// estimated chunk count. Projects are visited in sorted order so
    /// fractional rounding is reproducible between ticks.
    async fn project_worker_counts(
        &self,
        projects: &[String],
        workers: usize,
    ) -> DomainResult<HashMap<String, usize>> {
        let mut chunks_by_project = HashMap::new();
        let mut total_chunks: u64 = 0;
        for project in projects {
            let estimate = self.state_repository.estimate_chunks(project).await?;
            chunks_by_project.insert(project.clone(), estimate);
            total_chunks += estimate;
        }

        let mut free_workers = workers
            .checked_sub(projects.len())
            .ok_or_else(|| {
                DomainError::Configuration("more projects configured than workers".into())
            })?;

        let mut result = HashMap::new();
        let mut remaining_chunks = total_chunks;
        for project in projects {
            let project_chunks = chunks_by_project[project];
            let additional = if remaining_chunks == 0 {
                0
            } else {
                usize::try_from(
                    u64::try_from(free_workers).unwrap_or(u64::MAX) * project_chunks
                        / remaining_chunks,
                )
                .unwrap_or(0)
            };
            remaining_chunks -= project_chunks;
            free_workers -= additional;
            result.insert(project.clone(), 1 + additional);
        }
        Ok(result)
    }

    /// Plans one project's attempt: records the new run and enqueues
    /// its shard tasks.
    async fn orchestrate_project(
        &self,
        project: &str,
        attempt_start: DateTime<Utc>,
        attempt_end: DateTime<Utc>,
        workers: usize,
    ) -> DomainResult<()> {
        let run = self.create_project_run(project, attempt_start, attempt_end, workers).await?;
        self.schedule_workers(&run).await?;
        info!(
            project = %project,
            attempt = %attempt_end,
            shards = run.shard_count,
            rules_version = %run.rules_version,
            algorithms_version = run.algorithms_version,
            "reclustering run planned"
        );
        Ok(())
    }

    /// Creates the run row for this attempt, transactionally with the
    /// read of the previous run so overlapping attempts fail closed.
    async fn create_project_run(
        &self,
        project: &str,
        attempt_start: DateTime<Utc>,
        attempt_end: DateTime<Utc>,
        workers: usize,
    ) -> DomainResult<ReclusteringRun> {
        // Read the freshest goal before entering the transaction; a
        // target that lags by one tick only delays convergence.
        let latest_rules_version = self.rule_repository.read_last_updated(project).await?;

        let shard_count = i64::try_from(workers)
            .map_err(|_| DomainError::Configuration("worker count out of range".into()))?;
        let previous_progress = AtomicI64::new(0);
        let run = self
            .run_repository
            .read_last_and_create(project, &|last| {
                let progress = last.map_or(1000, ReclusteringRun::normalized_progress);
                previous_progress.store(progress, Ordering::Relaxed);

                if let Some(last) = last {
                    if last.attempt_timestamp > attempt_start {
                        return Err(DomainError::OverlappingAttempt);
                    }
                }

                // Rules could change on every tick. If each new run
                // chased the latest version, chunks early in the
                // keyspace would be re-clustered over and over while the
                // tail stayed stale. Keeping the previous goal until a
                // run fully completes guarantees the whole keyspace
                // reaches one consistent target.
                let (rules_version, algorithms_version) = match last {
                    Some(last) if progress < 1000 => {
                        (last.rules_version, last.algorithms_version)
                    }
                    _ => (latest_rules_version, ALGORITHMS_VERSION),
                };

                Ok(ReclusteringRun {
                    project: project.to_string(),
                    attempt_timestamp: attempt_end,
                    shard_count,
                    shards_reported: 0,
                    progress: 0,
                    rules_version,
                    algorithms_version,
                })
            })
            .await?;

        info!(
            project = %project,
            previous_progress = previous_progress.load(Ordering::Relaxed),
            "previous run progress at attempt creation"
        );
        Ok(run)
    }

    /// Enqueues one task per shard. Each worker gets an equally large
    /// slice of the keyspace; task titles make duplicate enqueues
    /// collapse in the queue.
    async fn schedule_workers(&self, run: &ReclusteringRun) -> DomainResult<()> {
        let count = usize::try_from(run.shard_count)
            .map_err(|_| DomainError::Configuration("shard count out of range".into()))?;
        let splits = worker_splits(count);
        for (i, bounds) in splits.windows(2).enumerate() {
            let task = ShardTask {
                project: run.project.clone(),
                attempt_time: run.attempt_timestamp,
                start_chunk_id: bounds[0].clone(),
                end_chunk_id: bounds[1].clone(),
            };
            self.shard_queue.schedule(&task.title(i), &task).await?;
        }
        Ok(())
    }
}

/// Truncates a timestamp down to a multiple of `interval` since the
/// Unix epoch.
fn truncate_to(t: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval_secs = interval.num_seconds();
    let ts = t.timestamp();
    let truncated = ts - ts.rem_euclid(interval_secs);
    Utc.timestamp_opt(truncated, 0).single().expect("truncated timestamp is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_aligns_to_interval_boundaries() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 7, 30).unwrap();
        assert_eq!(
            truncate_to(t, Duration::minutes(5)),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap()
        );
        assert_eq!(
            truncate_to(t, Duration::minutes(1)),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 7, 0).unwrap()
        );
    }

    #[test]
    fn aligned_minute_is_its_own_truncation() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 10, 0).unwrap();
        assert_eq!(truncate_to(t, Duration::minutes(5)), t);
    }
}
