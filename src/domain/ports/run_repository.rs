use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::ReclusteringRun;

/// Repository port for reclustering runs.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// The most recent run for the project, by attempt timestamp.
    async fn read_last(&self, project: &str) -> DomainResult<Option<ReclusteringRun>>;

    /// Read the run with the given attempt timestamp.
    async fn get(
        &self,
        project: &str,
        attempt_timestamp: DateTime<Utc>,
    ) -> DomainResult<Option<ReclusteringRun>>;

    /// Atomically read the project's last run and create the next one.
    ///
    /// `create` receives the last run (if any) and either returns the
    /// run to insert or an error; the read and the insert happen in one
    /// transaction so two overlapping attempts for the same project
    /// cannot both succeed.
    async fn read_last_and_create(
        &self,
        project: &str,
        create: &(dyn for<'a> Fn(Option<&'a ReclusteringRun>) -> DomainResult<ReclusteringRun>
                      + Send
                      + Sync),
    ) -> DomainResult<ReclusteringRun>;

    /// Record the absolute progress (0..=1000) of one shard,
    /// identified by its start chunk ID, and fold the change into the
    /// run's aggregate progress atomically. The first report for a
    /// shard also counts it in `shards_reported`. Re-reporting the same
    /// value is a no-op, so retried shard tasks cannot inflate the
    /// aggregate.
    async fn report_shard_progress(
        &self,
        project: &str,
        attempt_timestamp: DateTime<Utc>,
        shard_start: &str,
        progress: i64,
    ) -> DomainResult<()>;
}
