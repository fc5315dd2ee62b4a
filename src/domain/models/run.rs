//! Reclustering runs and shard tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress value reported by a shard that has finished its range.
pub const SHARD_COMPLETE: i64 = 1000;

/// One orchestrator-initiated re-clustering attempt for a project.
///
/// A run records the goal of the attempt: the rules version and
/// algorithms version every chunk in the project should reach. Progress
/// accumulates from 0 to `1000 * shard_count` as workers report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclusteringRun {
    /// The project being re-clustered.
    pub project: String,
    /// The time the attempt is scheduled to complete by; identifies the
    /// run within the project.
    pub attempt_timestamp: DateTime<Utc>,
    /// The number of shards the keyspace was split into.
    pub shard_count: i64,
    /// How many shards have reported progress at least once.
    pub shards_reported: i64,
    /// Total progress, between 0 and `1000 * shard_count`.
    pub progress: i64,
    /// The rules version this run is re-clustering towards.
    pub rules_version: DateTime<Utc>,
    /// The algorithms version this run is re-clustering towards.
    pub algorithms_version: i64,
}

impl ReclusteringRun {
    /// Normalized progress of the run, from 0 to 1000.
    pub fn normalized_progress(&self) -> i64 {
        if self.shard_count == 0 {
            return 0;
        }
        self.progress / self.shard_count
    }

    /// Whether every shard reached its re-clustering goal.
    pub fn is_complete(&self) -> bool {
        self.normalized_progress() == SHARD_COMPLETE
    }
}

/// The payload of one reclustering worker task: a contiguous sub-range
/// of the chunk keyspace to bring up to the run's goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardTask {
    /// The project to re-cluster.
    pub project: String,
    /// Attempt timestamp of the owning run.
    pub attempt_time: DateTime<Utc>,
    /// Exclusive lower bound of the shard's chunk ID range. The empty
    /// string denotes the start of the keyspace.
    pub start_chunk_id: String,
    /// Inclusive upper bound of the shard's chunk ID range.
    pub end_chunk_id: String,
}

impl ShardTask {
    /// The task's dedup title, derived from (project, attempt time,
    /// shard index) so duplicate enqueues collapse.
    pub fn title(&self, shard_index: usize) -> String {
        format!(
            "{}-{}-shard-{}",
            self.project,
            self.attempt_time.format("%Y%m%d-%H%M%S"),
            shard_index + 1
        )
    }
}
