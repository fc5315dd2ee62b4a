//! Domain models.

pub mod bug;
pub mod chunk_state;
pub mod cluster;
pub mod config;
pub mod failure;
pub mod impact;
pub mod rule;
pub mod run;

pub use bug::{BugCluster, BugId};
pub use chunk_state::ChunkState;
pub use cluster::{ClusterId, ALGORITHM_RE, CHUNK_RE, END_OF_KEYSPACE};
pub use config::{Config, DatabaseConfig, IssueTrackerConfig, LoggingConfig, ProjectConfig};
pub use failure::{Chunk, Failure};
pub use impact::{priority_for, ClusterImpact, Counts, ImpactThreshold, PriorityBand};
pub use rule::{starting_epoch, Rule, RULE_ID_RE};
pub use run::{ReclusteringRun, ShardTask, SHARD_COMPLETE};
