//! Failsift - test-failure clustering and bug automation.
//!
//! Failsift groups failing test executions into clusters with
//! deterministic algorithms, re-evaluates cluster membership over the
//! chunk keyspace as rules change, and files, updates and closes
//! issue-tracker bugs as cluster impact crosses configured thresholds.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain** (`domain`): models, ports and errors
//! - **Clustering** (`clustering`): the pure clustering algorithms and
//!   the ruleset cache
//! - **Services** (`services`): the reclustering orchestrator and
//!   worker, and the bug cluster updater
//! - **Adapters** (`adapters`): SQLite store, GitHub issue tracker,
//!   analytics impact reader
//! - **Infrastructure** (`infrastructure`): configuration and logging
//! - **CLI** (`cli`): command-line entry points

pub mod adapters;
pub mod cli;
pub mod clustering;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use clustering::{Ruleset, ALGORITHMS_VERSION};
pub use domain::models::{
    BugCluster, BugId, Chunk, ChunkState, ClusterId, ClusterImpact, Config, Failure,
    ImpactThreshold, PriorityBand, ReclusteringRun, Rule, ShardTask,
};
pub use domain::ports::{
    BugClusterRepository, ChunkStore, ImpactReader, IssueTracker, RuleRepository, RunRepository,
    ShardQueue, StateRepository,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::{ConfigError, ConfigLoader};
pub use services::{BugUpdater, Orchestrator, Worker};
