//! Ports (interfaces) onto external collaborators: the durable store,
//! the chunk store, the analytics layer, the issue tracker and the
//! task-queue transport.

pub mod bug_repository;
pub mod chunk_store;
pub mod impact_reader;
pub mod issue_tracker;
pub mod rule_repository;
pub mod run_repository;
pub mod shard_queue;
pub mod state_repository;

pub use bug_repository::BugClusterRepository;
pub use chunk_store::ChunkStore;
pub use impact_reader::ImpactReader;
pub use issue_tracker::{IssueTracker, NewIssue};
pub use rule_repository::RuleRepository;
pub use run_repository::RunRepository;
pub use shard_queue::{ClaimedShardTask, ShardQueue};
pub use state_repository::{ReadNextOptions, StateRepository};
