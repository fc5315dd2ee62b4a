//! Application services: the reclustering orchestrator and worker, and
//! the bug cluster updater.

pub mod bug_updater;
pub mod keyspace;
pub mod orchestrator;
pub mod worker;

pub use bug_updater::{BugUpdater, UpdateReport};
pub use keyspace::{estimate_chunks_from_id, shard_progress, worker_splits};
pub use orchestrator::{Orchestrator, TickReport};
pub use worker::Worker;
