//! SQLite implementations of the durable-store ports.

pub mod bug_repository;
pub mod chunk_store;
pub mod connection;
pub mod migrations;
pub mod rule_repository;
pub mod run_repository;
pub mod shard_queue;
pub mod state_repository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::errors::{DomainError, DomainResult};

pub use bug_repository::SqliteBugClusterRepository;
pub use chunk_store::SqliteChunkStore;
pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use migrations::{all_migrations, initial_schema_migration, Migration, MigrationError, Migrator};
pub use rule_repository::SqliteRuleRepository;
pub use run_repository::SqliteRunRepository;
pub use shard_queue::SqliteShardQueue;
pub use state_repository::SqliteStateRepository;

/// Formats a timestamp for storage. Fixed-width microsecond precision
/// with a `Z` suffix, so lexicographic order matches chronological
/// order and MAX()/ORDER BY over the column behave.
pub(crate) fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp.
pub(crate) fn parse_ts(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::Serialization(format!("invalid timestamp {s:?}: {e}")))
}
