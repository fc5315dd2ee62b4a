use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::ChunkState;

/// Options for [`StateRepository::read_next_n`].
#[derive(Debug, Clone)]
pub struct ReadNextOptions {
    /// Exclusive lower bound of the chunk ID range. Empty string reads
    /// from the start of the keyspace.
    pub start_chunk_id: String,
    /// Inclusive upper bound of the chunk ID range.
    pub end_chunk_id: String,
    /// The algorithms version re-clustering wants to achieve. Rows
    /// below this version are eligible to be read.
    pub algorithms_version: i64,
    /// The rules version re-clustering wants to achieve. Rows below
    /// this version are eligible to be read.
    pub rules_version: DateTime<Utc>,
}

/// Repository port for per-chunk clustering state.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Insert clustering state for a chunk.
    async fn create(&self, entry: &ChunkState) -> DomainResult<()>;

    /// Read clustering state for a chunk.
    async fn get(&self, project: &str, chunk_id: &str) -> DomainResult<Option<ChunkState>>;

    /// Overwrite the clustering state of a chunk.
    async fn update(&self, entry: &ChunkState) -> DomainResult<()>;

    /// The next `n` entries in ascending chunk ID order within the
    /// range that are below either target version.
    async fn read_next_n(
        &self,
        project: &str,
        opts: &ReadNextOptions,
        n: usize,
    ) -> DomainResult<Vec<ChunkState>>;

    /// Estimate of the total number of chunks in the project, derived
    /// from the keyspace position of the 100th chunk.
    async fn estimate_chunks(&self, project: &str) -> DomainResult<u64>;
}
