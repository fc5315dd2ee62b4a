use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Chunk;

/// Port for the store holding chunk payloads (the failures themselves).
/// Written by ingestion; read-only here.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Fetch the failures of a chunk by its object ID.
    async fn get(&self, project: &str, object_id: &str) -> DomainResult<Chunk>;
}
