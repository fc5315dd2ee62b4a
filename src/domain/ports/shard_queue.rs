use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ShardTask;

/// A claimed shard task, with the handle needed to complete it.
#[derive(Debug, Clone)]
pub struct ClaimedShardTask {
    /// Queue-assigned identifier of the claim.
    pub id: i64,
    /// The task payload.
    pub task: ShardTask,
}

/// Port onto the task-queue transport carrying shard tasks. The
/// transport provides at-least-once delivery; tasks must therefore be
/// idempotent and safe to retry in full.
#[async_trait]
pub trait ShardQueue: Send + Sync {
    /// Enqueue a task. `title` is the dedup key: enqueuing the same
    /// title twice collapses to one task.
    async fn schedule(&self, title: &str, task: &ShardTask) -> DomainResult<()>;

    /// Claim the next pending task, if any.
    async fn claim_next(&self) -> DomainResult<Option<ClaimedShardTask>>;

    /// Mark a claimed task complete.
    async fn complete(&self, id: i64) -> DomainResult<()>;
}
