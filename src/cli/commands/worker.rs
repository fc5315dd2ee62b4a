//! `failsift worker`: drain pending shard tasks.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::adapters::sqlite::{
    SqliteChunkStore, SqliteRuleRepository, SqliteRunRepository, SqliteShardQueue,
    SqliteStateRepository,
};
use crate::domain::ports::ShardQueue;
use crate::services::Worker;

use super::CommandContext;

#[derive(Args)]
pub struct WorkerArgs {
    /// Maximum number of tasks to process (0 = drain the queue).
    #[arg(long, default_value_t = 0)]
    pub max_tasks: usize,
}

pub async fn execute(args: WorkerArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = CommandContext::open(config_path).await?;

    let queue = SqliteShardQueue::new(ctx.pool.clone());
    let worker = Worker::new(
        Arc::new(SqliteRunRepository::new(ctx.pool.clone())),
        Arc::new(SqliteStateRepository::new(ctx.pool.clone())),
        Arc::new(SqliteRuleRepository::new(ctx.pool.clone())),
        Arc::new(SqliteChunkStore::new(ctx.pool.clone())),
    );

    let mut processed = 0usize;
    while let Some(claimed) = queue.claim_next().await? {
        let updated = worker.process(&claimed.task).await?;
        queue.complete(claimed.id).await?;
        processed += 1;
        println!(
            "{}: shard ({}, {}] done, {} chunk(s) updated",
            claimed.task.project, claimed.task.start_chunk_id, claimed.task.end_chunk_id, updated
        );
        if args.max_tasks != 0 && processed >= args.max_tasks {
            break;
        }
    }
    println!("{processed} task(s) processed");
    Ok(())
}
