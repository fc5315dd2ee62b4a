//! `failsift orchestrate`: run one orchestrator tick.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use crate::adapters::sqlite::{
    SqliteRuleRepository, SqliteRunRepository, SqliteShardQueue, SqliteStateRepository,
};
use crate::services::Orchestrator;

use super::CommandContext;

#[derive(Args)]
pub struct OrchestrateArgs {
    /// Override the tick time (RFC 3339); defaults to now. The tick
    /// still only proceeds when the time aligns to the configured
    /// interval.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

pub async fn execute(args: OrchestrateArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = CommandContext::open(config_path).await?;

    let orchestrator = Orchestrator::new(
        ctx.config.clone(),
        Arc::new(SqliteRunRepository::new(ctx.pool.clone())),
        Arc::new(SqliteStateRepository::new(ctx.pool.clone())),
        Arc::new(SqliteRuleRepository::new(ctx.pool.clone())),
        Arc::new(SqliteShardQueue::new(ctx.pool.clone())),
    );

    let report = orchestrator.tick(args.at.unwrap_or_else(Utc::now)).await?;
    if report.skipped {
        println!("tick skipped (off-interval or reclustering disabled)");
        return Ok(());
    }
    for project in &report.succeeded {
        println!("{project}: run planned");
    }
    for (project, err) in &report.failed {
        eprintln!("{project}: {err}");
    }
    if !report.failed.is_empty() {
        bail!("{} project(s) failed to plan", report.failed.len());
    }
    Ok(())
}
