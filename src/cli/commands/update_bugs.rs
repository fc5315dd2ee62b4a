//! `failsift update-bugs`: one bug-update pass over every project.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::adapters::github::{GitHubClient, GitHubTracker};
use crate::adapters::sqlite::SqliteBugClusterRepository;
use crate::adapters::SqliteImpactReader;
use crate::services::BugUpdater;

use super::CommandContext;

pub async fn execute(config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = CommandContext::open(config_path).await?;

    let tracker = GitHubTracker::new(
        GitHubClient::from_env()?,
        ctx.config.issue_tracker.owner.clone(),
        ctx.config.issue_tracker.repo.clone(),
    );
    let updater = BugUpdater::new(
        ctx.config.clone(),
        Arc::new(SqliteImpactReader::new(ctx.pool.clone())),
        Arc::new(SqliteBugClusterRepository::new(ctx.pool.clone())),
        Arc::new(tracker),
    );

    let mut failures = 0usize;
    for (project, result) in updater.run().await {
        match result {
            Ok(report) => println!(
                "{project}: {} filed, {} deferred, {} closed, {} repriorized",
                report.filed, report.deferred, report.closed, report.repriorized
            ),
            Err(err) => {
                eprintln!("{project}: {err}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} project(s) failed to update");
    }
    Ok(())
}
