//! `failsift status`: reclustering progress per project.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::adapters::sqlite::SqliteRunRepository;
use crate::domain::ports::RunRepository;

use super::CommandContext;

pub async fn execute(config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = CommandContext::open(config_path).await?;
    let runs = SqliteRunRepository::new(ctx.pool.clone());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "project",
        "attempt",
        "shards",
        "reported",
        "progress",
        "rules version",
        "algorithms",
    ]);

    for project in ctx.config.projects.keys() {
        match runs.read_last(project).await? {
            Some(run) => {
                table.add_row(vec![
                    project.clone(),
                    run.attempt_timestamp.to_rfc3339(),
                    run.shard_count.to_string(),
                    run.shards_reported.to_string(),
                    format!("{}/1000", run.normalized_progress()),
                    run.rules_version.to_rfc3339(),
                    run.algorithms_version.to_string(),
                ]);
            }
            None => {
                table.add_row(vec![project.clone(), "no runs yet".to_string()]);
            }
        }
    }

    println!("{table}");
    Ok(())
}
