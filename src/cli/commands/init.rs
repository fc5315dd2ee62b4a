//! `failsift init`: create the database and apply migrations.

use anyhow::{Context, Result};

use crate::adapters::sqlite::{all_migrations, Migrator};

use super::CommandContext;

pub async fn execute(config_path: Option<&std::path::Path>) -> Result<()> {
    let ctx = CommandContext::open(config_path).await?;
    let migrator = Migrator::new(ctx.pool.clone());
    let applied = migrator
        .run_embedded_migrations(all_migrations())
        .await
        .context("failed to run migrations")?;
    println!(
        "database ready at {} ({} migration(s) applied)",
        ctx.config.database.path, applied
    );
    Ok(())
}
