//! CLI command implementations.

pub mod init;
pub mod orchestrate;
pub mod status;
pub mod update_bugs;
pub mod worker;

use anyhow::{Context as _, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{create_pool, PoolConfig};
use crate::domain::models::Config;
use crate::infrastructure::ConfigLoader;

/// Shared command context: configuration and the database pool.
pub struct CommandContext {
    pub config: Config,
    pub pool: SqlitePool,
}

impl CommandContext {
    /// Loads config (from the given file or the default hierarchy) and
    /// opens the database pool.
    pub async fn open(config_path: Option<&std::path::Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        let pool_config = PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::default()
        };
        let pool = create_pool(&config.database.path, Some(pool_config))
            .await
            .context("failed to open database")?;
        Ok(Self { config, pool })
    }
}
