//! Configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid reclustering_workers: {0}. Must be between 1 and 1000")]
    InvalidWorkerCount(usize),

    #[error("Invalid reclustering_interval_minutes: {0}. Must be at least 1")]
    InvalidInterval(u32),

    #[error("Invalid max_bugs_filed_per_run: {0}. Must be at least 1")]
    InvalidFilingCap(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Project {project}: bug filing threshold has no satisfiable window")]
    UnsatisfiableThreshold { project: String },

    #[error("Project {project}: priority band {index} has an empty priority name")]
    EmptyPriorityName { project: String, index: usize },
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .failsift/config.yaml (project config)
    /// 3. .failsift/local.yaml (local overrides, optional)
    /// 4. Environment variables (FAILSIFT_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".failsift/config.yaml"))
            .merge(Yaml::file(".failsift/local.yaml"))
            .merge(Env::prefixed("FAILSIFT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.reclustering_workers == 0 || config.reclustering_workers > 1000 {
            return Err(ConfigError::InvalidWorkerCount(config.reclustering_workers));
        }
        if config.reclustering_interval_minutes == 0 {
            return Err(ConfigError::InvalidInterval(config.reclustering_interval_minutes));
        }
        if config.max_bugs_filed_per_run == 0 {
            return Err(ConfigError::InvalidFilingCap(config.max_bugs_filed_per_run));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        for (project, project_config) in &config.projects {
            let t = &project_config.bug_filing_threshold;
            if t.unexpected_failures_1d.is_none()
                && t.unexpected_failures_3d.is_none()
                && t.unexpected_failures_7d.is_none()
            {
                return Err(ConfigError::UnsatisfiableThreshold { project: project.clone() });
            }
            for (index, band) in project_config.priorities.iter().enumerate() {
                if band.priority.is_empty() {
                    return Err(ConfigError::EmptyPriorityName {
                        project: project.clone(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::models::{ImpactThreshold, ProjectConfig};

    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = Config { reclustering_workers: 0, ..Config::default() };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn project_without_thresholds_is_rejected() {
        let mut config = Config::default();
        config.projects.insert("p".into(), ProjectConfig::default());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::UnsatisfiableThreshold { .. })
        ));
    }

    #[test]
    fn project_with_threshold_validates() {
        let mut config = Config::default();
        config.projects.insert(
            "p".into(),
            ProjectConfig {
                bug_filing_threshold: ImpactThreshold {
                    unexpected_failures_1d: Some(10),
                    ..ImpactThreshold::default()
                },
                priorities: vec![],
            },
        );
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
