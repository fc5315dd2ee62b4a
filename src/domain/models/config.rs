use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::impact::{ImpactThreshold, PriorityBand};

/// Main configuration structure for failsift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Total reclustering worker budget, shared across all projects.
    /// Zero disables reclustering.
    #[serde(default = "default_reclustering_workers")]
    pub reclustering_workers: usize,

    /// Minutes between orchestrator attempts. Zero disables
    /// reclustering.
    #[serde(default = "default_reclustering_interval_minutes")]
    pub reclustering_interval_minutes: u32,

    /// Maximum number of new bugs the updater files in one pass.
    #[serde(default = "default_max_bugs_filed_per_run")]
    pub max_bugs_filed_per_run: usize,

    /// Per-project configuration, keyed by project name. Projects are
    /// iterated in lexicographic order so fractional worker allocation
    /// is reproducible.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Issue tracker configuration.
    #[serde(default)]
    pub issue_tracker: IssueTrackerConfig,
}

const fn default_reclustering_workers() -> usize {
    8
}

const fn default_reclustering_interval_minutes() -> u32 {
    5
}

const fn default_max_bugs_filed_per_run() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reclustering_workers: default_reclustering_workers(),
            reclustering_interval_minutes: default_reclustering_interval_minutes(),
            max_bugs_filed_per_run: default_max_bugs_filed_per_run(),
            projects: BTreeMap::new(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            issue_tracker: IssueTrackerConfig::default(),
        }
    }
}

/// Per-project thresholds and priority mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectConfig {
    /// Impact a cluster must reach before a bug is filed.
    #[serde(default)]
    pub bug_filing_threshold: ImpactThreshold,

    /// Priority bands, most severe first.
    #[serde(default)]
    pub priorities: Vec<PriorityBand>,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".failsift/failsift.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Issue tracker (GitHub Issues) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IssueTrackerConfig {
    /// Repository owner the bugs are filed under.
    #[serde(default)]
    pub owner: String,

    /// Repository name the bugs are filed under.
    #[serde(default)]
    pub repo: String,
}
