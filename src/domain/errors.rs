//! Domain errors for the failsift pipeline.

use thiserror::Error;

/// Domain-level errors that can occur in the failsift system.
///
/// Variants follow the error taxonomy of the pipeline: configuration
/// errors abort a single project's cycle, transient store/tracker errors
/// are surfaced to the task-queue layer for retry, data errors are logged
/// and skipped by callers, and planning conflicts fail closed.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Rule not found: {project}/{rule_id}")]
    RuleNotFound { project: String, rule_id: String },

    #[error("Clustering state not found for chunk {chunk_id}")]
    ChunkStateNotFound { chunk_id: String },

    #[error("No reclustering run exists for project {0}")]
    RunNotFound(String),

    #[error("An attempt which overlaps the proposed attempt already exists")]
    OverlappingAttempt,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Issue tracker error: {0}")]
    IssueTracker(String),

    #[error("Analysis read failed: {0}")]
    Analysis(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
