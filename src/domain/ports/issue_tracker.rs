use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::BugId;

/// A request to open a new bug.
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// One-line summary, typically an example failure reason.
    pub title: String,
    /// Issue body; carries the cluster fingerprint so an association
    /// that failed to record can be found again.
    pub body: String,
    /// Initial priority label, e.g. "P1".
    pub priority: Option<String>,
}

/// Port onto the external issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// File a new bug, returning its identity.
    async fn create_issue(&self, issue: &NewIssue) -> DomainResult<BugId>;

    /// Update only the bug's priority field.
    async fn update_priority(&self, bug: &BugId, priority: &str) -> DomainResult<()>;

    /// Close (verify) the bug.
    async fn close_issue(&self, bug: &BugId) -> DomainResult<()>;
}
