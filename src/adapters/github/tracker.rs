//! GitHub Issues implementation of the issue-tracker port.
//!
//! Bug identities use the form `owner/repo/number`; priorities map to
//! labels (`P0`..`P3`) alongside a marker label identifying issues
//! managed by this pipeline.

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::BugId;
use crate::domain::ports::{IssueTracker, NewIssue};

use super::client::GitHubClient;
use super::models::{GitHubCreateIssueRequest, GitHubIssueUpdateRequest};

/// The tracker system name recorded on bug identities.
pub const SYSTEM: &str = "github";

/// Label marking issues managed by the pipeline.
const MANAGED_LABEL: &str = "auto-filed";

pub struct GitHubTracker {
    client: GitHubClient,
    owner: String,
    repo: String,
}

impl GitHubTracker {
    pub fn new(client: GitHubClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { client, owner: owner.into(), repo: repo.into() }
    }

    fn issue_number(&self, bug: &BugId) -> DomainResult<u64> {
        if bug.system != SYSTEM {
            return Err(DomainError::IssueTracker(format!(
                "bug {bug} does not belong to the {SYSTEM} tracker"
            )));
        }
        let number = bug
            .id
            .rsplit('/')
            .next()
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(|| DomainError::IssueTracker(format!("malformed bug ID {bug}")))?;
        Ok(number)
    }

    fn labels_for(priority: Option<&str>) -> Vec<String> {
        let mut labels = vec![MANAGED_LABEL.to_string()];
        if let Some(p) = priority {
            labels.push(p.to_string());
        }
        labels
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    async fn create_issue(&self, issue: &NewIssue) -> DomainResult<BugId> {
        let request = GitHubCreateIssueRequest {
            title: issue.title.clone(),
            body: Some(issue.body.clone()),
            labels: Some(Self::labels_for(issue.priority.as_deref())),
        };
        let response = self.client.create_issue(&self.owner, &self.repo, &request).await?;
        Ok(BugId::new(
            SYSTEM,
            format!("{}/{}/{}", self.owner, self.repo, response.number),
        ))
    }

    async fn update_priority(&self, bug: &BugId, priority: &str) -> DomainResult<()> {
        let number = self.issue_number(bug)?;
        let request = GitHubIssueUpdateRequest {
            labels: Some(Self::labels_for(Some(priority))),
            ..GitHubIssueUpdateRequest::default()
        };
        self.client.update_issue(&self.owner, &self.repo, number, &request).await?;
        Ok(())
    }

    async fn close_issue(&self, bug: &BugId) -> DomainResult<()> {
        let number = self.issue_number(bug)?;
        let request = GitHubIssueUpdateRequest {
            state: Some("closed".to_string()),
            state_reason: Some("completed".to_string()),
            ..GitHubIssueUpdateRequest::default()
        };
        self.client.update_issue(&self.owner, &self.repo, number, &request).await?;
        Ok(())
    }
}
