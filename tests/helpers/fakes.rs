//! In-memory fakes for external collaborators.

use std::sync::Mutex;

use async_trait::async_trait;

use failsift::domain::models::BugId;
use failsift::domain::ports::{IssueTracker, NewIssue};
use failsift::domain::DomainResult;

/// A recorded call against the fake tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Create { title: String, priority: Option<String> },
    UpdatePriority { bug: BugId, priority: String },
    Close { bug: BugId },
}

/// An issue held by the fake tracker.
#[derive(Debug, Clone)]
pub struct FakeIssue {
    pub bug: BugId,
    pub title: String,
    pub body: String,
    pub priority: Option<String>,
    pub open: bool,
}

/// In-memory issue tracker recording every mutation.
#[derive(Default)]
pub struct FakeIssueTracker {
    state: Mutex<FakeTrackerState>,
}

#[derive(Default)]
struct FakeTrackerState {
    next_number: u64,
    issues: Vec<FakeIssue>,
    calls: Vec<TrackerCall>,
}

impl FakeIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn issues(&self) -> Vec<FakeIssue> {
        self.state.lock().unwrap().issues.clone()
    }

    pub fn issue(&self, bug: &BugId) -> Option<FakeIssue> {
        self.state.lock().unwrap().issues.iter().find(|i| &i.bug == bug).cloned()
    }
}

#[async_trait]
impl IssueTracker for FakeIssueTracker {
    async fn create_issue(&self, issue: &NewIssue) -> DomainResult<BugId> {
        let mut state = self.state.lock().unwrap();
        state.next_number += 1;
        let bug = BugId::new("github", format!("owner/repo/{}", 100 + state.next_number));
        state.issues.push(FakeIssue {
            bug: bug.clone(),
            title: issue.title.clone(),
            body: issue.body.clone(),
            priority: issue.priority.clone(),
            open: true,
        });
        state.calls.push(TrackerCall::Create {
            title: issue.title.clone(),
            priority: issue.priority.clone(),
        });
        Ok(bug)
    }

    async fn update_priority(&self, bug: &BugId, priority: &str) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(issue) = state.issues.iter_mut().find(|i| &i.bug == bug) {
            issue.priority = Some(priority.to_string());
        }
        state.calls.push(TrackerCall::UpdatePriority {
            bug: bug.clone(),
            priority: priority.to_string(),
        });
        Ok(())
    }

    async fn close_issue(&self, bug: &BugId) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(issue) = state.issues.iter_mut().find(|i| &i.bug == bug) {
            issue.open = false;
        }
        state.calls.push(TrackerCall::Close { bug: bug.clone() });
        Ok(())
    }
}
