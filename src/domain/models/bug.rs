//! Bug identities and bug-to-cluster associations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cluster::ClusterId;

/// The identity of a bug in an issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BugId {
    /// The tracker the bug lives in, e.g. "github".
    pub system: String,
    /// Tracker-specific identifier, e.g. "owner/repo/123".
    pub id: String,
}

impl BugId {
    pub fn new(system: impl Into<String>, id: impl Into<String>) -> Self {
        Self { system: system.into(), id: id.into() }
    }
}

impl fmt::Display for BugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.id)
    }
}

/// Mapping from an issue-tracker bug to the cluster that caused it to be
/// filed. Created when a cluster's impact crosses the filing threshold;
/// deactivated (never deleted) when the impact subsides and the bug is
/// closed. A cluster has at most one active association at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugCluster {
    /// The project the association belongs to.
    pub project: String,
    /// The bug that was filed.
    pub bug: BugId,
    /// The cluster the bug was filed for.
    pub cluster_id: ClusterId,
    /// Whether the association (and the bug) is still being managed.
    pub is_active: bool,
    /// The priority last written to the tracker, used to detect no-op
    /// updates without a tracker read.
    #[serde(default)]
    pub priority: Option<String>,
    /// When the association was created.
    pub creation_time: DateTime<Utc>,
    /// When the association last changed.
    pub last_updated: DateTime<Utc>,
}
