use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{BugCluster, BugId, ClusterId};

/// Repository port for bug-to-cluster associations.
#[async_trait]
pub trait BugClusterRepository: Send + Sync {
    /// Insert a new association.
    async fn create(&self, bug_cluster: &BugCluster) -> DomainResult<()>;

    /// Update an existing association (deactivation, priority record).
    async fn update(&self, bug_cluster: &BugCluster) -> DomainResult<()>;

    /// All active associations in the project.
    async fn read_active(&self, project: &str) -> DomainResult<Vec<BugCluster>>;

    /// The active association for the given cluster, if any. A cluster
    /// has at most one.
    async fn get_active_by_cluster(
        &self,
        project: &str,
        cluster_id: &ClusterId,
    ) -> DomainResult<Option<BugCluster>>;

    /// The association for the given bug, active or not.
    async fn get_by_bug(&self, project: &str, bug: &BugId) -> DomainResult<Option<BugCluster>>;
}
