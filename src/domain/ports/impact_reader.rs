use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ClusterId, ClusterImpact, ImpactThreshold};

/// Port onto the analytics layer that aggregates per-cluster impact.
#[async_trait]
pub trait ImpactReader: Send + Sync {
    /// Clusters whose residual unexpected-failure impact meets the
    /// threshold in any window, plus every cluster in
    /// `always_include` (regardless of impact) so that existing bugs
    /// are always re-evaluated.
    async fn read_impactful_clusters(
        &self,
        project: &str,
        threshold: &ImpactThreshold,
        always_include: &[ClusterId],
    ) -> DomainResult<Vec<ClusterImpact>>;
}
