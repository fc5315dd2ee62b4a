//! Cluster impact metrics.
//!
//! Impact is computed by the external analytics layer and read through
//! the [`ImpactReader`](crate::domain::ports::ImpactReader) port. The
//! pipeline only interprets it: thresholds gate bug filing, and
//! priority bands map impact onto tracker priorities.

use serde::{Deserialize, Serialize};

use super::cluster::ClusterId;

/// A single impact figure in its three variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// The raw count.
    pub nominal: i64,
    /// The count before exonerations (known-flaky retries) are removed.
    pub pre_exoneration: i64,
    /// The count remaining after excluding failures attributable to
    /// exonerations. Filing and priority decisions use this variant.
    pub residual: i64,
}

impl Counts {
    pub fn residual(residual: i64) -> Self {
        Self { nominal: residual, pre_exoneration: residual, residual }
    }
}

/// Aggregate impact attributed to one cluster over rolling windows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterImpact {
    /// The cluster the impact is attributed to.
    pub cluster_id: ClusterId,
    /// Unexpected-failure counts over 1/3/7-day windows.
    pub failures_1d: Counts,
    pub failures_3d: Counts,
    pub failures_7d: Counts,
    /// Presubmit-reject counts over 1/3/7-day windows.
    pub presubmit_rejects_1d: Counts,
    pub presubmit_rejects_3d: Counts,
    pub presubmit_rejects_7d: Counts,
    /// An example primary error message from the cluster, if any.
    #[serde(default)]
    pub example_failure_reason: Option<String>,
    /// The most frequent test IDs in the cluster, most frequent first.
    #[serde(default)]
    pub top_test_ids: Vec<String>,
}

impl ClusterImpact {
    /// Whether any residual unexpected-failure window meets the
    /// threshold.
    pub fn meets_threshold(&self, threshold: &ImpactThreshold) -> bool {
        meets(self.failures_1d.residual, threshold.unexpected_failures_1d)
            || meets(self.failures_3d.residual, threshold.unexpected_failures_3d)
            || meets(self.failures_7d.residual, threshold.unexpected_failures_7d)
    }

    /// A single figure used to order filing candidates, highest first.
    pub fn ranking_value(&self) -> i64 {
        self.failures_1d
            .residual
            .max(self.failures_3d.residual)
            .max(self.failures_7d.residual)
    }
}

fn meets(value: i64, threshold: Option<i64>) -> bool {
    // An absent threshold is unsatisfiable.
    threshold.is_some_and(|t| value >= t)
}

/// The impact a cluster must reach before a bug is filed for it.
/// Any satisfied window is sufficient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactThreshold {
    #[serde(default)]
    pub unexpected_failures_1d: Option<i64>,
    #[serde(default)]
    pub unexpected_failures_3d: Option<i64>,
    #[serde(default)]
    pub unexpected_failures_7d: Option<i64>,
}

/// One priority band: the bug priority to apply once a cluster's impact
/// meets the band's threshold. Bands are configured most severe first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBand {
    /// The tracker priority label, e.g. "P0".
    pub priority: String,
    /// The impact required to place a cluster in this band.
    pub threshold: ImpactThreshold,
}

/// Selects the priority for the given impact: the first (most severe)
/// band whose threshold is met, or the least severe band if none is.
pub fn priority_for(impact: &ClusterImpact, bands: &[PriorityBand]) -> Option<String> {
    for band in bands {
        if impact.meets_threshold(&band.threshold) {
            return Some(band.priority.clone());
        }
    }
    bands.last().map(|b| b.priority.clone())
}
