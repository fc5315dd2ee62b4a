//! Per-chunk clustering state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cluster::{ClusterId, CHUNK_RE};

/// The clustering state of one chunk: which algorithm and rules versions
/// the chunk was last evaluated against, and the clusters each failure
/// is in. Mutated in place by reclustering workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkState {
    /// The project the chunk belongs to.
    pub project: String,
    /// Identity of the chunk: the 128-bit key as 32 lowercase hex
    /// characters, assigned by ingestion.
    pub chunk_id: String,
    /// Address of the chunk's failures in the chunk store.
    pub object_id: String,
    /// Start of the retention period of the failures in the chunk.
    pub partition_time: DateTime<Utc>,
    /// The algorithms version the clusters were computed with.
    pub algorithms_version: i64,
    /// The rules version the chunk was last evaluated against. Only
    /// rules whose predicate changed after this need re-evaluation.
    pub rules_version: DateTime<Utc>,
    /// Clusters per failure, positionally aligned with the chunk's
    /// failures. Rules-algorithm entries carry the matched rule IDs.
    pub clusters: Vec<Vec<ClusterId>>,
}

impl ChunkState {
    /// Validates the entry before it is written to the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.project.is_empty() {
            return Err("project must be specified".into());
        }
        if !CHUNK_RE.is_match(&self.chunk_id) {
            return Err(format!("chunk ID {:?} is not valid", self.chunk_id));
        }
        if self.object_id.is_empty() {
            return Err("object ID must be specified".into());
        }
        if self.algorithms_version <= 0 {
            return Err("algorithms version must be specified".into());
        }
        // Each chunk must hold at least one failure, even if that
        // failure is in no clusters.
        if self.clusters.is_empty() {
            return Err("there must be clustered failures in the chunk".into());
        }
        for (i, failure_clusters) in self.clusters.iter().enumerate() {
            for (j, c) in failure_clusters.iter().enumerate() {
                c.validate()
                    .map_err(|e| format!("failure {i}: cluster {j}: {e}"))?;
            }
        }
        Ok(())
    }

    /// The rule IDs the given failure currently matches, per the
    /// rules-based algorithm entries in its cluster list.
    pub fn matched_rule_ids(&self, failure_index: usize) -> Vec<String> {
        self.clusters
            .get(failure_index)
            .map(|cs| {
                cs.iter()
                    .filter(|c| c.is_rules_cluster())
                    .map(|c| c.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
