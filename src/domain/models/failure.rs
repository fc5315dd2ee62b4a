//! Normalized test-failure records.
//!
//! Failures are produced by the ingestion pipeline and consumed
//! read-only by the clustering algorithms.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized test-execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Identifier of the test that failed.
    pub test_id: String,
    /// The way the test was run (e.g. OS, build flags). Keys are sorted
    /// so the serialized form is stable.
    #[serde(default)]
    pub variant: BTreeMap<String, String>,
    /// The primary error message of the failure, if any.
    #[serde(default)]
    pub reason: Option<String>,
    /// The partition time assigned to the failure by ingestion.
    pub partition_time: DateTime<Utc>,
}

impl Failure {
    /// The primary error message, or `None` if the failure carries none
    /// (or only whitespace).
    pub fn primary_error(&self) -> Option<&str> {
        self.reason.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// A fixed-size batch of ingested failures, the unit of re-clustering
/// work. Chunks are immutable once written by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The failures in the chunk, in ingestion order. Clustering results
    /// are stored positionally against this ordering.
    pub failures: Vec<Failure>,
}
