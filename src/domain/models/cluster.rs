//! Cluster identities.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches validly formed algorithm names, including their version
/// suffix (e.g. `reason-v1`).
pub static ALGORITHM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-.]{1,32}$").expect("algorithm regex is valid"));

/// Matches validly formed chunk IDs: 128 bits as lowercase hex.
pub static CHUNK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("chunk regex is valid"));

/// The highest chunk ID that can be stored; the inclusive end of the
/// chunk keyspace.
pub const END_OF_KEYSPACE: &str = "ffffffffffffffffffffffffffffffff";

/// The identity of a cluster: which algorithm produced it, and the
/// algorithm-specific identifier within that algorithm's cluster space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId {
    /// The name (and version) of the algorithm, e.g. `reason-v1`.
    pub algorithm: String,
    /// The algorithm-defined identifier, as lowercase hex. At most
    /// 16 bytes (32 hex characters).
    pub id: String,
}

impl ClusterId {
    pub fn new(algorithm: impl Into<String>, id: impl Into<String>) -> Self {
        Self { algorithm: algorithm.into(), id: id.into() }
    }

    /// Whether this cluster was produced by the rules-based algorithm,
    /// in which case `id` is a rule ID.
    pub fn is_rules_cluster(&self) -> bool {
        self.algorithm.starts_with("rules-")
    }

    /// Whether this cluster was produced by the reason-based algorithm.
    pub fn is_reason_cluster(&self) -> bool {
        self.algorithm.starts_with("reason-")
    }

    /// Validates the cluster ID is well formed.
    pub fn validate(&self) -> Result<(), String> {
        if !ALGORITHM_RE.is_match(&self.algorithm) {
            return Err(format!("algorithm {:?} is not valid", self.algorithm));
        }
        if self.id.is_empty() {
            return Err("cluster ID must be specified".into());
        }
        if self.id.len() > 32 {
            return Err(format!("cluster ID is too long ({} chars)", self.id.len()));
        }
        if !self.id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(format!("cluster ID {:?} is not lowercase hex", self.id));
        }
        Ok(())
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.algorithm, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_well_formed_ids() {
        let id = ClusterId::new("reason-v1", "00112233445566778899aabbccddeeff");
        assert!(id.validate().is_ok());
    }

    #[test]
    fn validate_rejects_uppercase_and_overlong_ids() {
        let upper = ClusterId::new("reason-v1", "AABB");
        assert!(upper.validate().is_err());

        let long = ClusterId::new("reason-v1", "0".repeat(33));
        assert!(long.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_algorithm_names() {
        let id = ClusterId::new("Reason_V1", "00");
        assert!(id.validate().is_err());
    }

    #[test]
    fn algorithm_family_checks() {
        assert!(ClusterId::new("rules-v1", "ab").is_rules_cluster());
        assert!(ClusterId::new("reason-v1", "ab").is_reason_cluster());
        assert!(!ClusterId::new("reason-v1", "ab").is_rules_cluster());
    }
}
