//! Clustering algorithms and the ruleset cache.
//!
//! Algorithms are a closed set: the reason-based algorithm and the
//! rules-based algorithm. Both are pure and deterministic; adding an
//! algorithm means adding a variant here and bumping
//! [`ALGORITHMS_VERSION`].

pub mod predicate;
pub mod reason;
pub mod rules_based;
pub mod ruleset;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::models::{ClusterId, Failure};

pub use predicate::Predicate;
pub use ruleset::{CachedRule, Ruleset};

/// The version of the algorithm set. Incremented whenever any
/// algorithm's behavior (or the set itself) changes, which invalidates
/// previously computed chunk state.
pub const ALGORITHMS_VERSION: i64 = 1;

/// The suggesting (non-rules) algorithms, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestingAlgorithm {
    /// Clusters on canonicalized primary error messages.
    Reason,
}

impl SuggestingAlgorithm {
    /// All suggesting algorithms, in evaluation order.
    pub const ALL: &'static [SuggestingAlgorithm] = &[SuggestingAlgorithm::Reason];

    /// The stable name of the algorithm, including its version.
    pub fn name(self) -> &'static str {
        match self {
            SuggestingAlgorithm::Reason => reason::ALGORITHM_NAME,
        }
    }

    /// Cluster a failure, returning at most one cluster ID.
    pub fn cluster(self, failure: &Failure) -> Option<ClusterId> {
        match self {
            SuggestingAlgorithm::Reason => reason::cluster(failure),
        }
    }
}

/// Computes the full new cluster set for one failure: every suggesting
/// algorithm's cluster plus the incrementally updated rule matches.
///
/// `existing_rule_matches` are the rule IDs matched when the failure
/// was last evaluated at `last_evaluated`; the ruleset must be at least
/// as new as the target rules version. The result is sorted so the
/// stored form is stable.
pub fn cluster_failure(
    ruleset: &Ruleset,
    last_evaluated: DateTime<Utc>,
    existing_rule_matches: Vec<String>,
    failure: &Failure,
) -> Vec<ClusterId> {
    let mut matched: HashSet<String> = existing_rule_matches.into_iter().collect();
    rules_based::cluster(ruleset, last_evaluated, &mut matched, failure);

    let mut clusters: Vec<ClusterId> = SuggestingAlgorithm::ALL
        .iter()
        .filter_map(|a| a.cluster(failure))
        .collect();
    clusters.extend(matched.into_iter().map(|id| rules_based::cluster_id(&id)));
    clusters.sort();
    clusters
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::domain::models::Rule;

    use super::*;

    #[test]
    fn algorithm_names_are_well_formed() {
        for a in SuggestingAlgorithm::ALL {
            assert!(
                crate::domain::models::ALGORITHM_RE.is_match(a.name()),
                "bad algorithm name {:?}",
                a.name()
            );
        }
        assert!(crate::domain::models::ALGORITHM_RE.is_match(rules_based::ALGORITHM_NAME));
    }

    #[test]
    fn cluster_failure_combines_reason_and_rules() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(1);
        let ruleset = Ruleset::new(
            "p",
            t1,
            vec![Rule {
                project: "p".into(),
                rule_id: "a".repeat(32),
                definition: r#"test = "t""#.into(),
                is_active: true,
                predicate_last_updated: t1,
                creation_time: t1,
                last_updated: t1,
                source_cluster: None,
            }],
        );
        let failure = Failure {
            test_id: "t".into(),
            variant: Default::default(),
            reason: Some("boom at 0xdeadbeef".into()),
            partition_time: Utc::now(),
        };

        let clusters = cluster_failure(&ruleset, t0, vec![], &failure);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().any(ClusterId::is_reason_cluster));
        assert!(clusters.iter().any(ClusterId::is_rules_cluster));
    }

    #[test]
    fn reasonless_unmatched_failure_has_no_clusters() {
        let ruleset = Ruleset::empty("p");
        let failure = Failure {
            test_id: "t".into(),
            variant: Default::default(),
            reason: None,
            partition_time: Utc::now(),
        };
        let clusters =
            cluster_failure(&ruleset, crate::domain::models::starting_epoch(), vec![], &failure);
        assert!(clusters.is_empty());
    }
}
