//! Rules-based clustering: incremental evaluation of explicit
//! failure-association rules.
//!
//! Each failure belongs to the cluster of every active rule whose
//! predicate it satisfies. Evaluation is incremental: given the rule
//! matches computed at an earlier rules version, only rules whose
//! predicate changed after that version are re-run, bounding worker
//! cost to O(changed rules) per pass.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::models::{ClusterId, Failure};

use super::ruleset::Ruleset;

/// The name (and version) of the rules-based algorithm.
pub const ALGORITHM_NAME: &str = "rules-v1";

/// Updates `matched_rule_ids` in place from `last_evaluated` to
/// `ruleset.version()`:
///
/// 1. matches for rules no longer active are dropped;
/// 2. every rule whose predicate changed strictly after
///    `last_evaluated` is evaluated against the failure, adding the
///    rule on a match and removing it otherwise (covering both new
///    rules and edited ones).
pub fn cluster(
    ruleset: &Ruleset,
    last_evaluated: DateTime<Utc>,
    matched_rule_ids: &mut HashSet<String>,
    failure: &Failure,
) {
    matched_rule_ids.retain(|id| ruleset.is_rule_active(id));

    for cached in ruleset.active_rules_updated_since(last_evaluated) {
        if cached.predicate.matches(failure) {
            matched_rule_ids.insert(cached.rule.rule_id.clone());
        } else {
            matched_rule_ids.remove(&cached.rule.rule_id);
        }
    }
}

/// The cluster ID for a matched rule.
pub fn cluster_id(rule_id: &str) -> ClusterId {
    ClusterId::new(ALGORITHM_NAME, rule_id)
}
