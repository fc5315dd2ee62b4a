//! Failure-association rules.
//!
//! A rule is a human- or tool-authored predicate over failure fields.
//! Failures matching an active rule form that rule's cluster. Rules are
//! deactivated rather than deleted so that incremental re-evaluation can
//! remove their matches from previously clustered chunks.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cluster::ClusterId;

/// Matches validly formed rule IDs: 128 bits as lowercase hex.
pub static RULE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("rule ID regex is valid"));

/// The rules version used for projects that have no rules (even
/// inactive ones). Deliberately different from the Unix epoch so that
/// "timestamp not populated" bugs remain discernible.
pub fn starting_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).single().expect("valid timestamp")
}

/// An explicit failure-match predicate authored for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The project the rule is defined for.
    pub project: String,
    /// Unique identifier, 32 lowercase hexadecimal characters.
    pub rule_id: String,
    /// The predicate source text, e.g. `reason LIKE "timed out%"`.
    pub definition: String,
    /// Whether failures should still be matched against the rule.
    pub is_active: bool,
    /// When the predicate (definition or active flag) last changed.
    /// This is the timestamp incremental re-evaluation keys off.
    pub predicate_last_updated: DateTime<Utc>,
    /// When the rule was created.
    pub creation_time: DateTime<Utc>,
    /// When any part of the rule last changed.
    pub last_updated: DateTime<Utc>,
    /// The suggested cluster this rule was created from, if any.
    #[serde(default)]
    pub source_cluster: Option<ClusterId>,
}

impl Rule {
    /// Generates a random 128-bit rule ID as 32 lowercase hex characters.
    pub fn generate_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}
