//! In-memory versioned view of a project's active rules.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::{starting_epoch, Rule};
use crate::domain::ports::RuleRepository;

use super::predicate::Predicate;

/// An active rule with its compiled predicate.
#[derive(Debug, Clone)]
pub struct CachedRule {
    pub rule: Rule,
    pub predicate: Arc<Predicate>,
}

/// All active rules of a project, versioned by the last-updated time
/// across all of the project's rules (including inactive ones, so
/// deactivations advance the version).
#[derive(Debug, Clone)]
pub struct Ruleset {
    project: String,
    version: DateTime<Utc>,
    rules: Vec<CachedRule>,
    by_id: HashMap<String, usize>,
}

impl Ruleset {
    /// An empty ruleset at the starting epoch, for projects with no
    /// rules yet.
    pub fn empty(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            version: starting_epoch(),
            rules: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Build a ruleset from active rules read at `version`. Rules whose
    /// predicate fails to compile are logged and skipped (data error),
    /// not fatal to the whole set.
    pub fn new(project: impl Into<String>, version: DateTime<Utc>, active_rules: Vec<Rule>) -> Self {
        let project = project.into();
        let mut rules = Vec::with_capacity(active_rules.len());
        let mut by_id = HashMap::with_capacity(active_rules.len());
        for rule in active_rules {
            match Predicate::compile(&rule.definition) {
                Ok(predicate) => {
                    by_id.insert(rule.rule_id.clone(), rules.len());
                    rules.push(CachedRule { rule, predicate: Arc::new(predicate) });
                }
                Err(e) => {
                    warn!(
                        project = %project,
                        rule_id = %rule.rule_id,
                        error = %e,
                        "skipping rule with invalid predicate"
                    );
                }
            }
        }
        Self { project, version, rules, by_id }
    }

    /// Refresh from the rule store. The returned set's version is the
    /// store's last-updated timestamp read in the same pass.
    pub async fn refresh(
        project: &str,
        repository: &dyn RuleRepository,
    ) -> DomainResult<Self> {
        let version = repository.read_last_updated(project).await?;
        let active = repository.read_active(project).await?;
        Ok(Self::new(project, version, active))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// The rules version of this set. Workers stamp this onto chunk
    /// state after a pass.
    pub fn version(&self) -> DateTime<Utc> {
        self.version
    }

    pub fn is_rule_active(&self, rule_id: &str) -> bool {
        self.by_id.contains_key(rule_id)
    }

    pub fn active_rules(&self) -> &[CachedRule] {
        &self.rules
    }

    /// Active rules whose predicate changed strictly after `version`.
    /// These are the only rules incremental re-evaluation must run.
    pub fn active_rules_updated_since(&self, version: DateTime<Utc>) -> Vec<&CachedRule> {
        self.rules
            .iter()
            .filter(|r| r.rule.predicate_last_updated > version)
            .collect()
    }
}
