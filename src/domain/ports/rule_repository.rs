use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::Rule;

/// Repository port for failure-association rules.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Insert a new rule.
    async fn create(&self, rule: &Rule) -> DomainResult<()>;

    /// Update an existing rule. Callers must bump
    /// `predicate_last_updated` when the definition or active flag
    /// changed, so incremental re-evaluation picks the rule up.
    async fn update(&self, rule: &Rule) -> DomainResult<()>;

    /// Get a rule by ID.
    async fn get(&self, project: &str, rule_id: &str) -> DomainResult<Option<Rule>>;

    /// All active rules in the project.
    async fn read_active(&self, project: &str) -> DomainResult<Vec<Rule>>;

    /// Rules (active or not) whose predicate changed strictly after the
    /// given version.
    async fn read_delta(&self, project: &str, since: DateTime<Utc>) -> DomainResult<Vec<Rule>>;

    /// The last time any rule in the project was updated, or the
    /// starting epoch if the project has no rules. This versions the
    /// set returned by `read_active`: simply taking the max over active
    /// rules would miss deactivations.
    async fn read_last_updated(&self, project: &str) -> DomainResult<DateTime<Utc>>;
}
