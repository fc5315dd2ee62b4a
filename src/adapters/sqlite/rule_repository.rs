//! SQLite implementation of the rule repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::{starting_epoch, ClusterId, Rule};
use crate::domain::ports::RuleRepository;

use super::{fmt_ts, parse_ts};

#[derive(Clone)]
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    project: String,
    rule_id: String,
    definition: String,
    is_active: i64,
    predicate_last_updated: String,
    creation_time: String,
    last_updated: String,
    source_cluster_algorithm: Option<String>,
    source_cluster_id: Option<String>,
}

impl RuleRow {
    fn into_rule(self) -> DomainResult<Rule> {
        let source_cluster = match (self.source_cluster_algorithm, self.source_cluster_id) {
            (Some(algorithm), Some(id)) if !algorithm.is_empty() => {
                Some(ClusterId { algorithm, id })
            }
            _ => None,
        };
        Ok(Rule {
            project: self.project,
            rule_id: self.rule_id,
            definition: self.definition,
            is_active: self.is_active != 0,
            predicate_last_updated: parse_ts(&self.predicate_last_updated)?,
            creation_time: parse_ts(&self.creation_time)?,
            last_updated: parse_ts(&self.last_updated)?,
            source_cluster,
        })
    }
}

const SELECT_COLUMNS: &str = "project, rule_id, definition, is_active, \
     predicate_last_updated, creation_time, last_updated, \
     source_cluster_algorithm, source_cluster_id";

#[async_trait]
impl RuleRepository for SqliteRuleRepository {
    async fn create(&self, rule: &Rule) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO rules (project, rule_id, definition, is_active,
               predicate_last_updated, creation_time, last_updated,
               source_cluster_algorithm, source_cluster_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rule.project)
        .bind(&rule.rule_id)
        .bind(&rule.definition)
        .bind(i64::from(rule.is_active))
        .bind(fmt_ts(rule.predicate_last_updated))
        .bind(fmt_ts(rule.creation_time))
        .bind(fmt_ts(rule.last_updated))
        .bind(rule.source_cluster.as_ref().map(|c| c.algorithm.clone()))
        .bind(rule.source_cluster.as_ref().map(|c| c.id.clone()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, rule: &Rule) -> DomainResult<()> {
        sqlx::query(
            "UPDATE rules SET definition = ?, is_active = ?,
               predicate_last_updated = ?, last_updated = ?,
               source_cluster_algorithm = ?, source_cluster_id = ?
             WHERE project = ? AND rule_id = ?",
        )
        .bind(&rule.definition)
        .bind(i64::from(rule.is_active))
        .bind(fmt_ts(rule.predicate_last_updated))
        .bind(fmt_ts(rule.last_updated))
        .bind(rule.source_cluster.as_ref().map(|c| c.algorithm.clone()))
        .bind(rule.source_cluster.as_ref().map(|c| c.id.clone()))
        .bind(&rule.project)
        .bind(&rule.rule_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, project: &str, rule_id: &str) -> DomainResult<Option<Rule>> {
        let row: Option<RuleRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM rules WHERE project = ? AND rule_id = ?"
        ))
        .bind(project)
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RuleRow::into_rule).transpose()
    }

    async fn read_active(&self, project: &str) -> DomainResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM rules
             WHERE project = ? AND is_active = 1
             ORDER BY rule_id"
        ))
        .bind(project)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    async fn read_delta(&self, project: &str, since: DateTime<Utc>) -> DomainResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM rules
             WHERE project = ? AND predicate_last_updated > ?
             ORDER BY rule_id"
        ))
        .bind(project)
        .bind(fmt_ts(since))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RuleRow::into_rule).collect()
    }

    async fn read_last_updated(&self, project: &str) -> DomainResult<DateTime<Utc>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT MAX(last_updated) FROM rules WHERE project = ?")
                .bind(project)
                .fetch_optional(&self.pool)
                .await?;
        match row.and_then(|(max,)| max) {
            Some(max) => parse_ts(&max),
            // The project has no rules at all.
            None => Ok(starting_epoch()),
        }
    }
}
