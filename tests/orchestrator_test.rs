//! Integration tests for the reclustering orchestrator against the
//! SQLite store.

mod helpers;

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;

use failsift::adapters::sqlite::{
    SqliteRuleRepository, SqliteRunRepository, SqliteShardQueue, SqliteStateRepository,
};
use failsift::domain::models::{Config, ImpactThreshold, ProjectConfig, Rule};
use failsift::domain::ports::{RuleRepository, RunRepository, ShardQueue};
use failsift::domain::DomainError;
use failsift::services::Orchestrator;
use failsift::ALGORITHMS_VERSION;

use helpers::database::setup_test_db;

fn test_config(projects: &[&str], workers: usize, interval_minutes: u32) -> Config {
    let mut config = Config {
        reclustering_workers: workers,
        reclustering_interval_minutes: interval_minutes,
        ..Config::default()
    };
    for project in projects {
        config.projects.insert(
            (*project).to_string(),
            ProjectConfig {
                bug_filing_threshold: ImpactThreshold {
                    unexpected_failures_1d: Some(10),
                    ..ImpactThreshold::default()
                },
                priorities: vec![],
            },
        );
    }
    config
}

fn orchestrator(pool: &SqlitePool, config: Config) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::new(SqliteRunRepository::new(pool.clone())),
        Arc::new(SqliteStateRepository::new(pool.clone())),
        Arc::new(SqliteRuleRepository::new(pool.clone())),
        Arc::new(SqliteShardQueue::new(pool.clone())),
    )
}

fn aligned_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap()
}

async fn make_rule(pool: &SqlitePool, project: &str, at: DateTime<Utc>) -> Rule {
    let rule = Rule {
        project: project.to_string(),
        rule_id: Rule::generate_id(),
        definition: r#"test = "some-test""#.to_string(),
        is_active: true,
        predicate_last_updated: at,
        creation_time: at,
        last_updated: at,
        source_cluster: None,
    };
    SqliteRuleRepository::new(pool.clone())
        .create(&rule)
        .await
        .expect("failed to create rule");
    rule
}

#[tokio::test]
async fn aligned_tick_plans_a_run_per_project() {
    let pool = setup_test_db().await;
    let orchestrator = orchestrator(&pool, test_config(&["alpha", "beta"], 5, 5));

    let report = orchestrator.tick(aligned_time()).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.succeeded, vec!["alpha".to_string(), "beta".to_string()]);
    assert!(report.failed.is_empty());

    let runs = SqliteRunRepository::new(pool.clone());
    let alpha = runs.read_last("alpha").await.unwrap().unwrap();
    let beta = runs.read_last("beta").await.unwrap().unwrap();

    // Budget 5 over two equally sized projects: one worker each plus
    // proportional leftovers, allocated in project order.
    assert_eq!(alpha.shard_count + beta.shard_count, 5);
    assert!(alpha.shard_count >= 1 && beta.shard_count >= 1);
    assert_eq!(alpha.attempt_timestamp, aligned_time() + Duration::minutes(5));
    assert_eq!(alpha.progress, 0);
    assert_eq!(alpha.algorithms_version, ALGORITHMS_VERSION);

    // One shard task per allocated worker, covering both projects.
    let queue = SqliteShardQueue::new(pool.clone());
    let mut tasks = Vec::new();
    while let Some(claimed) = queue.claim_next().await.unwrap() {
        tasks.push(claimed.task);
    }
    assert_eq!(tasks.len(), 5);

    // Each project's shards tile the keyspace: first starts at "",
    // last ends at the maximum key, and bounds chain exactly.
    for project in ["alpha", "beta"] {
        let mut shards: Vec<_> = tasks.iter().filter(|t| t.project == project).collect();
        shards.sort_by(|a, b| a.start_chunk_id.cmp(&b.start_chunk_id));
        assert_eq!(shards[0].start_chunk_id, "");
        assert_eq!(shards.last().unwrap().end_chunk_id, "ff".repeat(16));
        for pair in shards.windows(2) {
            assert_eq!(pair[0].end_chunk_id, pair[1].start_chunk_id);
        }
    }
}

#[tokio::test]
async fn misaligned_tick_is_skipped() {
    let pool = setup_test_db().await;
    let orchestrator = orchestrator(&pool, test_config(&["alpha"], 2, 5));

    // 12:07 is not a 5-minute boundary.
    let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 7, 0).unwrap();
    let report = orchestrator.tick(t).await.unwrap();
    assert!(report.skipped);

    let runs = SqliteRunRepository::new(pool.clone());
    assert!(runs.read_last("alpha").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_tick_in_the_same_interval_fails_closed() {
    let pool = setup_test_db().await;
    let orchestrator = orchestrator(&pool, test_config(&["alpha"], 2, 5));

    let report = orchestrator.tick(aligned_time()).await.unwrap();
    assert_eq!(report.succeeded.len(), 1);

    // The same trigger delivered twice: the second attempt overlaps
    // the first and is rejected rather than merged.
    let report = orchestrator.tick(aligned_time()).await.unwrap();
    assert!(report.succeeded.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, DomainError::OverlappingAttempt));
}

#[tokio::test]
async fn too_few_workers_is_a_configuration_error() {
    let pool = setup_test_db().await;
    let orchestrator = orchestrator(&pool, test_config(&["alpha", "beta", "gamma"], 2, 5));

    let err = orchestrator.tick(aligned_time()).await.unwrap_err();
    assert!(matches!(err, DomainError::Configuration(_)));
}

#[tokio::test]
async fn one_project_failure_does_not_block_others() {
    let pool = setup_test_db().await;
    let config = test_config(&["alpha", "beta"], 4, 5);

    // Plant a run for alpha that overlaps the upcoming attempt; beta
    // has no runs and must still be planned.
    let runs = SqliteRunRepository::new(pool.clone());
    runs.read_last_and_create("alpha", &|_| {
        Ok(failsift::ReclusteringRun {
            project: "alpha".to_string(),
            attempt_timestamp: aligned_time() + Duration::minutes(30),
            shard_count: 1,
            shards_reported: 0,
            progress: 0,
            rules_version: failsift::domain::models::starting_epoch(),
            algorithms_version: ALGORITHMS_VERSION,
        })
    })
    .await
    .unwrap();

    let orchestrator = orchestrator(&pool, config);
    let report = orchestrator.tick(aligned_time()).await.unwrap();
    assert_eq!(report.succeeded, vec!["beta".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "alpha");
}

#[tokio::test]
async fn incomplete_run_keeps_the_previous_target() {
    let pool = setup_test_db().await;
    let config = test_config(&["alpha"], 1, 5);

    let rule_time = Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap();
    make_rule(&pool, "alpha", rule_time).await;

    // First tick: no previous run, so the target advances to the
    // latest rules version.
    let orchestrator = orchestrator(&pool, config);
    orchestrator.tick(aligned_time()).await.unwrap();

    let runs = SqliteRunRepository::new(pool.clone());
    let first = runs.read_last("alpha").await.unwrap().unwrap();
    assert_eq!(first.rules_version, rule_time);

    // Rules change, but the first run never progressed. The next tick
    // must keep chasing the original goal so the whole keyspace
    // reaches one consistent target.
    let newer_rule_time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 6, 0).unwrap();
    make_rule(&pool, "alpha", newer_rule_time).await;

    let next_tick = aligned_time() + Duration::minutes(5);
    orchestrator.tick(next_tick).await.unwrap();
    let second = runs.read_last("alpha").await.unwrap().unwrap();
    assert_eq!(second.rules_version, rule_time, "target must not advance");

    // Complete the second run; the following tick may then advance.
    runs.report_shard_progress("alpha", second.attempt_timestamp, "", 1000)
        .await
        .unwrap();

    orchestrator.tick(next_tick + Duration::minutes(5)).await.unwrap();
    let third = runs.read_last("alpha").await.unwrap().unwrap();
    assert_eq!(third.rules_version, newer_rule_time);
}

#[tokio::test]
async fn projects_with_no_rules_target_the_starting_epoch() {
    let pool = setup_test_db().await;
    let orchestrator = orchestrator(&pool, test_config(&["alpha"], 1, 5));

    orchestrator.tick(aligned_time()).await.unwrap();
    let runs = SqliteRunRepository::new(pool.clone());
    let run = runs.read_last("alpha").await.unwrap().unwrap();
    assert_eq!(run.rules_version, failsift::domain::models::starting_epoch());
}

#[tokio::test]
async fn duplicate_shard_enqueues_collapse() {
    let pool = setup_test_db().await;
    let queue = SqliteShardQueue::new(pool.clone());
    let task = failsift::ShardTask {
        project: "alpha".to_string(),
        attempt_time: aligned_time(),
        start_chunk_id: String::new(),
        end_chunk_id: "ff".repeat(16),
    };

    queue.schedule(&task.title(0), &task).await.unwrap();
    queue.schedule(&task.title(0), &task).await.unwrap();

    let mut count = 0;
    while queue.claim_next().await.unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 1);
}
