//! Integration tests for the bug cluster updater.

mod helpers;

use std::sync::Arc;

use sqlx::SqlitePool;

use failsift::adapters::sqlite::SqliteBugClusterRepository;
use failsift::adapters::SqliteImpactReader;
use failsift::domain::models::{
    ClusterId, ClusterImpact, Config, Counts, ImpactThreshold, PriorityBand, ProjectConfig,
};
use failsift::domain::ports::BugClusterRepository;
use failsift::services::BugUpdater;

use helpers::database::setup_test_db;
use helpers::fakes::{FakeIssueTracker, TrackerCall};

const PROJECT: &str = "alpha";

fn project_config() -> ProjectConfig {
    ProjectConfig {
        bug_filing_threshold: ImpactThreshold {
            unexpected_failures_1d: Some(10),
            unexpected_failures_3d: Some(30),
            unexpected_failures_7d: Some(70),
        },
        priorities: vec![
            PriorityBand {
                priority: "P0".into(),
                threshold: ImpactThreshold {
                    unexpected_failures_1d: Some(1000),
                    ..ImpactThreshold::default()
                },
            },
            PriorityBand {
                priority: "P1".into(),
                threshold: ImpactThreshold {
                    unexpected_failures_1d: Some(100),
                    ..ImpactThreshold::default()
                },
            },
            PriorityBand {
                priority: "P2".into(),
                threshold: ImpactThreshold {
                    unexpected_failures_1d: Some(0),
                    ..ImpactThreshold::default()
                },
            },
        ],
    }
}

fn test_config(max_bugs_filed_per_run: usize) -> Config {
    let mut config = Config { max_bugs_filed_per_run, ..Config::default() };
    config.projects.insert(PROJECT.to_string(), project_config());
    config
}

fn reason_impact(id: &str, failures_1d: i64) -> ClusterImpact {
    ClusterImpact {
        cluster_id: ClusterId::new("reason-v1", id),
        failures_1d: Counts::residual(failures_1d),
        failures_3d: Counts::residual(failures_1d),
        failures_7d: Counts::residual(failures_1d),
        example_failure_reason: Some(format!("failure in cluster {id}")),
        top_test_ids: vec!["test-a".into(), "test-b".into()],
        ..Default::default()
    }
}

struct Env {
    pool: SqlitePool,
    tracker: Arc<FakeIssueTracker>,
    updater: BugUpdater,
    impact: SqliteImpactReader,
}

impl Env {
    async fn new(max_bugs_filed_per_run: usize) -> Self {
        let pool = setup_test_db().await;
        let tracker = Arc::new(FakeIssueTracker::new());
        let impact = SqliteImpactReader::new(pool.clone());
        let updater = BugUpdater::new(
            test_config(max_bugs_filed_per_run),
            Arc::new(impact.clone()),
            Arc::new(SqliteBugClusterRepository::new(pool.clone())),
            Arc::clone(&tracker) as Arc<dyn failsift::IssueTracker>,
        );
        Self { pool, tracker, updater, impact }
    }

    async fn pass(&self) -> failsift::services::UpdateReport {
        self.updater
            .update_project(PROJECT, &project_config())
            .await
            .expect("update pass failed")
    }

    async fn active_bugs(&self) -> Vec<failsift::BugCluster> {
        SqliteBugClusterRepository::new(self.pool.clone())
            .read_active(PROJECT)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn impact_at_threshold_files_a_bug_once() {
    let env = Env::new(5).await;
    env.impact.put(PROJECT, &reason_impact("aa", 10)).await.unwrap();

    let report = env.pass().await;
    assert_eq!(report.filed, 1);

    let bugs = env.active_bugs().await;
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].cluster_id, ClusterId::new("reason-v1", "aa"));

    let issues = env.tracker.issues();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].title.contains("failure in cluster aa"));
    assert!(issues[0].body.contains("reason-v1/aa"));

    // A second pass over the same world files nothing more.
    let report = env.pass().await;
    assert_eq!(report.filed, 0);
    assert_eq!(env.tracker.issues().len(), 1);
}

#[tokio::test]
async fn impact_below_threshold_files_nothing() {
    let env = Env::new(5).await;
    env.impact.put(PROJECT, &reason_impact("aa", 9)).await.unwrap();

    let report = env.pass().await;
    assert_eq!(report.filed, 0);
    assert!(env.tracker.issues().is_empty());
    assert!(env.active_bugs().await.is_empty());
}

#[tokio::test]
async fn unchanged_world_makes_no_tracker_calls() {
    let env = Env::new(5).await;
    env.impact.put(PROJECT, &reason_impact("aa", 50)).await.unwrap();
    env.impact.put(PROJECT, &reason_impact("bb", 20)).await.unwrap();

    env.pass().await;
    let calls_after_first = env.tracker.call_count();
    assert!(calls_after_first > 0);

    // Re-running with no change in underlying impact is a pure no-op.
    let report = env.pass().await;
    assert_eq!(env.tracker.call_count(), calls_after_first);
    assert_eq!(report, failsift::services::UpdateReport::default());
}

#[tokio::test]
async fn filing_cap_throttles_but_eventually_covers_all() {
    let env = Env::new(1).await;
    for (id, impact) in [("aa", 500), ("bb", 400), ("cc", 300)] {
        env.impact.put(PROJECT, &reason_impact(id, impact)).await.unwrap();
    }

    // One bug per pass, highest impact first.
    let report = env.pass().await;
    assert_eq!((report.filed, report.deferred), (1, 2));
    assert_eq!(env.active_bugs().await.len(), 1);
    assert_eq!(
        env.active_bugs().await[0].cluster_id,
        ClusterId::new("reason-v1", "aa")
    );

    let report = env.pass().await;
    assert_eq!((report.filed, report.deferred), (1, 1));
    assert_eq!(env.active_bugs().await.len(), 2);

    let report = env.pass().await;
    assert_eq!((report.filed, report.deferred), (1, 0));
    assert_eq!(env.active_bugs().await.len(), 3);

    // Every cluster is covered; a further pass is a no-op.
    let report = env.pass().await;
    assert_eq!(report, failsift::services::UpdateReport::default());
}

#[tokio::test]
async fn removed_cluster_closes_its_bug() {
    let env = Env::new(5).await;
    let impact = reason_impact("aa", 50);
    env.impact.put(PROJECT, &impact).await.unwrap();

    env.pass().await;
    let bugs = env.active_bugs().await;
    assert_eq!(bugs.len(), 1);
    let bug = bugs[0].bug.clone();

    // The cluster's impact ages out entirely.
    env.impact.delete(PROJECT, &impact.cluster_id).await.unwrap();

    let report = env.pass().await;
    assert_eq!(report.closed, 1);
    assert!(env.active_bugs().await.is_empty());
    assert!(!env.tracker.issue(&bug).unwrap().open);

    // The association row survives, deactivated.
    let row = SqliteBugClusterRepository::new(env.pool.clone())
        .get_by_bug(PROJECT, &bug)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.is_active);
}

#[tokio::test]
async fn bug_with_subsided_impact_is_still_reevaluated() {
    let env = Env::new(5).await;
    env.impact.put(PROJECT, &reason_impact("aa", 50)).await.unwrap();
    env.pass().await;

    // Impact drops below the filing threshold but the cluster still
    // exists: the bug stays open and tracks the new priority band.
    env.impact.put(PROJECT, &reason_impact("aa", 2)).await.unwrap();
    let report = env.pass().await;
    assert_eq!(report.closed, 0);
    assert_eq!(env.active_bugs().await.len(), 1);
}

#[tokio::test]
async fn priority_follows_impact_bands() {
    let env = Env::new(5).await;
    env.impact.put(PROJECT, &reason_impact("aa", 150)).await.unwrap();

    env.pass().await;
    let bug = env.active_bugs().await[0].bug.clone();
    assert_eq!(env.tracker.issue(&bug).unwrap().priority.as_deref(), Some("P1"));

    // Impact rises into the P0 band: priority is updated, once.
    env.impact.put(PROJECT, &reason_impact("aa", 5000)).await.unwrap();
    let report = env.pass().await;
    assert_eq!(report.repriorized, 1);
    assert_eq!(env.tracker.issue(&bug).unwrap().priority.as_deref(), Some("P0"));

    let calls = env.tracker.call_count();
    let report = env.pass().await;
    assert_eq!(report.repriorized, 0);
    assert_eq!(env.tracker.call_count(), calls);

    // Impact falls: priority drops with it.
    env.impact.put(PROJECT, &reason_impact("aa", 20)).await.unwrap();
    let report = env.pass().await;
    assert_eq!(report.repriorized, 1);
    assert_eq!(env.tracker.issue(&bug).unwrap().priority.as_deref(), Some("P2"));
    assert!(matches!(
        env.tracker.calls().last().unwrap(),
        TrackerCall::UpdatePriority { .. }
    ));
}

#[tokio::test]
async fn candidates_rank_by_impact_for_the_cap() {
    let env = Env::new(1).await;
    env.impact.put(PROJECT, &reason_impact("low", 15)).await.unwrap();
    env.impact.put(PROJECT, &reason_impact("high", 900)).await.unwrap();

    env.pass().await;
    let bugs = env.active_bugs().await;
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].cluster_id, ClusterId::new("reason-v1", "high"));
}
