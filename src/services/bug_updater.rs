//! The bug cluster updater.
//!
//! One pass per invocation: reads current cluster impact, reconciles it
//! against the recorded bug-to-cluster associations, and drives the
//! issue tracker. A pass over an unchanged world makes no tracker
//! calls, so the cron transport may safely deliver more than once.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    priority_for, BugCluster, ClusterId, ClusterImpact, Config, ProjectConfig,
};
use crate::domain::ports::{BugClusterRepository, ImpactReader, IssueTracker, NewIssue};

/// The outcome of one updater pass over a project.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Bugs filed this pass.
    pub filed: usize,
    /// Candidates deferred to a later pass by the filing cap.
    pub deferred: usize,
    /// Bugs closed (verified) because their cluster's impact subsided.
    pub closed: usize,
    /// Priority updates written to the tracker.
    pub repriorized: usize,
}

/// Reconciles cluster impact against issue-tracker bugs.
pub struct BugUpdater {
    config: Config,
    impact_reader: Arc<dyn ImpactReader>,
    bug_repository: Arc<dyn BugClusterRepository>,
    issue_tracker: Arc<dyn IssueTracker>,
}

impl BugUpdater {
    pub fn new(
        config: Config,
        impact_reader: Arc<dyn ImpactReader>,
        bug_repository: Arc<dyn BugClusterRepository>,
        issue_tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        Self { config, impact_reader, bug_repository, issue_tracker }
    }

    /// Runs one pass for every configured project. Per-project errors
    /// abort only that project's pass.
    pub async fn run(&self) -> Vec<(String, DomainResult<UpdateReport>)> {
        let mut results = Vec::new();
        for (project, project_config) in &self.config.projects {
            let result = self.update_project(project, project_config).await;
            if let Err(e) = &result {
                warn!(project = %project, error = %e, "bug update pass failed");
            }
            results.push((project.clone(), result));
        }
        results
    }

    /// One pass over a single project.
    pub async fn update_project(
        &self,
        project: &str,
        project_config: &ProjectConfig,
    ) -> DomainResult<UpdateReport> {
        let active_bugs = self.bug_repository.read_active(project).await?;

        // Clusters with an active bug are always read back, even when
        // their impact has dropped below the filing threshold: the bug
        // lifecycle (closure, priority) still needs their numbers.
        let always_include: Vec<ClusterId> =
            active_bugs.iter().map(|b| b.cluster_id.clone()).collect();
        let impactful = self
            .impact_reader
            .read_impactful_clusters(
                project,
                &project_config.bug_filing_threshold,
                &always_include,
            )
            .await?;

        let (filed, deferred) = self
            .file_new_bugs(project, project_config, &impactful, &active_bugs)
            .await?;
        let mut report = UpdateReport { filed, deferred, ..UpdateReport::default() };
        self.reconcile_existing_bugs(project_config, &impactful, &active_bugs, &mut report)
            .await?;

        info!(
            project = %project,
            filed = report.filed,
            deferred = report.deferred,
            closed = report.closed,
            repriorized = report.repriorized,
            "bug update pass complete"
        );
        Ok(report)
    }

    /// Files bugs for impactful clusters that lack an active
    /// association, highest impact first, up to the per-pass cap.
    /// Returns (filed, deferred).
    async fn file_new_bugs(
        &self,
        project: &str,
        project_config: &ProjectConfig,
        impactful: &[ClusterImpact],
        active_bugs: &[BugCluster],
    ) -> DomainResult<(usize, usize)> {
        let covered: HashSet<&ClusterId> = active_bugs.iter().map(|b| &b.cluster_id).collect();

        let mut candidates: Vec<&ClusterImpact> = impactful
            .iter()
            .filter(|c| !covered.contains(&c.cluster_id))
            .filter(|c| c.meets_threshold(&project_config.bug_filing_threshold))
            .collect();
        candidates.sort_by_key(|c| std::cmp::Reverse(c.ranking_value()));

        let cap = self.config.max_bugs_filed_per_run;
        let mut filed = 0usize;
        let mut deferred = 0usize;
        for candidate in candidates {
            if filed >= cap {
                // The cap throttles how fast automation can flood the
                // tracker; the remainder is picked up next pass.
                deferred += 1;
                continue;
            }
            self.file_bug(project, project_config, candidate).await?;
            filed += 1;
        }
        Ok((filed, deferred))
    }

    /// Files one bug and records its association. The two writes form
    /// one logical unit: the issue body carries the cluster fingerprint
    /// so an association that failed to record can be found again
    /// rather than filed twice.
    async fn file_bug(
        &self,
        project: &str,
        project_config: &ProjectConfig,
        impact: &ClusterImpact,
    ) -> DomainResult<()> {
        let priority = priority_for(impact, &project_config.priorities);
        let issue = NewIssue {
            title: bug_title(impact),
            body: bug_description(project, impact),
            priority: priority.clone(),
        };
        let bug = self.issue_tracker.create_issue(&issue).await?;

        let now = Utc::now();
        let association = BugCluster {
            project: project.to_string(),
            bug: bug.clone(),
            cluster_id: impact.cluster_id.clone(),
            is_active: true,
            priority,
            creation_time: now,
            last_updated: now,
        };
        self.bug_repository.create(&association).await?;
        info!(project = %project, bug = %bug, cluster = %impact.cluster_id, "bug filed");
        Ok(())
    }

    /// Closes bugs whose cluster is gone and adjusts priorities for the
    /// rest.
    async fn reconcile_existing_bugs(
        &self,
        project_config: &ProjectConfig,
        impactful: &[ClusterImpact],
        active_bugs: &[BugCluster],
        report: &mut UpdateReport,
    ) -> DomainResult<()> {
        for bug_cluster in active_bugs {
            let impact = impactful.iter().find(|c| c.cluster_id == bug_cluster.cluster_id);
            match impact {
                None => {
                    // The cluster's impact aged out (or the cluster no
                    // longer exists): the bug is done.
                    self.issue_tracker.close_issue(&bug_cluster.bug).await?;
                    let mut deactivated = bug_cluster.clone();
                    deactivated.is_active = false;
                    deactivated.last_updated = Utc::now();
                    self.bug_repository.update(&deactivated).await?;
                    report.closed += 1;
                    info!(bug = %bug_cluster.bug, "bug closed; cluster impact subsided");
                }
                Some(impact) => {
                    let target = priority_for(impact, &project_config.priorities);
                    if let Some(target) = target {
                        if bug_cluster.priority.as_deref() != Some(target.as_str()) {
                            self.issue_tracker
                                .update_priority(&bug_cluster.bug, &target)
                                .await?;
                            let mut updated = bug_cluster.clone();
                            updated.priority = Some(target);
                            updated.last_updated = Utc::now();
                            self.bug_repository.update(&updated).await?;
                            report.repriorized += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// One-line bug summary: the example failure reason when the cluster
/// has one, otherwise its top test.
fn bug_title(impact: &ClusterImpact) -> String {
    impact
        .example_failure_reason
        .clone()
        .or_else(|| impact.top_test_ids.first().cloned())
        .unwrap_or_else(|| format!("Failures in cluster {}", impact.cluster_id))
}

/// Issue body: impact summary, top tests, and the cluster fingerprint.
fn bug_description(project: &str, impact: &ClusterImpact) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "Automatically filed for a cluster of test failures in project {project}.\n\n"
    ));
    body.push_str(&format!(
        "Impact (residual unexpected failures): {}/1d, {}/3d, {}/7d\n\n",
        impact.failures_1d.residual, impact.failures_3d.residual, impact.failures_7d.residual
    ));
    if !impact.top_test_ids.is_empty() {
        body.push_str("Top affected tests:\n");
        for test in &impact.top_test_ids {
            body.push_str(&format!("- {test}\n"));
        }
        body.push('\n');
    }
    body.push_str(&format!("Cluster fingerprint: {}\n", impact.cluster_id));
    body
}

#[cfg(test)]
mod tests {
    use crate::domain::models::Counts;

    use super::*;

    #[test]
    fn title_prefers_example_reason() {
        let impact = ClusterImpact {
            cluster_id: ClusterId::new("reason-v1", "ab"),
            example_failure_reason: Some("Failed to connect.".into()),
            top_test_ids: vec!["net-test".into()],
            ..Default::default()
        };
        assert_eq!(bug_title(&impact), "Failed to connect.");
    }

    #[test]
    fn title_falls_back_to_top_test() {
        let impact = ClusterImpact {
            cluster_id: ClusterId::new("rules-v1", "ab"),
            top_test_ids: vec!["ui-test".into()],
            ..Default::default()
        };
        assert_eq!(bug_title(&impact), "ui-test");
    }

    #[test]
    fn description_carries_fingerprint_and_impact() {
        let impact = ClusterImpact {
            cluster_id: ClusterId::new("reason-v1", "abcd"),
            failures_1d: Counts::residual(12),
            top_test_ids: vec!["t1".into(), "t2".into()],
            ..Default::default()
        };
        let body = bug_description("chromium", &impact);
        assert!(body.contains("reason-v1/abcd"));
        assert!(body.contains("12/1d"));
        assert!(body.contains("- t1"));
    }
}
