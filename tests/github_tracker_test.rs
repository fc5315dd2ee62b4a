//! Tests for the GitHub issue-tracker adapter against a mock HTTP
//! server.

use failsift::adapters::github::{GitHubClient, GitHubTracker, SYSTEM};
use failsift::domain::models::BugId;
use failsift::domain::ports::{IssueTracker, NewIssue};

fn tracker_for(server: &mockito::ServerGuard) -> GitHubTracker {
    let client = GitHubClient::with_base_url("test-token".to_string(), server.url());
    GitHubTracker::new(client, "owner", "repo")
}

#[tokio::test]
async fn create_issue_posts_and_returns_the_bug_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/repos/owner/repo/issues")
        .match_header("authorization", "Bearer test-token")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "title": "Failed to connect.",
            "labels": ["auto-filed", "P1"],
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"number": 42, "html_url": "https://github.com/owner/repo/issues/42"}"#,
        )
        .create_async()
        .await;

    let tracker = tracker_for(&server);
    let bug = tracker
        .create_issue(&NewIssue {
            title: "Failed to connect.".to_string(),
            body: "details".to_string(),
            priority: Some("P1".to_string()),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(bug, BugId::new(SYSTEM, "owner/repo/42"));
}

#[tokio::test]
async fn close_issue_patches_the_state() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/repos/owner/repo/issues/42")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "state": "closed",
            "state_reason": "completed",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"number": 42, "state": "closed", "labels": []}"#)
        .create_async()
        .await;

    let tracker = tracker_for(&server);
    tracker
        .close_issue(&BugId::new(SYSTEM, "owner/repo/42"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn update_priority_replaces_labels() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/repos/owner/repo/issues/7")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "labels": ["auto-filed", "P0"],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"number": 7, "state": "open", "labels": [{"name": "P0"}]}"#)
        .create_async()
        .await;

    let tracker = tracker_for(&server);
    tracker
        .update_priority(&BugId::new(SYSTEM, "owner/repo/7"), "P0")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn transient_server_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/repos/owner/repo/issues")
        .with_status(502)
        .with_body("bad gateway")
        .expect_at_least(2)
        .create_async()
        .await;

    let client = GitHubClient::with_base_url("test-token".to_string(), server.url())
        .with_retry_intervals(
            std::time::Duration::from_millis(10),
            std::time::Duration::from_millis(200),
        );
    let tracker = GitHubTracker::new(client, "owner", "repo");
    let result = tracker
        .create_issue(&NewIssue {
            title: "t".to_string(),
            body: "b".to_string(),
            priority: None,
        })
        .await;

    // The call ultimately fails, but only after retrying.
    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/repos/owner/repo/issues")
        .with_status(422)
        .with_body(r#"{"message": "Validation Failed"}"#)
        .expect(1)
        .create_async()
        .await;

    let tracker = tracker_for(&server);
    let result = tracker
        .create_issue(&NewIssue {
            title: "t".to_string(),
            body: "b".to_string(),
            priority: None,
        })
        .await;

    mock.assert_async().await;
    assert!(result.is_err());
}
