//! GitHub HTTP client with rate limiting and transient-error retry.
//!
//! Wraps the GitHub REST API v3, providing the typed operations the
//! tracker adapter needs. A token-bucket rate limiter keeps the client
//! within the 5 000 req/hour authenticated API limit; 5xx/429 responses
//! are retried with exponential backoff, other failures surface to the
//! caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};

use super::models::{
    GitHubCreateIssueRequest, GitHubCreateIssueResponse, GitHubIssue, GitHubIssueUpdateRequest,
};

/// Base URL for the GitHub REST API v3.
const GITHUB_API_BASE: &str = "https://api.github.com";

/// Token-bucket rate limiter.
///
/// Allows up to `capacity` requests per `window`. When the bucket is
/// exhausted, [`acquire`](RateLimiter::acquire) sleeps until the window
/// resets and a token becomes available.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    tokens: u32,
    window: Duration,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self { capacity, tokens: capacity, window, window_start: Instant::now() }
    }

    /// Acquire a single token, sleeping if necessary.
    pub async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.tokens = self.capacity;
            self.window_start = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
        } else {
            let remaining = self.window.saturating_sub(elapsed);
            tracing::warn!(
                sleep_ms = remaining.as_millis() as u64,
                "GitHub rate limit reached, sleeping"
            );
            tokio::time::sleep(remaining).await;
            self.tokens = self.capacity - 1;
            self.window_start = Instant::now();
        }
    }
}

/// HTTP client for the GitHub REST API v3.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    retry_initial: Duration,
    retry_max_elapsed: Duration,
}

impl GitHubClient {
    /// Create a new client with the given token.
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// Create a client against a custom API base URL (used by tests).
    pub fn with_base_url(token: String, base_url: String) -> Self {
        // GitHub allows 5 000 authenticated requests per hour.
        let rate_limiter = RateLimiter::new(5_000, Duration::from_secs(3_600));
        Self {
            http: Client::new(),
            base_url,
            token,
            rate_limiter: Arc::new(Mutex::new(rate_limiter)),
            retry_initial: Duration::from_millis(500),
            retry_max_elapsed: Duration::from_secs(60),
        }
    }

    /// Override the retry cadence (used by tests to keep transient
    /// failures fast).
    pub fn with_retry_intervals(mut self, initial: Duration, max_elapsed: Duration) -> Self {
        self.retry_initial = initial;
        self.retry_max_elapsed = max_elapsed;
        self
    }

    /// Create a client by reading the `GITHUB_TOKEN` environment
    /// variable.
    pub fn from_env() -> DomainResult<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| {
            DomainError::Configuration("GITHUB_TOKEN environment variable is not set".into())
        })?;
        if token.is_empty() {
            return Err(DomainError::Configuration(
                "GITHUB_TOKEN environment variable is empty".into(),
            ));
        }
        Ok(Self::new(token))
    }

    /// Create a new issue in the repository.
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &GitHubCreateIssueRequest,
    ) -> DomainResult<GitHubCreateIssueResponse> {
        let url = format!("{}/repos/{}/{}/issues", self.base_url, owner, repo);
        self.send_json(reqwest::Method::POST, &url, request).await
    }

    /// Patch an existing issue (state and/or labels).
    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &GitHubIssueUpdateRequest,
    ) -> DomainResult<GitHubIssue> {
        let url = format!("{}/repos/{}/{}/issues/{}", self.base_url, owner, repo, number);
        self.send_json(reqwest::Method::PATCH, &url, request).await
    }

    /// Sends a JSON request with rate limiting and retry, decoding a
    /// JSON response.
    async fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> DomainResult<R> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_initial)
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(self.retry_max_elapsed))
            .build();

        let response = backoff::future::retry(policy, || async {
            self.rate_limiter.lock().await.acquire().await;
            let result = self
                .http
                .request(method.clone(), url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28")
                .header("User-Agent", "failsift")
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if is_transient(resp.status()) => {
                    Err(backoff::Error::transient(DomainError::IssueTracker(format!(
                        "GitHub returned {}",
                        resp.status()
                    ))))
                }
                Ok(resp) => Ok(resp),
                // Network-level failures are worth retrying too.
                Err(e) => Err(backoff::Error::transient(DomainError::IssueTracker(format!(
                    "request failed: {e}"
                )))),
            }
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DomainError::IssueTracker(format!(
                "GitHub returned {status}: {text}"
            )));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| DomainError::IssueTracker(format!("decode response: {e}")))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
