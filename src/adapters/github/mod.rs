//! GitHub Issues adapter for the issue-tracker port.

pub mod client;
pub mod models;
pub mod tracker;

pub use client::{GitHubClient, RateLimiter};
pub use tracker::{GitHubTracker, SYSTEM};
