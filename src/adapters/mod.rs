//! Adapters implementing the domain ports against concrete backends.

pub mod analysis;
pub mod github;
pub mod sqlite;

pub use analysis::SqliteImpactReader;
