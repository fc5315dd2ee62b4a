//! In-memory database setup for integration tests.

use sqlx::SqlitePool;

use failsift::adapters::sqlite::{all_migrations, create_test_pool, Migrator};

/// Creates a fresh in-memory database with the full schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let pool = create_test_pool().await.expect("failed to create test pool");
    let migrator = Migrator::new(pool.clone());
    migrator
        .run_embedded_migrations(all_migrations())
        .await
        .expect("failed to run migrations");
    pool
}
