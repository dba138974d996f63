//! Greenlight database layer.
//!
//! Entity models live in [`models`], query code in [`repositories`].
//! Repositories are zero-sized structs with async methods taking the pool
//! (or an open transaction for multi-statement transitions) as the first
//! argument. Schema migrations live at `db/migrations` in the repo root.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// A transaction against the backing Postgres store. Engine transitions
/// thread one of these through every read and write so a failure at any
/// point rolls the whole transition back.
pub type DbTx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
