//! PostgreSQL persistence for the collaboration subsystem.
//!
//! Row structs live under [`models`], zero-sized repository structs under
//! [`repositories`]. Repositories take `&mut PgConnection` rather than a
//! pool so that service-layer operations compose inside one unit of work
//! ([`uow::UnitOfWork`]).

pub mod models;
pub mod repositories;
pub mod uow;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Cheap liveness probe for deployment health checks.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Returns `true` if `err` is a UNIQUE-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
