//! State store handing resource identifiers from one setup stage to the next.

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

mod models;
mod resources;

pub use models::*;
pub use resources::*;

/// Creates a connection pool to the `SQLite` state database.
///
/// In-memory databases are private to a connection, so they get a pool of one.
///
/// # Errors
///
/// Returns an error if the connection to the database fails.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
