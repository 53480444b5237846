//! Schema migrations, embedded at compile time.
//!
//! Migrations run unconditionally at startup, before the bootstrap seed
//! and before the server accepts its first attach.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use parlor_core::error::{AppError, ErrorKind};
use parlor_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply any pending migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;

    info!(
        known_migrations = MIGRATOR.migrations.len(),
        "Database schema is up to date"
    );
    Ok(())
}
