/// Schema migrations
///
/// The files in the workspace-root `migrations/` directory are embedded at
/// compile time and applied in version order.

use sqlx::{migrate::MigrateError, postgres::PgPool};
use tracing::{error, info};

/// Applies every pending migration
///
/// # Errors
///
/// Fails if a migration errors or an applied migration was edited afterwards.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Database migration failed");
            e
        })?;

    info!("Database schema is up to date");
    Ok(())
}
