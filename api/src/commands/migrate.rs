use tracing::info;

use crate::repository::Database;

/// Schema migration runner (§1 "schema migration runner" — a thin
/// collaborator, not part of the core). Delegates entirely to `sqlx`'s
/// compiled-in migrator over `../migrations`; no core logic lives here.
pub async fn run(database: &Database) -> anyhow::Result<()> {
    info!("Running database migrations");
    sqlx::migrate!("../migrations").run(&*database.pool).await?;
    info!("Migrations applied");
    Ok(())
}
