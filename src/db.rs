use std::time::Duration;

use anyhow::Context;
use sqlx::{
    migrate::{Migrate, Migrator},
    postgres::PgPoolOptions,
    PgPool,
};
use tracing::info;

/// Reversible migrations from `./migrations`, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .context("connect to database")
}

pub async fn run_migrations(db: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(db).await.context("apply migrations")?;
    info!("migrations applied");
    Ok(())
}

/// Reverts the most recently applied migration. Returns its version, or
/// `None` if nothing was applied.
pub async fn rollback_last(db: &PgPool) -> anyhow::Result<Option<i64>> {
    let latest = {
        let mut conn = db.acquire().await.context("acquire connection")?;
        conn.ensure_migrations_table()
            .await
            .context("ensure migrations table")?;
        conn.list_applied_migrations()
            .await
            .context("list applied migrations")?
            .into_iter()
            .map(|m| m.version)
            .max()
    };

    let Some(latest) = latest else {
        return Ok(None);
    };

    MIGRATOR
        .undo(db, previous_version(latest))
        .await
        .with_context(|| format!("revert migration {latest}"))?;
    info!(version = latest, "migration reverted");
    Ok(Some(latest))
}

/// The embedded migration version just below `version`, or 0.
fn previous_version(version: i64) -> i64 {
    MIGRATOR
        .iter()
        .map(|m| m.version)
        .filter(|v| *v < version)
        .max()
        .unwrap_or(0)
}
