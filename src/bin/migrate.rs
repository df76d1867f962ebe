use std::time::Duration;

use anyhow::Context;
use accounts::{db, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("accounts=info,sqlx=warn");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::connect(&database_url, 1, Duration::from_secs(30)).await?;

    match std::env::args().nth(1).as_deref() {
        None => db::run_migrations(&pool).await?,
        Some("rollback") => match db::rollback_last(&pool).await? {
            Some(version) => tracing::info!(version, "rollback finished"),
            None => tracing::info!("nothing to roll back"),
        },
        Some(other) => anyhow::bail!("unknown command {other:?}; expected no argument or `rollback`"),
    }

    Ok(())
}
