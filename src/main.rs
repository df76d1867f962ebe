use std::sync::Arc;
use std::time::Duration;

use accounts::{app, config::AppConfig, db, state::AppState, telemetry, users::PgUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("accounts=debug,axum=info,tower_http=info");

    let config = Arc::new(AppConfig::from_env()?);

    let pool = db::connect(
        &config.database_url,
        config.database_max_connections,
        Duration::from_secs(config.request_timeout_secs),
    )
    .await?;
    db::run_migrations(&pool).await?;

    let addr = config.bind_addr()?;
    let state = AppState::new(config, Arc::new(PgUserStore::new(pool)))?;

    app::serve(app::build_app(state), addr).await
}
