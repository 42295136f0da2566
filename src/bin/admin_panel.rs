use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use fitness_bot::admin_api;
use fitness_bot::config::AppConfig;
use fitness_bot::db;
use fitness_bot::logging::init_logging;
use fitness_bot::store::{FitnessStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_logging(config.log_format);

    let api_key = config
        .admin_api_key
        .clone()
        .context("ADMIN_API_KEY must be set")?;

    let pool = db::connect_with_retry(&config.database_url, &config.db).await?;
    db::init_database_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;

    let store: Arc<dyn FitnessStore> = Arc::new(PgStore::new(pool));
    let app = admin_api::router(store, api_key);

    let listener = tokio::net::TcpListener::bind(&config.admin_bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.admin_bind_addr))?;
    info!(addr = %config.admin_bind_addr, "Admin panel listening");
    axum::serve(listener, app).await?;

    Ok(())
}
