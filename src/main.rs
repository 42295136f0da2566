use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

use fitness_bot::bot::{callback_handler, message_handler, App};
use fitness_bot::config::AppConfig;
use fitness_bot::db;
use fitness_bot::localization::init_localization;
use fitness_bot::logging::init_logging;
use fitness_bot::store::{FitnessStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_logging(config.log_format);

    info!("Starting Fitness Telegram Bot");

    init_localization().context("Failed to load translations")?;

    let bot_token = config
        .telegram_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN must be set")?;

    let pool = db::connect_with_retry(&config.database_url, &config.db).await?;
    db::init_database_schema(&pool)
        .await
        .context("Failed to initialize database schema")?;

    info!(admins = config.admin_ids.len(), "Database ready");

    let store: Arc<dyn FitnessStore> = Arc::new(PgStore::new(pool));
    let app = App::new(config, store);

    let bot = Bot::new(bot_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
