//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles incoming text messages and commands
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `dialogue_manager`: The admin flow engine
//! - `screens`: Data views rendered from the store
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod screens;
pub mod ui_builder;

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::error;

use crate::config::AppConfig;
use crate::dialogue::ConversationStore;
use crate::localization::{t_args_lang, t_lang};
use crate::store::FitnessStore;

use dialogue_manager::{describe_error, FlowEngine, Reply};
use screens::{render, Screen};
use ui_builder::choices_keyboard;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Telegram user ids are unsigned; actors and admin ids are stored as i64
pub fn actor_id(user_id: UserId) -> Option<i64> {
    i64::try_from(user_id.0).ok()
}

/// Shared handler dependencies, injected through dptree
#[derive(Clone)]
pub struct App {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn FitnessStore>,
    pub engine: FlowEngine,
}

impl App {
    pub fn new(config: AppConfig, store: Arc<dyn FitnessStore>) -> Self {
        let engine = FlowEngine::new(Arc::clone(&store), ConversationStore::new());
        Self {
            config: Arc::new(config),
            store,
            engine,
        }
    }
}

/// Send replies in order
pub async fn send_replies(
    bot: &Bot,
    chat_id: ChatId,
    app: &App,
    replies: Vec<Reply>,
    language_code: Option<&str>,
) -> Result<()> {
    for reply in replies {
        match reply {
            Reply::Text(text) => {
                bot.send_message(chat_id, text).await?;
            }
            Reply::Choices { text, choices } => {
                bot.send_message(chat_id, text)
                    .reply_markup(choices_keyboard(&choices))
                    .await?;
            }
            Reply::Screen(screen) => send_screen(bot, chat_id, app, screen, language_code).await?,
        }
    }
    Ok(())
}

async fn send_screen(
    bot: &Bot,
    chat_id: ChatId,
    app: &App,
    screen: Screen,
    language_code: Option<&str>,
) -> Result<()> {
    match render(app.store.as_ref(), screen, language_code).await {
        Ok(rendered) => {
            let mut request = bot.send_message(chat_id, rendered.text);
            if let Some(keyboard) = rendered.keyboard {
                request = request.reply_markup(keyboard);
            }
            request.await?;
        }
        Err(e) => {
            error!(chat_id = %chat_id, screen = ?screen, error = %e, "Failed to render screen");
            let text = if matches!(e, crate::errors::StoreError::NotFound { .. }) {
                t_lang("admin-not-found", language_code)
            } else {
                t_args_lang(
                    "error-load",
                    &[("error", describe_error(&e, language_code).as_str())],
                    language_code,
                )
            };
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}
