//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use crate::localization::{t_args_lang, t_lang};

use super::dialogue_manager::{describe_error, Reply};
use super::screens::Screen;
use super::ui_builder::{main_menu_action, main_menu_keyboard, MainMenuAction};
use super::{actor_id, send_replies, App};

/// Sender of a text message
#[derive(Debug, Clone)]
pub struct Sender {
    pub telegram_id: i64,
    pub username: String,
    pub language_code: Option<String>,
}

impl Sender {
    fn from_user(user: &teloxide::types::User) -> Option<Self> {
        Some(Self {
            telegram_id: actor_id(user.id)?,
            username: user.username.clone().unwrap_or_default(),
            language_code: user.language_code.clone(),
        })
    }
}

/// "/start@my_bot args" -> "/start"
pub fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    Some(first.split('@').next().unwrap_or(first))
}

pub async fn message_handler(bot: Bot, msg: Message, app: App) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(sender) = Sender::from_user(user) else {
        warn!(user_id = user.id.0, "Ignoring message from an out-of-range user id");
        return Ok(());
    };
    let lang = sender.language_code.as_deref();

    debug!(user_id = sender.telegram_id, "Received text message");

    // /start sends the reply keyboard, which is not a flow reply
    if command_name(text) == Some("/start") && !app.engine.has_active_flow(sender.telegram_id).await
    {
        if let Err(e) = app
            .store
            .get_or_create_user(sender.telegram_id, &sender.username)
            .await
        {
            error!(user_id = sender.telegram_id, error = %e, "Failed to register user");
        }
        bot.send_message(msg.chat.id, t_lang("welcome", lang))
            .reply_markup(main_menu_keyboard(lang))
            .await?;
        return Ok(());
    }

    let replies = handle_text_message(&app, &sender, text).await;
    send_replies(&bot, msg.chat.id, &app, replies, lang).await
}

/// Decide what to answer to a text message. Active flows see every message
/// first, including commands.
pub async fn handle_text_message(app: &App, sender: &Sender, text: &str) -> Vec<Reply> {
    let user_id = sender.telegram_id;
    let lang = sender.language_code.as_deref();

    if app.engine.has_active_flow(user_id).await {
        return app.engine.handle_input(user_id, text).await;
    }

    if let Some(command) = command_name(text) {
        return handle_command(app, sender, command).await;
    }

    match main_menu_action(text) {
        Some(MainMenuAction::Trainings) => vec![Reply::Screen(Screen::Trainings)],
        Some(MainMenuAction::Nutrition) => vec![Reply::Screen(Screen::Nutrition)],
        Some(MainMenuAction::WeeklyMenu) => vec![Reply::Screen(Screen::WeeklyMenu)],
        Some(MainMenuAction::Categories) => vec![Reply::Screen(Screen::Categories)],
        Some(MainMenuAction::Help) => vec![Reply::Text(t_lang("help-text", lang))],
        None => vec![Reply::Text(t_lang("unknown-message", lang))],
    }
}

async fn handle_command(app: &App, sender: &Sender, command: &str) -> Vec<Reply> {
    let user_id = sender.telegram_id;
    let lang = sender.language_code.as_deref();
    let is_admin = app.config.is_admin(user_id);

    match command {
        "/start" => vec![Reply::Text(t_lang("welcome", lang))],
        "/help" => vec![Reply::Text(t_lang("help-text", lang))],
        "/cancel" => vec![Reply::Text(t_lang("nothing-to-cancel", lang))],
        "/admin" | "/foodlist" | "/checkdb" if !is_admin => {
            info!(user_id, command, "Admin command from non-admin");
            vec![Reply::Text(t_lang("admin-only", lang))]
        }
        "/admin" => vec![Reply::Screen(Screen::AdminPanel)],
        "/foodlist" => vec![Reply::Screen(Screen::FoodList)],
        "/checkdb" => match app.store.count_trainings().await {
            Ok(count) => vec![Reply::Text(t_args_lang(
                "checkdb-ok",
                &[("count", count.to_string().as_str())],
                lang,
            ))],
            Err(e) => {
                error!(error = %e, "Database check failed");
                vec![Reply::Text(t_args_lang(
                    "checkdb-failed",
                    &[("error", describe_error(&e, lang).as_str())],
                    lang,
                ))]
            }
        },
        _ => vec![Reply::Text(t_lang("unknown-command", lang))],
    }
}
