//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, warn};

use crate::dialogue::Flow;
use crate::errors::StoreResult;
use crate::localization::{t_args_lang, t_lang};
use crate::services;

use super::dialogue_manager::{describe_error, Reply, FLOW_TOKEN_PREFIX};
use super::screens::Screen;
use super::{actor_id, send_replies, App};

/// Entity kinds managed from the admin panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Training,
    Nutrition,
    Category,
    Menu,
}

impl EntityKind {
    /// Name used in callback data and error values
    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityKind::Training => "training",
            EntityKind::Nutrition => "nutrition",
            EntityKind::Category => "category",
            EntityKind::Menu => "menu",
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            EntityKind::Training => "entity-training",
            EntityKind::Nutrition => "entity-nutrition",
            EntityKind::Category => "entity-category",
            EntityKind::Menu => "entity-menu",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "training" => Some(EntityKind::Training),
            "nutrition" => Some(EntityKind::Nutrition),
            "category" => Some(EntityKind::Category),
            "menu" => Some(EntityKind::Menu),
            _ => None,
        }
    }
}

/// Admin panel button actions, encoded as `admin_*` callback data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Panel,
    List(EntityKind),
    Add(EntityKind),
    View(EntityKind, i64),
    Edit(EntityKind, i64),
    Delete(EntityKind, i64),
    ConfirmDelete(EntityKind, i64),
    ActivateMenu(i64),
    AddDay(i64),
    AddMeal(i64),
    DeleteMeal { menu_id: i64, meal_id: i64 },
}

impl AdminAction {
    pub fn to_data(&self) -> String {
        match self {
            AdminAction::Panel => "admin_panel".to_string(),
            AdminAction::List(kind) => format!("admin_list_{}", kind.entity_name()),
            AdminAction::Add(kind) => format!("admin_add_{}", kind.entity_name()),
            AdminAction::View(kind, id) => format!("admin_view_{}_{id}", kind.entity_name()),
            AdminAction::Edit(kind, id) => format!("admin_edit_{}_{id}", kind.entity_name()),
            AdminAction::Delete(kind, id) => format!("admin_delete_{}_{id}", kind.entity_name()),
            AdminAction::ConfirmDelete(kind, id) => {
                format!("admin_confirm_delete_{}_{id}", kind.entity_name())
            }
            AdminAction::ActivateMenu(id) => format!("admin_activate_menu_{id}"),
            AdminAction::AddDay(id) => format!("admin_add_day_{id}"),
            AdminAction::AddMeal(id) => format!("admin_add_meal_{id}"),
            AdminAction::DeleteMeal { menu_id, meal_id } => {
                format!("admin_delete_meal_{menu_id}_{meal_id}")
            }
        }
    }

    /// Parse callback data produced by [`AdminAction::to_data`]
    pub fn parse(data: &str) -> Option<Self> {
        let rest = data.strip_prefix("admin_")?;

        if rest == "panel" {
            return Some(AdminAction::Panel);
        }
        // Longer prefixes first: "delete_meal_" before "delete_", "add_day_" before "add_"
        if let Some(ids) = rest.strip_prefix("delete_meal_") {
            let (menu_id, meal_id) = ids.split_once('_')?;
            return Some(AdminAction::DeleteMeal {
                menu_id: parse_id(menu_id)?,
                meal_id: parse_id(meal_id)?,
            });
        }
        if let Some(id) = rest.strip_prefix("activate_menu_") {
            return Some(AdminAction::ActivateMenu(parse_id(id)?));
        }
        if let Some(id) = rest.strip_prefix("add_day_") {
            return Some(AdminAction::AddDay(parse_id(id)?));
        }
        if let Some(id) = rest.strip_prefix("add_meal_") {
            return Some(AdminAction::AddMeal(parse_id(id)?));
        }
        if let Some(target) = rest.strip_prefix("confirm_delete_") {
            let (kind, id) = parse_target(target)?;
            return Some(AdminAction::ConfirmDelete(kind, id));
        }
        if let Some(target) = rest.strip_prefix("delete_") {
            let (kind, id) = parse_target(target)?;
            return Some(AdminAction::Delete(kind, id));
        }
        if let Some(target) = rest.strip_prefix("edit_") {
            let (kind, id) = parse_target(target)?;
            // Weekly menus are not editable
            if kind == EntityKind::Menu {
                return None;
            }
            return Some(AdminAction::Edit(kind, id));
        }
        if let Some(target) = rest.strip_prefix("view_") {
            let (kind, id) = parse_target(target)?;
            return Some(AdminAction::View(kind, id));
        }
        if let Some(name) = rest.strip_prefix("list_") {
            return Some(AdminAction::List(EntityKind::parse(name)?));
        }
        if let Some(name) = rest.strip_prefix("add_") {
            return Some(AdminAction::Add(EntityKind::parse(name)?));
        }
        None
    }
}

fn parse_id(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|id| *id > 0)
}

fn parse_target(target: &str) -> Option<(EntityKind, i64)> {
    let (name, id) = target.split_once('_')?;
    Some((EntityKind::parse(name)?, parse_id(id)?))
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, app: App) -> Result<()> {
    let Some(user_id) = actor_id(q.from.id) else {
        warn!(user_id = q.from.id.0, "Ignoring callback from an out-of-range user id");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let language_code = q.from.language_code.clone();
    let lang = language_code.as_deref();
    let data = q.data.clone().unwrap_or_default();

    debug!(user_id, data = %data, "Received callback query from user");

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if !app.config.is_admin(user_id) {
        warn!(user_id, "Non-admin pressed an admin button");
        bot.answer_callback_query(q.id.clone())
            .text(t_lang("access-denied", lang))
            .await?;
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone()).await?;

    let replies = if let Some(input) = data.strip_prefix(FLOW_TOKEN_PREFIX) {
        let replies = app.engine.handle_input(user_id, input).await;
        if replies.is_empty() {
            vec![Reply::Text(t_lang("flow-expired", lang))]
        } else {
            replies
        }
    } else {
        match AdminAction::parse(&data) {
            Some(action) => handle_admin_action(&app, user_id, action, lang).await,
            None => {
                warn!(user_id, data = %data, "Unknown callback data");
                Vec::new()
            }
        }
    };

    send_replies(&bot, chat_id, &app, replies, lang).await
}

/// Perform an admin panel action and describe what to show. The caller has
/// already checked that `user_id` is an admin.
pub async fn handle_admin_action(
    app: &App,
    user_id: i64,
    action: AdminAction,
    lang: Option<&str>,
) -> Vec<Reply> {
    let store = app.store.as_ref();

    match action {
        AdminAction::Panel => vec![Reply::Screen(Screen::AdminPanel)],
        AdminAction::List(kind) => vec![Reply::Screen(Screen::admin_list(kind))],
        AdminAction::Add(kind) => {
            let flow = match kind {
                EntityKind::Training => Flow::add_training(None),
                EntityKind::Nutrition => Flow::add_nutrition(),
                EntityKind::Category => Flow::add_category(),
                EntityKind::Menu => Flow::add_weekly_menu(),
            };
            app.engine.start(user_id, flow, lang).await
        }
        AdminAction::View(EntityKind::Menu, id) => vec![Reply::Screen(Screen::MenuDetails(id))],
        AdminAction::View(kind, id) => vec![Reply::Screen(Screen::Item(kind, id))],
        AdminAction::Edit(kind, id) => {
            let exists = match kind {
                EntityKind::Training => store.get_training(id).await.map(|t| t.is_some()),
                EntityKind::Nutrition => store.get_nutrition(id).await.map(|n| n.is_some()),
                EntityKind::Category => store.get_category(id).await.map(|c| c.is_some()),
                EntityKind::Menu => return vec![Reply::Screen(Screen::MenuDetails(id))],
            };
            match exists {
                Ok(true) => {
                    let flow = match kind {
                        EntityKind::Training => Flow::edit_training(id),
                        EntityKind::Nutrition => Flow::edit_nutrition(id),
                        _ => Flow::edit_category(id),
                    };
                    app.engine.start(user_id, flow, lang).await
                }
                Ok(false) => vec![
                    Reply::Text(t_lang("admin-not-found", lang)),
                    Reply::Screen(Screen::admin_list(kind)),
                ],
                Err(e) => action_failed(&e, lang),
            }
        }
        AdminAction::Delete(kind, id) => vec![Reply::Screen(Screen::ConfirmDelete(kind, id))],
        AdminAction::ConfirmDelete(kind, id) => {
            let result = match kind {
                EntityKind::Training => store.delete_training(id).await,
                EntityKind::Nutrition => store.delete_nutrition(id).await,
                EntityKind::Category => store.delete_category(id).await,
                EntityKind::Menu => store.delete_weekly_menu(id).await,
            };
            match result {
                Ok(true) => vec![
                    Reply::Text(t_lang("admin-deleted", lang)),
                    Reply::Screen(Screen::admin_list(kind)),
                ],
                Ok(false) => vec![
                    Reply::Text(t_lang("admin-not-found", lang)),
                    Reply::Screen(Screen::admin_list(kind)),
                ],
                Err(e) => action_failed(&e, lang),
            }
        }
        AdminAction::ActivateMenu(id) => match services::activate_weekly_menu(store, id).await {
            Ok(()) => vec![
                Reply::Text(t_lang("admin-menu-activated", lang)),
                Reply::Screen(Screen::MenuDetails(id)),
            ],
            Err(e) => action_failed(&e, lang),
        },
        AdminAction::AddDay(menu_id) => {
            app.engine
                .start(user_id, Flow::add_day_to_menu(menu_id), lang)
                .await
        }
        AdminAction::AddMeal(menu_id) => {
            app.engine
                .start(user_id, Flow::add_meal_to_day(menu_id), lang)
                .await
        }
        AdminAction::DeleteMeal { menu_id, meal_id } => {
            let result: StoreResult<()> = services::delete_meal_from_day(store, meal_id).await;
            match result {
                Ok(()) => vec![
                    Reply::Text(t_lang("meal-deleted", lang)),
                    Reply::Screen(Screen::MenuDetails(menu_id)),
                ],
                Err(e) => action_failed(&e, lang),
            }
        }
    }
}

fn action_failed(e: &crate::errors::StoreError, lang: Option<&str>) -> Vec<Reply> {
    error!(error = %e, "Admin action failed");
    vec![Reply::Text(t_args_lang(
        "admin-action-failed",
        &[("error", describe_error(e, lang).as_str())],
        lang,
    ))]
}
