//! Data views the bot can show: lists, details and the admin panel.
//!
//! Screens are requested by value (from flows and callbacks) and rendered
//! against the store at send time, so they always show fresh data.

use teloxide::types::InlineKeyboardMarkup;

use crate::errors::{StoreError, StoreResult};
use crate::localization::{t_args_lang, t_lang};
use crate::services;
use crate::store::FitnessStore;

use super::callback_handler::EntityKind;
use super::ui_builder::{
    admin_panel_keyboard, category_label, confirm_delete_keyboard, entity_list_keyboard,
    format_categories, format_food_list, format_grams, format_nutrition_list, format_trainings,
    format_weekly_menu, item_actions_keyboard, menu_admin_keyboard, menu_label, nutrition_label, training_label,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    AdminPanel,
    TrainingsAdmin,
    NutritionAdmin,
    CategoriesAdmin,
    WeeklyMenusAdmin,
    /// One training, nutrition or category with edit/delete controls
    Item(EntityKind, i64),
    /// Asks before deleting an entity
    ConfirmDelete(EntityKind, i64),
    MenuDetails(i64),
    FoodList,
    Trainings,
    Nutrition,
    Categories,
    WeeklyMenu,
}

impl Screen {
    /// Admin list of an entity kind
    pub fn admin_list(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Training => Screen::TrainingsAdmin,
            EntityKind::Nutrition => Screen::NutritionAdmin,
            EntityKind::Category => Screen::CategoriesAdmin,
            EntityKind::Menu => Screen::WeeklyMenusAdmin,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Rendered {
    fn text(text: String) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }

    fn with_keyboard(text: String, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text,
            keyboard: Some(keyboard),
        }
    }
}

pub async fn render(
    store: &dyn FitnessStore,
    screen: Screen,
    language_code: Option<&str>,
) -> StoreResult<Rendered> {
    let lang = language_code;

    let rendered = match screen {
        Screen::AdminPanel => {
            Rendered::with_keyboard(t_lang("admin-panel-title", lang), admin_panel_keyboard(lang))
        }
        Screen::TrainingsAdmin => {
            let trainings = store.list_trainings().await?;
            let items: Vec<(i64, String)> =
                trainings.iter().map(|t| (t.id, training_label(t))).collect();
            Rendered::with_keyboard(
                admin_list_text("admin-trainings-title", items.len(), lang),
                entity_list_keyboard(EntityKind::Training, &items, lang),
            )
        }
        Screen::NutritionAdmin => {
            let nutrition = store.list_nutrition().await?;
            let items: Vec<(i64, String)> =
                nutrition.iter().map(|n| (n.id, nutrition_label(n))).collect();
            Rendered::with_keyboard(
                admin_list_text("admin-nutrition-title", items.len(), lang),
                entity_list_keyboard(EntityKind::Nutrition, &items, lang),
            )
        }
        Screen::CategoriesAdmin => {
            let categories = store.list_categories().await?;
            let items: Vec<(i64, String)> =
                categories.iter().map(|c| (c.id, category_label(c))).collect();
            Rendered::with_keyboard(
                admin_list_text("admin-categories-title", items.len(), lang),
                entity_list_keyboard(EntityKind::Category, &items, lang),
            )
        }
        Screen::WeeklyMenusAdmin => {
            let menus = store.list_weekly_menus().await?;
            let items: Vec<(i64, String)> = menus.iter().map(|m| (m.id, menu_label(m))).collect();
            Rendered::with_keyboard(
                admin_list_text("admin-menus-title", items.len(), lang),
                entity_list_keyboard(EntityKind::Menu, &items, lang),
            )
        }
        Screen::MenuDetails(id) => menu_view(store, id, lang).await?,
        Screen::Item(kind, id) => item_view(store, kind, id, lang).await?,
        Screen::ConfirmDelete(kind, id) => Rendered::with_keyboard(
            t_args_lang(
                "admin-confirm-delete",
                &[
                    ("entity", t_lang(kind.label_key(), lang).as_str()),
                    ("id", id.to_string().as_str()),
                ],
                lang,
            ),
            confirm_delete_keyboard(kind, id, lang),
        ),
        Screen::FoodList => Rendered::text(format_food_list(&store.list_nutrition().await?, lang)),
        Screen::Trainings => Rendered::text(format_trainings(&store.list_trainings().await?, lang)),
        Screen::Nutrition => {
            Rendered::text(format_nutrition_list(&store.list_nutrition().await?, lang))
        }
        Screen::Categories => {
            Rendered::text(format_categories(&store.list_categories().await?, lang))
        }
        Screen::WeeklyMenu => match services::get_active_weekly_menu(store).await? {
            Some(full) => Rendered::text(format_weekly_menu(&full, lang)),
            None => Rendered::text(t_lang("weekly-menu-none", lang)),
        },
    };

    Ok(rendered)
}

fn admin_list_text(title_key: &str, count: usize, lang: Option<&str>) -> String {
    format!(
        "{}\n{}",
        t_lang(title_key, lang),
        t_args_lang("admin-list-count", &[("count", count.to_string().as_str())], lang)
    )
}

async fn menu_view(store: &dyn FitnessStore, id: i64, lang: Option<&str>) -> StoreResult<Rendered> {
    let full = services::get_full_weekly_menu(store, id).await?;
    Ok(Rendered::with_keyboard(
        format_weekly_menu(&full, lang),
        menu_admin_keyboard(&full, lang),
    ))
}

/// Details of one entity. Menus get the full menu view with its own keyboard.
async fn item_view(
    store: &dyn FitnessStore,
    kind: EntityKind,
    id: i64,
    lang: Option<&str>,
) -> StoreResult<Rendered> {
    let not_found = || StoreError::not_found(kind.entity_name(), id);

    let text = match kind {
        EntityKind::Training => {
            let t = store.get_training(id).await?.ok_or_else(not_found)?;
            let mut text = t_args_lang(
                "admin-training-details",
                &[
                    ("id", t.id.to_string().as_str()),
                    ("title", t.title.as_str()),
                    ("duration", t.duration.to_string().as_str()),
                ],
                lang,
            );
            if !t.description.is_empty() {
                text.push_str(&format!("\n{}", t.description));
            }
            if !t.youtube_link.is_empty() {
                text.push_str(&format!("\n▶️ {}", t.youtube_link));
            }
            text
        }
        EntityKind::Nutrition => {
            let n = store.get_nutrition(id).await?.ok_or_else(not_found)?;
            let mut text = t_args_lang(
                "admin-nutrition-details",
                &[
                    ("id", n.id.to_string().as_str()),
                    ("title", n.title.as_str()),
                    ("calories", n.calories.to_string().as_str()),
                    ("protein", format_grams(n.protein).as_str()),
                    ("carbs", format_grams(n.carbs).as_str()),
                    ("fats", format_grams(n.fats).as_str()),
                ],
                lang,
            );
            if !n.description.is_empty() {
                text.push_str(&format!("\n{}", n.description));
            }
            text
        }
        EntityKind::Category => {
            let c = store.get_category(id).await?.ok_or_else(not_found)?;
            let mut text = t_args_lang(
                "admin-category-details",
                &[
                    ("id", c.id.to_string().as_str()),
                    ("name", c.name.as_str()),
                    ("kind", c.kind.as_str()),
                ],
                lang,
            );
            if !c.description.is_empty() {
                text.push_str(&format!("\n{}", c.description));
            }
            text
        }
        EntityKind::Menu => return menu_view(store, id, lang).await,
    };
    Ok(Rendered::with_keyboard(
        text,
        item_actions_keyboard(kind, id, lang),
    ))
}
