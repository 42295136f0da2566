//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::localization::{get_message_in_language, t_args_lang, t_lang};
use crate::models::{Category, FullWeeklyMenu, Nutrition, Training, WeeklyMenu};

use super::callback_handler::{AdminAction, EntityKind};
use super::dialogue_manager::Choice;

/// Buttons of the persistent main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenuAction {
    Trainings,
    Nutrition,
    WeeklyMenu,
    Categories,
    Help,
}

const MAIN_MENU: [(MainMenuAction, &str); 5] = [
    (MainMenuAction::Trainings, "menu-trainings"),
    (MainMenuAction::Nutrition, "menu-nutrition"),
    (MainMenuAction::WeeklyMenu, "menu-weekly"),
    (MainMenuAction::Categories, "menu-categories"),
    (MainMenuAction::Help, "menu-help"),
];

/// Languages whose main menu labels are recognized
const MENU_LANGUAGES: [&str; 2] = ["ru", "en"];

/// Match a main menu button label in any supported language
pub fn main_menu_action(text: &str) -> Option<MainMenuAction> {
    let text = text.trim();
    MAIN_MENU.iter().find_map(|(action, key)| {
        MENU_LANGUAGES
            .iter()
            .any(|lang| get_message_in_language(key, lang, &[]) == text)
            .then_some(*action)
    })
}

/// Reply keyboard with the main menu
pub fn main_menu_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    let label = |key: &str| KeyboardButton::new(t_lang(key, language_code));
    KeyboardMarkup::new(vec![
        vec![label("menu-trainings"), label("menu-nutrition")],
        vec![label("menu-weekly"), label("menu-categories")],
        vec![label("menu-help")],
    ])
    .resize_keyboard()
}

/// Inline keyboard for flow choices, one button per row
pub fn choices_keyboard(choices: &[Choice]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        choices
            .iter()
            .map(|c| vec![InlineKeyboardButton::callback(c.label.clone(), c.token.clone())]),
    )
}

fn button(label: String, action: AdminAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_data())
}

fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

// ==================== User views ====================

pub fn format_trainings(trainings: &[Training], language_code: Option<&str>) -> String {
    if trainings.is_empty() {
        return t_lang("trainings-empty", language_code);
    }

    let mut result = format!("{}\n\n", t_lang("trainings-header", language_code));
    for (i, training) in trainings.iter().enumerate() {
        result.push_str(&t_args_lang(
            "training-item",
            &[
                ("index", (i + 1).to_string().as_str()),
                ("title", training.title.as_str()),
                ("duration", training.duration.to_string().as_str()),
            ],
            language_code,
        ));
        result.push('\n');
        if !training.description.is_empty() {
            result.push_str(&format!("   {}\n", training.description));
        }
        if !training.youtube_link.is_empty() {
            result.push_str(&format!("   ▶️ {}\n", training.youtube_link));
        }
    }
    result
}

fn nutrition_line(nutrition: &Nutrition, language_code: Option<&str>) -> String {
    t_args_lang(
        "nutrition-item",
        &[
            ("id", nutrition.id.to_string().as_str()),
            ("title", nutrition.title.as_str()),
            ("calories", nutrition.calories.to_string().as_str()),
            ("protein", format_grams(nutrition.protein).as_str()),
            ("carbs", format_grams(nutrition.carbs).as_str()),
            ("fats", format_grams(nutrition.fats).as_str()),
        ],
        language_code,
    )
}

/// Drops a trailing ".0" so whole grams read naturally
pub fn format_grams(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

pub fn format_nutrition_list(items: &[Nutrition], language_code: Option<&str>) -> String {
    if items.is_empty() {
        return t_lang("nutrition-empty", language_code);
    }

    let mut result = format!("{}\n\n", t_lang("nutrition-header", language_code));
    for nutrition in items {
        result.push_str(&nutrition_line(nutrition, language_code));
        result.push('\n');
        if !nutrition.description.is_empty() {
            result.push_str(&format!("   {}\n", nutrition.description));
        }
    }
    result
}

/// Compact `#id title` list used while picking a dish for a meal
pub fn format_food_list(items: &[Nutrition], language_code: Option<&str>) -> String {
    if items.is_empty() {
        return t_lang("nutrition-empty", language_code);
    }

    let mut result = format!("{}\n\n", t_lang("food-list-header", language_code));
    for nutrition in items {
        result.push_str(&t_args_lang(
            "food-list-item",
            &[
                ("id", nutrition.id.to_string().as_str()),
                ("title", nutrition.title.as_str()),
                ("calories", nutrition.calories.to_string().as_str()),
            ],
            language_code,
        ));
        result.push('\n');
    }
    result
}

/// Categories grouped by type: training, nutrition, then general
pub fn format_categories(categories: &[Category], language_code: Option<&str>) -> String {
    if categories.is_empty() {
        return t_lang("categories-empty", language_code);
    }

    let groups = [
        ("training", "categories-group-training"),
        ("nutrition", "categories-group-nutrition"),
        ("general", "categories-group-general"),
    ];

    let mut result = format!("{}\n", t_lang("categories-header", language_code));
    for (kind, header_key) in groups {
        let members: Vec<&Category> = categories
            .iter()
            .filter(|c| c.kind == kind || (kind == "general" && !is_known_kind(&c.kind)))
            .collect();
        if members.is_empty() {
            continue;
        }
        result.push_str(&format!("\n{}\n", t_lang(header_key, language_code)));
        for category in members {
            if category.description.is_empty() {
                result.push_str(&format!("• {}\n", category.name));
            } else {
                result.push_str(&format!("• {}: {}\n", category.name, category.description));
            }
        }
    }
    result
}

fn is_known_kind(kind: &str) -> bool {
    matches!(kind, "training" | "nutrition" | "general")
}

/// Menu with its days Monday first and each day's meals
pub fn format_weekly_menu(full: &FullWeeklyMenu, language_code: Option<&str>) -> String {
    let mut result = t_args_lang(
        "weekly-menu-header",
        &[
            ("name", full.menu.name.as_str()),
            ("calories", full.menu.total_calories.to_string().as_str()),
        ],
        language_code,
    );
    result.push('\n');
    if !full.menu.description.is_empty() {
        result.push_str(&format!("{}\n", full.menu.description));
    }

    if full.days.is_empty() {
        result.push_str(&format!("\n{}\n", t_lang("weekly-menu-no-days", language_code)));
        return result;
    }

    for day in full.days_by_weekday() {
        result.push_str(&format!(
            "\n📆 {}\n",
            t_args_lang(
                "weekly-menu-day",
                &[
                    ("day", day.day.day_name.as_str()),
                    ("calories", day.day.total_calories.to_string().as_str()),
                ],
                language_code,
            )
        ));
        for entry in &day.meals {
            let dish = entry
                .nutrition
                .as_ref()
                .map(|n| format!("{} ({} kcal)", n.title, n.calories))
                .unwrap_or_else(|| t_lang("weekly-menu-missing-dish", language_code));
            let time = if entry.meal.meal_time.is_empty() {
                String::new()
            } else {
                format!(" {}", entry.meal.meal_time)
            };
            result.push_str(&format!("  • {}{}: {}\n", entry.meal.meal_type, time, dish));
            if !entry.meal.notes.is_empty() {
                result.push_str(&format!("    📝 {}\n", entry.meal.notes));
            }
        }
    }
    result
}

// ==================== Admin keyboards ====================

pub fn admin_panel_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            t_lang("admin-btn-trainings", language_code),
            AdminAction::List(EntityKind::Training),
        )],
        vec![button(
            t_lang("admin-btn-nutrition", language_code),
            AdminAction::List(EntityKind::Nutrition),
        )],
        vec![button(
            t_lang("admin-btn-categories", language_code),
            AdminAction::List(EntityKind::Category),
        )],
        vec![button(
            t_lang("admin-btn-menus", language_code),
            AdminAction::List(EntityKind::Menu),
        )],
    ])
}

/// One row per entity plus "add" and "back" rows
pub fn entity_list_keyboard(
    kind: EntityKind,
    items: &[(i64, String)],
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|(id, label)| vec![button(truncate_label(label, 40), AdminAction::View(kind, *id))])
        .collect();

    rows.push(vec![button(
        format!("➕ {}", t_lang("admin-btn-add", language_code)),
        AdminAction::Add(kind),
    )]);
    rows.push(vec![button(
        format!("⬅️ {}", t_lang("admin-btn-back", language_code)),
        AdminAction::Panel,
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub fn item_actions_keyboard(
    kind: EntityKind,
    id: i64,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(
                format!("✏️ {}", t_lang("admin-btn-edit", language_code)),
                AdminAction::Edit(kind, id),
            ),
            button(
                format!("🗑️ {}", t_lang("admin-btn-delete", language_code)),
                AdminAction::Delete(kind, id),
            ),
        ],
        vec![button(
            format!("⬅️ {}", t_lang("admin-btn-back", language_code)),
            AdminAction::List(kind),
        )],
    ])
}

pub fn confirm_delete_keyboard(
    kind: EntityKind,
    id: i64,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(
            format!("✅ {}", t_lang("admin-btn-confirm-delete", language_code)),
            AdminAction::ConfirmDelete(kind, id),
        ),
        button(
            format!("❌ {}", t_lang("admin-btn-cancel", language_code)),
            AdminAction::View(kind, id),
        ),
    ]])
}

/// Admin controls of one weekly menu, including one delete button per meal
pub fn menu_admin_keyboard(
    full: &FullWeeklyMenu,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let menu_id = full.menu.id;
    let mut rows = Vec::new();

    if !full.menu.active {
        rows.push(vec![button(
            format!("✅ {}", t_lang("admin-btn-activate", language_code)),
            AdminAction::ActivateMenu(menu_id),
        )]);
    }

    let mut add_row = vec![button(
        format!("➕ {}", t_lang("admin-btn-add-day", language_code)),
        AdminAction::AddDay(menu_id),
    )];
    if !full.days.is_empty() {
        add_row.push(button(
            format!("🍽 {}", t_lang("admin-btn-add-meal", language_code)),
            AdminAction::AddMeal(menu_id),
        ));
    }
    rows.push(add_row);

    for day in full.days_by_weekday() {
        for entry in &day.meals {
            let label = format!(
                "🗑️ {} · {}",
                day.day.day_name, entry.meal.meal_type
            );
            rows.push(vec![button(
                truncate_label(&label, 40),
                AdminAction::DeleteMeal {
                    menu_id,
                    meal_id: entry.meal.id,
                },
            )]);
        }
    }

    rows.push(vec![
        button(
            format!("🗑️ {}", t_lang("admin-btn-delete", language_code)),
            AdminAction::Delete(EntityKind::Menu, menu_id),
        ),
        button(
            format!("⬅️ {}", t_lang("admin-btn-back", language_code)),
            AdminAction::List(EntityKind::Menu),
        ),
    ]);

    InlineKeyboardMarkup::new(rows)
}

pub fn training_label(training: &Training) -> String {
    format!("{} ({}′)", training.title, training.duration)
}

pub fn nutrition_label(nutrition: &Nutrition) -> String {
    format!("#{} {} ({} kcal)", nutrition.id, nutrition.title, nutrition.calories)
}

pub fn category_label(category: &Category) -> String {
    format!("{} [{}]", category.name, category.kind)
}

pub fn menu_label(menu: &WeeklyMenu) -> String {
    if menu.active {
        format!("✅ {} ({} kcal)", menu.name, menu.total_calories)
    } else {
        format!("{} ({} kcal)", menu.name, menu.total_calories)
    }
}
