//! Admin conversation state: typed per-flow forms, input parsers and the
//! per-actor store that holds them between messages.
//!
//! Every form enum has one variant per step. A variant carries exactly the
//! values collected before that step, so a flow can never sit on a step its
//! kind does not have and a field can never hold the wrong type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{InMemStorage, Storage};
use teloxide::types::ChatId;
use thiserror::Error;
use tracing::{debug, warn};

/// Keywords that abort any flow at any step
pub const CANCEL_KEYWORDS: [&str; 3] = ["/cancel", "cancel", "отмена"];

/// Command accepted at the meal nutrition step to list available dishes
pub const FOOD_LIST_COMMAND: &str = "/foodlist";

/// Optional text fields treat this as "leave empty"
pub const SKIP_MARKER: &str = "-";

/// Stored day names, Monday first
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
    "Воскресенье",
];

/// Rejected step input. The step is repeated and nothing is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("expected a number")]
    NotANumber,
    #[error("expected a positive number")]
    NotPositive,
    #[error("expected a non-negative id")]
    NegativeId,
    #[error("day number must be between 1 and 7")]
    DayOutOfRange,
}

impl InputError {
    pub fn message_key(&self) -> &'static str {
        match self {
            InputError::NotANumber => "input-not-a-number",
            InputError::NotPositive => "input-not-positive",
            InputError::NegativeId => "input-negative-id",
            InputError::DayOutOfRange => "input-day-out-of-range",
        }
    }
}

// ==================== Parsers ====================

pub fn is_cancel_keyword(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    CANCEL_KEYWORDS.contains(&normalized.as_str())
}

pub fn is_food_list_request(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(FOOD_LIST_COMMAND)
}

/// "да" or "yes", case-insensitive. Anything else is a no.
pub fn is_affirmative(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "да" | "yes")
}

pub fn parse_int(text: &str) -> Result<i64, InputError> {
    text.trim().parse::<i64>().map_err(|_| InputError::NotANumber)
}

pub fn parse_positive_int(text: &str) -> Result<i32, InputError> {
    let value = text
        .trim()
        .parse::<i32>()
        .map_err(|_| InputError::NotANumber)?;
    if value <= 0 {
        return Err(InputError::NotPositive);
    }
    Ok(value)
}

/// Accepts both "12.5" and "12,5"
pub fn parse_decimal(text: &str) -> Result<f64, InputError> {
    let normalized = text.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::NotANumber),
    }
}

/// `0` means "no category"; negative ids are rejected
pub fn parse_category_id(text: &str) -> Result<Option<i64>, InputError> {
    match parse_int(text)? {
        0 => Ok(None),
        id if id > 0 => Ok(Some(id)),
        _ => Err(InputError::NegativeId),
    }
}

pub fn parse_day_number(text: &str) -> Result<i32, InputError> {
    let value = text
        .trim()
        .parse::<i32>()
        .map_err(|_| InputError::NotANumber)?;
    if !(1..=7).contains(&value) {
        return Err(InputError::DayOutOfRange);
    }
    Ok(value)
}

pub fn weekday_name(day_number: i32) -> Option<&'static str> {
    let index = usize::try_from(day_number.checked_sub(1)?).ok()?;
    WEEKDAY_NAMES.get(index).copied()
}

/// "1".."4" pick a standard meal type; any other text is used as is
pub fn meal_type_from_input(text: &str) -> String {
    match text.trim() {
        "1" => "Завтрак".to_string(),
        "2" => "Обед".to_string(),
        "3" => "Ужин".to_string(),
        "4" => "Перекус".to_string(),
        other => other.to_string(),
    }
}

pub fn required_text(text: &str) -> String {
    text.trim().to_string()
}

pub fn optional_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed == SKIP_MARKER {
        String::new()
    } else {
        trimmed.to_string()
    }
}

// ==================== Forms ====================

/// Result of feeding one message to a linear form
#[derive(Debug, Clone, PartialEq)]
pub enum Advance<F, T> {
    Next(F),
    Done(T),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFields {
    pub title: String,
    pub duration: i32,
    pub youtube_link: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TrainingForm {
    #[default]
    Title,
    Duration {
        title: String,
    },
    YoutubeLink {
        title: String,
        duration: i32,
    },
    Description {
        title: String,
        duration: i32,
        youtube_link: String,
    },
}

impl TrainingForm {
    pub fn step(&self) -> u8 {
        match self {
            TrainingForm::Title => 1,
            TrainingForm::Duration { .. } => 2,
            TrainingForm::YoutubeLink { .. } => 3,
            TrainingForm::Description { .. } => 4,
        }
    }

    pub fn prompt_key(&self, editing: bool) -> &'static str {
        match (self, editing) {
            (TrainingForm::Title, false) => "training-title-prompt",
            (TrainingForm::Title, true) => "training-title-edit-prompt",
            (TrainingForm::Duration { .. }, _) => "training-duration-prompt",
            (TrainingForm::YoutubeLink { .. }, false) => "training-youtube-prompt",
            (TrainingForm::YoutubeLink { .. }, true) => "training-youtube-edit-prompt",
            (TrainingForm::Description { .. }, false) => "training-description-prompt",
            (TrainingForm::Description { .. }, true) => "training-description-edit-prompt",
        }
    }

    pub fn accept(&self, text: &str) -> Result<Advance<Self, TrainingFields>, InputError> {
        Ok(match self {
            TrainingForm::Title => Advance::Next(TrainingForm::Duration {
                title: required_text(text),
            }),
            TrainingForm::Duration { title } => Advance::Next(TrainingForm::YoutubeLink {
                title: title.clone(),
                duration: parse_positive_int(text)?,
            }),
            TrainingForm::YoutubeLink { title, duration } => {
                Advance::Next(TrainingForm::Description {
                    title: title.clone(),
                    duration: *duration,
                    youtube_link: optional_text(text),
                })
            }
            TrainingForm::Description {
                title,
                duration,
                youtube_link,
            } => Advance::Done(TrainingFields {
                title: title.clone(),
                duration: *duration,
                youtube_link: youtube_link.clone(),
                description: optional_text(text),
            }),
        })
    }
}

/// Title and description, shared by the later nutrition steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionHead {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionFields {
    pub title: String,
    pub description: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum NutritionForm {
    #[default]
    Title,
    Description {
        title: String,
    },
    Calories {
        head: NutritionHead,
    },
    Protein {
        head: NutritionHead,
        calories: i32,
    },
    Carbs {
        head: NutritionHead,
        calories: i32,
        protein: f64,
    },
    Fats {
        head: NutritionHead,
        calories: i32,
        protein: f64,
        carbs: f64,
    },
    Category {
        head: NutritionHead,
        calories: i32,
        protein: f64,
        carbs: f64,
        fats: f64,
    },
}

impl NutritionForm {
    pub fn step(&self) -> u8 {
        match self {
            NutritionForm::Title => 1,
            NutritionForm::Description { .. } => 2,
            NutritionForm::Calories { .. } => 3,
            NutritionForm::Protein { .. } => 4,
            NutritionForm::Carbs { .. } => 5,
            NutritionForm::Fats { .. } => 6,
            NutritionForm::Category { .. } => 7,
        }
    }

    pub fn prompt_key(&self, editing: bool) -> &'static str {
        match (self, editing) {
            (NutritionForm::Title, false) => "nutrition-title-prompt",
            (NutritionForm::Title, true) => "nutrition-title-edit-prompt",
            (NutritionForm::Description { .. }, false) => "nutrition-description-prompt",
            (NutritionForm::Description { .. }, true) => "nutrition-description-edit-prompt",
            (NutritionForm::Calories { .. }, _) => "nutrition-calories-prompt",
            (NutritionForm::Protein { .. }, _) => "nutrition-protein-prompt",
            (NutritionForm::Carbs { .. }, _) => "nutrition-carbs-prompt",
            (NutritionForm::Fats { .. }, _) => "nutrition-fats-prompt",
            (NutritionForm::Category { .. }, _) => "nutrition-category-prompt",
        }
    }

    pub fn accept(&self, text: &str) -> Result<Advance<Self, NutritionFields>, InputError> {
        Ok(match self {
            NutritionForm::Title => Advance::Next(NutritionForm::Description {
                title: required_text(text),
            }),
            NutritionForm::Description { title } => Advance::Next(NutritionForm::Calories {
                head: NutritionHead {
                    title: title.clone(),
                    description: optional_text(text),
                },
            }),
            NutritionForm::Calories { head } => {
                let calories =
                    i32::try_from(parse_int(text)?).map_err(|_| InputError::NotANumber)?;
                Advance::Next(NutritionForm::Protein {
                    head: head.clone(),
                    calories,
                })
            }
            NutritionForm::Protein { head, calories } => Advance::Next(NutritionForm::Carbs {
                head: head.clone(),
                calories: *calories,
                protein: parse_decimal(text)?,
            }),
            NutritionForm::Carbs {
                head,
                calories,
                protein,
            } => Advance::Next(NutritionForm::Fats {
                head: head.clone(),
                calories: *calories,
                protein: *protein,
                carbs: parse_decimal(text)?,
            }),
            NutritionForm::Fats {
                head,
                calories,
                protein,
                carbs,
            } => Advance::Next(NutritionForm::Category {
                head: head.clone(),
                calories: *calories,
                protein: *protein,
                carbs: *carbs,
                fats: parse_decimal(text)?,
            }),
            NutritionForm::Category {
                head,
                calories,
                protein,
                carbs,
                fats,
            } => Advance::Done(NutritionFields {
                title: head.title.clone(),
                description: head.description.clone(),
                calories: *calories,
                protein: *protein,
                carbs: *carbs,
                fats: *fats,
                category_id: parse_category_id(text)?,
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFields {
    pub name: String,
    pub description: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CategoryForm {
    #[default]
    Name,
    Description {
        name: String,
    },
    Kind {
        name: String,
        description: String,
    },
}

impl CategoryForm {
    pub fn step(&self) -> u8 {
        match self {
            CategoryForm::Name => 1,
            CategoryForm::Description { .. } => 2,
            CategoryForm::Kind { .. } => 3,
        }
    }

    pub fn prompt_key(&self, editing: bool) -> &'static str {
        match (self, editing) {
            (CategoryForm::Name, false) => "category-name-prompt",
            (CategoryForm::Name, true) => "category-name-edit-prompt",
            (CategoryForm::Description { .. }, false) => "category-description-prompt",
            (CategoryForm::Description { .. }, true) => "category-description-edit-prompt",
            (CategoryForm::Kind { .. }, false) => "category-kind-prompt",
            (CategoryForm::Kind { .. }, true) => "category-kind-edit-prompt",
        }
    }

    pub fn accept(&self, text: &str) -> Result<Advance<Self, CategoryFields>, InputError> {
        Ok(match self {
            CategoryForm::Name => Advance::Next(CategoryForm::Description {
                name: required_text(text),
            }),
            CategoryForm::Description { name } => Advance::Next(CategoryForm::Kind {
                name: name.clone(),
                description: optional_text(text),
            }),
            CategoryForm::Kind { name, description } => Advance::Done(CategoryFields {
                name: name.clone(),
                description: description.clone(),
                kind: required_text(text),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyMenuFields {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum WeeklyMenuForm {
    #[default]
    Name,
    Description {
        name: String,
    },
}

impl WeeklyMenuForm {
    pub fn step(&self) -> u8 {
        match self {
            WeeklyMenuForm::Name => 1,
            WeeklyMenuForm::Description { .. } => 2,
        }
    }

    pub fn prompt_key(&self) -> &'static str {
        match self {
            WeeklyMenuForm::Name => "menu-name-prompt",
            WeeklyMenuForm::Description { .. } => "menu-description-prompt",
        }
    }

    pub fn accept(&self, text: &str) -> Result<Advance<Self, WeeklyMenuFields>, InputError> {
        Ok(match self {
            WeeklyMenuForm::Name => Advance::Next(WeeklyMenuForm::Description {
                name: required_text(text),
            }),
            WeeklyMenuForm::Description { name } => Advance::Done(WeeklyMenuFields {
                name: name.clone(),
                description: optional_text(text),
            }),
        })
    }
}

/// Adding a day: the day is written right after step 1, then step 3 asks
/// whether to continue with a meal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DayForm {
    #[default]
    Number,
    AddMealPrompt {
        day_number: i32,
        day_name: String,
    },
}

impl DayForm {
    pub fn step(&self) -> u8 {
        match self {
            DayForm::Number => 1,
            DayForm::AddMealPrompt { .. } => 3,
        }
    }

    pub fn prompt_key(&self) -> &'static str {
        match self {
            DayForm::Number => "day-number-prompt",
            DayForm::AddMealPrompt { .. } => "day-ask-meal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealFields {
    pub meal_type: String,
    pub meal_time: String,
    pub nutrition_id: i64,
    pub notes: String,
}

/// Adding meals to the newest day of a menu. Step 5 loops back to step 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum MealForm {
    #[default]
    MealType,
    MealTime {
        meal_type: String,
    },
    Nutrition {
        meal_type: String,
        meal_time: String,
    },
    Notes {
        meal_type: String,
        meal_time: String,
        nutrition_id: i64,
    },
    AnotherMeal,
}

impl MealForm {
    pub fn step(&self) -> u8 {
        match self {
            MealForm::MealType => 1,
            MealForm::MealTime { .. } => 2,
            MealForm::Nutrition { .. } => 3,
            MealForm::Notes { .. } => 4,
            MealForm::AnotherMeal => 5,
        }
    }

    pub fn prompt_key(&self) -> &'static str {
        match self {
            MealForm::MealType => "meal-type-prompt",
            MealForm::MealTime { .. } => "meal-time-prompt",
            MealForm::Nutrition { .. } => "meal-nutrition-prompt",
            MealForm::Notes { .. } => "meal-notes-prompt",
            MealForm::AnotherMeal => "meal-ask-another",
        }
    }

    /// Steps 1 to 4. `AnotherMeal` is a branch and is handled by the engine.
    pub fn accept(&self, text: &str) -> Result<Advance<Self, MealFields>, InputError> {
        Ok(match self {
            MealForm::MealType => Advance::Next(MealForm::MealTime {
                meal_type: meal_type_from_input(text),
            }),
            MealForm::MealTime { meal_type } => Advance::Next(MealForm::Nutrition {
                meal_type: meal_type.clone(),
                meal_time: required_text(text),
            }),
            MealForm::Nutrition {
                meal_type,
                meal_time,
            } => {
                let nutrition_id = parse_int(text)?;
                if nutrition_id <= 0 {
                    return Err(InputError::NotPositive);
                }
                Advance::Next(MealForm::Notes {
                    meal_type: meal_type.clone(),
                    meal_time: meal_time.clone(),
                    nutrition_id,
                })
            }
            MealForm::Notes {
                meal_type,
                meal_time,
                nutrition_id,
            } => Advance::Done(MealFields {
                meal_type: meal_type.clone(),
                meal_time: meal_time.clone(),
                nutrition_id: *nutrition_id,
                notes: optional_text(text),
            }),
            MealForm::AnotherMeal => Advance::Next(MealForm::MealType),
        })
    }
}

// ==================== Flows ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    AddTraining,
    EditTraining,
    AddNutrition,
    EditNutrition,
    AddCategory,
    EditCategory,
    AddWeeklyMenu,
    AddDayToMenu,
    AddMealToDay,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowKind::AddTraining => "add_training",
            FlowKind::EditTraining => "edit_training",
            FlowKind::AddNutrition => "add_nutrition",
            FlowKind::EditNutrition => "edit_nutrition",
            FlowKind::AddCategory => "add_category",
            FlowKind::EditCategory => "edit_category",
            FlowKind::AddWeeklyMenu => "add_weekly_menu",
            FlowKind::AddDayToMenu => "add_day_to_menu",
            FlowKind::AddMealToDay => "add_meal_to_day",
        };
        f.write_str(name)
    }
}

/// An admin flow and where it currently stands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Flow {
    AddTraining {
        category_id: Option<i64>,
        form: TrainingForm,
    },
    EditTraining {
        training_id: i64,
        form: TrainingForm,
    },
    AddNutrition {
        form: NutritionForm,
    },
    EditNutrition {
        nutrition_id: i64,
        form: NutritionForm,
    },
    AddCategory {
        form: CategoryForm,
    },
    EditCategory {
        category_id: i64,
        form: CategoryForm,
    },
    AddWeeklyMenu {
        form: WeeklyMenuForm,
    },
    AddDayToMenu {
        menu_id: i64,
        form: DayForm,
    },
    AddMealToDay {
        menu_id: i64,
        form: MealForm,
    },
}

impl Flow {
    pub fn add_training(category_id: Option<i64>) -> Self {
        Flow::AddTraining {
            category_id,
            form: TrainingForm::Title,
        }
    }

    pub fn edit_training(training_id: i64) -> Self {
        Flow::EditTraining {
            training_id,
            form: TrainingForm::Title,
        }
    }

    pub fn add_nutrition() -> Self {
        Flow::AddNutrition {
            form: NutritionForm::Title,
        }
    }

    pub fn edit_nutrition(nutrition_id: i64) -> Self {
        Flow::EditNutrition {
            nutrition_id,
            form: NutritionForm::Title,
        }
    }

    pub fn add_category() -> Self {
        Flow::AddCategory {
            form: CategoryForm::Name,
        }
    }

    pub fn edit_category(category_id: i64) -> Self {
        Flow::EditCategory {
            category_id,
            form: CategoryForm::Name,
        }
    }

    pub fn add_weekly_menu() -> Self {
        Flow::AddWeeklyMenu {
            form: WeeklyMenuForm::Name,
        }
    }

    pub fn add_day_to_menu(menu_id: i64) -> Self {
        Flow::AddDayToMenu {
            menu_id,
            form: DayForm::Number,
        }
    }

    pub fn add_meal_to_day(menu_id: i64) -> Self {
        Flow::AddMealToDay {
            menu_id,
            form: MealForm::MealType,
        }
    }

    pub fn kind(&self) -> FlowKind {
        match self {
            Flow::AddTraining { .. } => FlowKind::AddTraining,
            Flow::EditTraining { .. } => FlowKind::EditTraining,
            Flow::AddNutrition { .. } => FlowKind::AddNutrition,
            Flow::EditNutrition { .. } => FlowKind::EditNutrition,
            Flow::AddCategory { .. } => FlowKind::AddCategory,
            Flow::EditCategory { .. } => FlowKind::EditCategory,
            Flow::AddWeeklyMenu { .. } => FlowKind::AddWeeklyMenu,
            Flow::AddDayToMenu { .. } => FlowKind::AddDayToMenu,
            Flow::AddMealToDay { .. } => FlowKind::AddMealToDay,
        }
    }

    /// 1-based step within the flow
    pub fn step(&self) -> u8 {
        match self {
            Flow::AddTraining { form, .. } | Flow::EditTraining { form, .. } => form.step(),
            Flow::AddNutrition { form } | Flow::EditNutrition { form, .. } => form.step(),
            Flow::AddCategory { form } | Flow::EditCategory { form, .. } => form.step(),
            Flow::AddWeeklyMenu { form } => form.step(),
            Flow::AddDayToMenu { form, .. } => form.step(),
            Flow::AddMealToDay { form, .. } => form.step(),
        }
    }

    /// Entity being edited or extended
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Flow::EditTraining { training_id, .. } => Some(*training_id),
            Flow::EditNutrition { nutrition_id, .. } => Some(*nutrition_id),
            Flow::EditCategory { category_id, .. } => Some(*category_id),
            Flow::AddDayToMenu { menu_id, .. } | Flow::AddMealToDay { menu_id, .. } => {
                Some(*menu_id)
            }
            Flow::AddTraining { .. }
            | Flow::AddNutrition { .. }
            | Flow::AddCategory { .. }
            | Flow::AddWeeklyMenu { .. } => None,
        }
    }

    /// Localization key of the prompt for the current step
    pub fn prompt_key(&self) -> &'static str {
        match self {
            Flow::AddTraining { form, .. } => form.prompt_key(false),
            Flow::EditTraining { form, .. } => form.prompt_key(true),
            Flow::AddNutrition { form } => form.prompt_key(false),
            Flow::EditNutrition { form, .. } => form.prompt_key(true),
            Flow::AddCategory { form } => form.prompt_key(false),
            Flow::EditCategory { form, .. } => form.prompt_key(true),
            Flow::AddWeeklyMenu { form } => form.prompt_key(),
            Flow::AddDayToMenu { form, .. } => form.prompt_key(),
            Flow::AddMealToDay { form, .. } => form.prompt_key(),
        }
    }

    /// The same flow back at step 1
    pub fn restarted(&self) -> Self {
        match self {
            Flow::AddTraining { category_id, .. } => Flow::add_training(*category_id),
            Flow::EditTraining { training_id, .. } => Flow::edit_training(*training_id),
            Flow::AddNutrition { .. } => Flow::add_nutrition(),
            Flow::EditNutrition { nutrition_id, .. } => Flow::edit_nutrition(*nutrition_id),
            Flow::AddCategory { .. } => Flow::add_category(),
            Flow::EditCategory { category_id, .. } => Flow::edit_category(*category_id),
            Flow::AddWeeklyMenu { .. } => Flow::add_weekly_menu(),
            Flow::AddDayToMenu { menu_id, .. } => Flow::add_day_to_menu(*menu_id),
            Flow::AddMealToDay { menu_id, .. } => Flow::add_meal_to_day(*menu_id),
        }
    }
}

/// Everything kept for one actor while a flow is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub flow: Flow,
    /// Telegram language code captured when the flow started
    pub language_code: Option<String>,
}

impl ConversationState {
    pub fn new(flow: Flow, language_code: Option<String>) -> Self {
        Self {
            flow,
            language_code,
        }
    }
}

/// Per-actor conversation states, shared by all handlers.
///
/// Backed by teloxide's `InMemStorage`, whose map sits behind a mutex, so
/// concurrent actors never observe each other's entries. Nothing survives a
/// restart.
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<InMemStorage<ConversationState>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            storage: InMemStorage::new(),
        }
    }

    pub async fn get(&self, actor_id: i64) -> Option<ConversationState> {
        match Arc::clone(&self.storage).get_dialogue(ChatId(actor_id)).await {
            Ok(state) => state,
            Err(e) => {
                warn!(user_id = actor_id, error = %e, "Failed to read conversation state");
                None
            }
        }
    }

    /// Overwrites whatever the actor had before
    pub async fn set(&self, actor_id: i64, state: ConversationState) {
        debug!(
            user_id = actor_id,
            flow = %state.flow.kind(),
            step = state.flow.step(),
            "Storing conversation state"
        );
        if let Err(e) = Arc::clone(&self.storage)
            .update_dialogue(ChatId(actor_id), state)
            .await
        {
            warn!(user_id = actor_id, error = %e, "Failed to store conversation state");
        }
    }

    /// No-op when the actor has no state
    pub async fn delete(&self, actor_id: i64) {
        if let Err(e) = Arc::clone(&self.storage)
            .remove_dialogue(ChatId(actor_id))
            .await
        {
            debug!(user_id = actor_id, error = %e, "No conversation state to remove");
        }
    }
}
