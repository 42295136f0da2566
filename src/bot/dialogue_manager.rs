//! Flow engine: drives admin conversations one message at a time.
//!
//! `handle_input` performs exactly one transition per message. Each step
//! handler returns a [`Transition`] (an [`Outcome`] plus the replies it
//! produced) and [`FlowEngine::apply`] is the only place that writes the
//! conversation store.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::dialogue::{
    is_affirmative, is_cancel_keyword, is_food_list_request, optional_text, parse_day_number,
    weekday_name, Advance, CategoryFields, ConversationState, ConversationStore, DayForm, Flow,
    InputError, MealFields, MealForm, NutritionFields, TrainingFields, WeeklyMenuFields,
    CANCEL_KEYWORDS,
};
use crate::errors::{StoreError, StoreResult};
use crate::localization::{t_args_lang, t_lang};
use crate::models::{
    CategoryUpdate, NewCategory, NewDayMeal, NewNutrition, NewTraining, NewWeeklyMenu,
    NutritionUpdate, TrainingUpdate,
};
use crate::services;
use crate::store::FitnessStore;

use super::screens::Screen;

/// Callback data prefix of choices that feed back into the active flow
pub const FLOW_TOKEN_PREFIX: &str = "flow:";

/// A button offered with a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

impl Choice {
    /// A choice that answers the current step with `input`
    pub fn answer(label: impl Into<String>, input: &str) -> Self {
        Self {
            label: label.into(),
            token: format!("{FLOW_TOKEN_PREFIX}{input}"),
        }
    }
}

/// Something the transport should show the actor
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Choices { text: String, choices: Vec<Choice> },
    Screen(Screen),
}

impl Reply {
    /// Text of a `Text` or `Choices` reply
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) | Reply::Choices { text, .. } => Some(text),
            Reply::Screen(_) => None,
        }
    }
}

/// What a step decided about the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Store the flow and prompt for its next step
    Continue(Flow),
    /// Replace the flow with another one and prompt for its first step
    ChainTo(Flow),
    /// Keep the stored state and prompt for the same step again
    Retry,
    /// Flow finished, successfully or not
    Complete,
    /// Actor aborted the flow
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub outcome: Outcome,
    pub replies: Vec<Reply>,
}

impl Transition {
    fn new(outcome: Outcome, replies: Vec<Reply>) -> Self {
        Self { outcome, replies }
    }

    fn next(flow: Flow) -> Self {
        Self::new(Outcome::Continue(flow), Vec::new())
    }

    fn complete(replies: Vec<Reply>) -> Self {
        Self::new(Outcome::Complete, replies)
    }
}

/// Flow engine over a store and the per-actor conversation states
#[derive(Clone)]
pub struct FlowEngine {
    store: Arc<dyn FitnessStore>,
    conversations: ConversationStore,
}

impl FlowEngine {
    pub fn new(store: Arc<dyn FitnessStore>, conversations: ConversationStore) -> Self {
        Self {
            store,
            conversations,
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub async fn has_active_flow(&self, actor_id: i64) -> bool {
        self.conversations.get(actor_id).await.is_some()
    }

    /// Start `flow` for the actor, replacing any flow in progress
    pub async fn start(&self, actor_id: i64, flow: Flow, language_code: Option<&str>) -> Vec<Reply> {
        info!(user_id = actor_id, flow = %flow.kind(), "Starting admin flow");
        let prompt = with_cancel_choice(prompt_for(&flow, language_code), language_code);
        self.conversations
            .set(
                actor_id,
                ConversationState::new(flow, language_code.map(str::to_string)),
            )
            .await;
        vec![prompt]
    }

    /// Drop the actor's flow from outside the conversation (cancel button)
    pub async fn cancel(&self, actor_id: i64) -> Vec<Reply> {
        match self.conversations.get(actor_id).await {
            Some(state) => {
                let language = state.language_code.clone();
                self.apply(
                    actor_id,
                    state,
                    Transition::new(Outcome::Cancelled, Vec::new()),
                    language.as_deref(),
                )
                .await
            }
            None => Vec::new(),
        }
    }

    /// Feed one message to the actor's active flow. Returns nothing when the
    /// actor has no flow.
    pub async fn handle_input(&self, actor_id: i64, text: &str) -> Vec<Reply> {
        let Some(state) = self.conversations.get(actor_id).await else {
            return Vec::new();
        };
        let language = state.language_code.clone();
        let language = language.as_deref();

        debug!(
            user_id = actor_id,
            flow = %state.flow.kind(),
            step = state.flow.step(),
            "Handling flow input"
        );

        let transition = if is_cancel_keyword(text) {
            Transition::new(Outcome::Cancelled, Vec::new())
        } else {
            self.step(&state.flow, text, language).await
        };

        self.apply(actor_id, state, transition, language).await
    }

    async fn apply(
        &self,
        actor_id: i64,
        state: ConversationState,
        transition: Transition,
        language: Option<&str>,
    ) -> Vec<Reply> {
        let Transition {
            outcome,
            mut replies,
        } = transition;

        match outcome {
            Outcome::Continue(flow) => {
                replies.push(prompt_for(&flow, language));
                self.conversations
                    .set(actor_id, ConversationState { flow, ..state })
                    .await;
            }
            Outcome::ChainTo(flow) => {
                info!(
                    user_id = actor_id,
                    from = %state.flow.kind(),
                    to = %flow.kind(),
                    "Chaining admin flow"
                );
                replies.push(prompt_for(&flow, language));
                self.conversations
                    .set(actor_id, ConversationState { flow, ..state })
                    .await;
            }
            Outcome::Retry => {
                replies.push(prompt_for(&state.flow, language));
            }
            Outcome::Complete => {
                info!(user_id = actor_id, flow = %state.flow.kind(), "Admin flow finished");
                self.conversations.delete(actor_id).await;
            }
            Outcome::Cancelled => {
                info!(
                    user_id = actor_id,
                    flow = %state.flow.kind(),
                    step = state.flow.step(),
                    "Admin flow cancelled"
                );
                self.conversations.delete(actor_id).await;
                replies.push(Reply::Text(t_lang("flow-cancelled", language)));
                replies.push(Reply::Screen(Screen::AdminPanel));
            }
        }

        replies
    }

    async fn step(&self, flow: &Flow, text: &str, language: Option<&str>) -> Transition {
        match flow {
            Flow::AddTraining { category_id, form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::AddTraining {
                    category_id: *category_id,
                    form,
                }),
                Ok(Advance::Done(fields)) => {
                    let result = services::create_training(
                        self.store.as_ref(),
                        new_training(fields, *category_id),
                    )
                    .await;
                    finish(flow, result, language, |training| {
                        vec![
                            Reply::Text(t_args_lang(
                                "training-created",
                                &[("title", training.title.as_str())],
                                language,
                            )),
                            Reply::Screen(Screen::TrainingsAdmin),
                        ]
                    })
                }
            },
            Flow::EditTraining { training_id, form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::EditTraining {
                    training_id: *training_id,
                    form,
                }),
                Ok(Advance::Done(fields)) => {
                    let result = services::update_training(
                        self.store.as_ref(),
                        *training_id,
                        training_update(fields),
                    )
                    .await;
                    finish(flow, result, language, |_| {
                        vec![
                            Reply::Text(t_lang("training-updated", language)),
                            Reply::Screen(Screen::TrainingsAdmin),
                        ]
                    })
                }
            },
            Flow::AddNutrition { form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::AddNutrition { form }),
                Ok(Advance::Done(fields)) => {
                    let result =
                        services::create_nutrition(self.store.as_ref(), new_nutrition(fields))
                            .await;
                    finish(flow, result, language, |nutrition| {
                        vec![
                            Reply::Text(t_args_lang(
                                "nutrition-created",
                                &[("title", nutrition.title.as_str())],
                                language,
                            )),
                            Reply::Screen(Screen::NutritionAdmin),
                        ]
                    })
                }
            },
            Flow::EditNutrition { nutrition_id, form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::EditNutrition {
                    nutrition_id: *nutrition_id,
                    form,
                }),
                Ok(Advance::Done(fields)) => {
                    let result = services::update_nutrition(
                        self.store.as_ref(),
                        *nutrition_id,
                        nutrition_update(fields),
                    )
                    .await;
                    finish(flow, result, language, |_| {
                        vec![
                            Reply::Text(t_lang("nutrition-updated", language)),
                            Reply::Screen(Screen::NutritionAdmin),
                        ]
                    })
                }
            },
            Flow::AddCategory { form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::AddCategory { form }),
                Ok(Advance::Done(fields)) => {
                    let result =
                        services::create_category(self.store.as_ref(), new_category(fields)).await;
                    finish(flow, result, language, |category| {
                        vec![
                            Reply::Text(t_args_lang(
                                "category-created",
                                &[("name", category.name.as_str())],
                                language,
                            )),
                            Reply::Screen(Screen::CategoriesAdmin),
                        ]
                    })
                }
            },
            Flow::EditCategory { category_id, form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::EditCategory {
                    category_id: *category_id,
                    form,
                }),
                Ok(Advance::Done(fields)) => {
                    let result = services::update_category(
                        self.store.as_ref(),
                        *category_id,
                        category_update(fields),
                    )
                    .await;
                    finish(flow, result, language, |_| {
                        vec![
                            Reply::Text(t_lang("category-updated", language)),
                            Reply::Screen(Screen::CategoriesAdmin),
                        ]
                    })
                }
            },
            Flow::AddWeeklyMenu { form } => match form.accept(text) {
                Err(e) => retry(e, language),
                Ok(Advance::Next(form)) => Transition::next(Flow::AddWeeklyMenu { form }),
                Ok(Advance::Done(WeeklyMenuFields { name, description })) => {
                    let result = services::create_weekly_menu(
                        self.store.as_ref(),
                        NewWeeklyMenu { name, description },
                    )
                    .await;
                    finish(flow, result, language, |menu| {
                        vec![
                            Reply::Text(t_args_lang(
                                "menu-created",
                                &[("name", menu.name.as_str())],
                                language,
                            )),
                            Reply::Screen(Screen::WeeklyMenusAdmin),
                        ]
                    })
                }
            },
            Flow::AddDayToMenu { menu_id, form } => {
                self.add_day_step(*menu_id, form, text, language).await
            }
            Flow::AddMealToDay { menu_id, form } => {
                self.add_meal_step(*menu_id, form, text, language).await
            }
        }
    }

    async fn add_day_step(
        &self,
        menu_id: i64,
        form: &DayForm,
        text: &str,
        language: Option<&str>,
    ) -> Transition {
        match form {
            DayForm::Number => {
                let day_number = match parse_day_number(text) {
                    Ok(n) => n,
                    Err(e) => return retry(e, language),
                };
                let Some(day_name) = weekday_name(day_number) else {
                    return retry(InputError::DayOutOfRange, language);
                };

                // The day is written now, before the meal question
                match services::add_day_to_menu(self.store.as_ref(), menu_id, day_number, day_name)
                    .await
                {
                    Ok(day) => {
                        info!(menu_id, day_id = day.id, day_number, "Day added to menu");
                        Transition::new(
                            Outcome::Continue(Flow::AddDayToMenu {
                                menu_id,
                                form: DayForm::AddMealPrompt {
                                    day_number,
                                    day_name: day_name.to_string(),
                                },
                            }),
                            vec![Reply::Text(t_args_lang(
                                "day-added",
                                &[("day", day_name)],
                                language,
                            ))],
                        )
                    }
                    Err(e) => {
                        error!(menu_id, day_number, error = %e, "Failed to add day to menu");
                        Transition::complete(vec![Reply::Text(t_args_lang(
                            "error-add-day",
                            &[("error", describe_error(&e, language).as_str())],
                            language,
                        ))])
                    }
                }
            }
            DayForm::AddMealPrompt { .. } => {
                if is_affirmative(text) {
                    Transition::new(Outcome::ChainTo(Flow::add_meal_to_day(menu_id)), Vec::new())
                } else {
                    Transition::complete(vec![Reply::Screen(Screen::MenuDetails(menu_id))])
                }
            }
        }
    }

    async fn add_meal_step(
        &self,
        menu_id: i64,
        form: &MealForm,
        text: &str,
        language: Option<&str>,
    ) -> Transition {
        if let MealForm::Nutrition { .. } = form {
            if is_food_list_request(text) {
                return Transition::new(Outcome::Retry, vec![Reply::Screen(Screen::FoodList)]);
            }
        }

        if let MealForm::AnotherMeal = form {
            return if is_affirmative(text) {
                Transition::next(Flow::add_meal_to_day(menu_id))
            } else {
                Transition::complete(vec![Reply::Screen(Screen::MenuDetails(menu_id))])
            };
        }

        match form.accept(text) {
            Err(e) => retry(e, language),
            Ok(Advance::Next(form)) => Transition::next(Flow::AddMealToDay { menu_id, form }),
            Ok(Advance::Done(fields)) => self.add_meal(menu_id, fields, language).await,
        }
    }

    /// Adds the meal to the newest day of the menu, then asks about another one
    async fn add_meal(&self, menu_id: i64, fields: MealFields, language: Option<&str>) -> Transition {
        let full = match services::get_full_weekly_menu(self.store.as_ref(), menu_id).await {
            Ok(full) => full,
            Err(e) => {
                error!(menu_id, error = %e, "Failed to load menu for new meal");
                return Transition::complete(vec![Reply::Text(t_args_lang(
                    "error-load-menu",
                    &[("error", describe_error(&e, language).as_str())],
                    language,
                ))]);
            }
        };

        let Some(day) = full.last_day() else {
            warn!(menu_id, "Menu has no days to add a meal to");
            return Transition::complete(vec![Reply::Text(t_lang("error-menu-no-days", language))]);
        };

        let new_meal = NewDayMeal {
            day_id: day.id,
            meal_type: fields.meal_type,
            meal_time: fields.meal_time,
            nutrition_id: fields.nutrition_id,
            notes: fields.notes,
        };

        let reply = match services::add_meal_to_day(self.store.as_ref(), new_meal).await {
            Ok(meal) => {
                info!(menu_id, day_id = day.id, meal_id = meal.id, "Meal added to menu day");
                Reply::Text(t_lang("meal-added", language))
            }
            Err(e) => {
                error!(menu_id, day_id = day.id, error = %e, "Failed to add meal");
                Reply::Text(t_args_lang(
                    "error-add-meal",
                    &[("error", describe_error(&e, language).as_str())],
                    language,
                ))
            }
        };

        Transition::new(
            Outcome::Continue(Flow::AddMealToDay {
                menu_id,
                form: MealForm::AnotherMeal,
            }),
            vec![reply],
        )
    }
}

fn retry(error: InputError, language: Option<&str>) -> Transition {
    Transition::new(
        Outcome::Retry,
        vec![Reply::Text(t_lang(error.message_key(), language))],
    )
}

/// Outcome of a terminal call. Validation failures restart the flow at
/// step 1; any other failure ends it.
fn finish<T>(
    flow: &Flow,
    result: StoreResult<T>,
    language: Option<&str>,
    on_success: impl FnOnce(T) -> Vec<Reply>,
) -> Transition {
    match result {
        Ok(value) => Transition::complete(on_success(value)),
        Err(StoreError::Validation(e)) => {
            warn!(flow = %flow.kind(), error = %e, "Flow input rejected by validation");
            Transition::new(
                Outcome::Continue(flow.restarted()),
                vec![
                    Reply::Text(t_lang(e.message_key(), language)),
                    Reply::Text(t_lang("flow-restart", language)),
                ],
            )
        }
        Err(e) => {
            error!(flow = %flow.kind(), error = %e, "Flow terminal call failed");
            Transition::complete(vec![Reply::Text(t_args_lang(
                "error-save",
                &[("error", describe_error(&e, language).as_str())],
                language,
            ))])
        }
    }
}

/// User-facing description of a store error
pub fn describe_error(error: &StoreError, language: Option<&str>) -> String {
    match error {
        StoreError::Validation(e) => t_lang(e.message_key(), language),
        StoreError::NotFound { entity, id } => t_args_lang(
            "error-not-found",
            &[("entity", *entity), ("id", id.to_string().as_str())],
            language,
        ),
        StoreError::CalorieOverflow { .. } | StoreError::Database(_) => {
            t_lang("error-database", language)
        }
    }
}

/// Prompt for the flow's current step
pub fn prompt_for(flow: &Flow, language: Option<&str>) -> Reply {
    let text = t_lang(flow.prompt_key(), language);

    match flow {
        Flow::AddDayToMenu {
            form: DayForm::AddMealPrompt { .. },
            ..
        }
        | Flow::AddMealToDay {
            form: MealForm::AnotherMeal,
            ..
        } => Reply::Choices {
            text,
            choices: yes_no_choices(language),
        },
        Flow::AddMealToDay {
            form: MealForm::MealType,
            ..
        } => Reply::Choices {
            text,
            choices: vec![
                Choice::answer(t_lang("meal-breakfast", language), "1"),
                Choice::answer(t_lang("meal-lunch", language), "2"),
                Choice::answer(t_lang("meal-dinner", language), "3"),
                Choice::answer(t_lang("meal-snack", language), "4"),
            ],
        },
        _ => Reply::Text(text),
    }
}

/// First prompts carry a cancel button that answers with a cancel keyword
fn with_cancel_choice(prompt: Reply, language: Option<&str>) -> Reply {
    let cancel = Choice::answer(t_lang("choice-cancel", language), CANCEL_KEYWORDS[0]);
    match prompt {
        Reply::Text(text) => Reply::Choices {
            text,
            choices: vec![cancel],
        },
        Reply::Choices { text, mut choices } => {
            choices.push(cancel);
            Reply::Choices { text, choices }
        }
        screen @ Reply::Screen(_) => screen,
    }
}

fn yes_no_choices(language: Option<&str>) -> Vec<Choice> {
    vec![
        Choice::answer(t_lang("choice-yes", language), "да"),
        Choice::answer(t_lang("choice-no", language), "нет"),
    ]
}

fn new_training(fields: TrainingFields, category_id: Option<i64>) -> NewTraining {
    NewTraining {
        title: fields.title,
        duration: fields.duration,
        youtube_link: fields.youtube_link,
        description: fields.description,
        category_id,
        ..Default::default()
    }
}

/// Edit flows use "-" to keep the stored title
fn training_update(fields: TrainingFields) -> TrainingUpdate {
    TrainingUpdate {
        title: optional_text(&fields.title),
        duration: fields.duration,
        youtube_link: fields.youtube_link,
        description: fields.description,
        ..Default::default()
    }
}

fn new_nutrition(fields: NutritionFields) -> NewNutrition {
    NewNutrition {
        title: fields.title,
        description: fields.description,
        calories: fields.calories,
        protein: fields.protein,
        carbs: fields.carbs,
        fats: fields.fats,
        category_id: fields.category_id,
    }
}

fn nutrition_update(fields: NutritionFields) -> NutritionUpdate {
    NutritionUpdate {
        title: optional_text(&fields.title),
        description: fields.description,
        calories: fields.calories,
        protein: fields.protein,
        carbs: fields.carbs,
        fats: fields.fats,
        category_id: fields.category_id,
    }
}

fn new_category(fields: CategoryFields) -> NewCategory {
    NewCategory {
        name: fields.name,
        description: fields.description,
        kind: fields.kind,
    }
}

fn category_update(fields: CategoryFields) -> CategoryUpdate {
    CategoryUpdate {
        name: optional_text(&fields.name),
        description: fields.description,
        kind: optional_text(&fields.kind),
    }
}
