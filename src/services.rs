//! # Fitness Services
//!
//! Entity operations on top of a [`FitnessStore`]: validation before writes,
//! partial updates and the calorie aggregates of weekly menus.
//!
//! Calorie totals are derived data. After a meal is added or removed the
//! owning day is recomputed from its meals, then the owning menu from its
//! days. Both recomputes are best effort: a failure is logged and the meal
//! mutation still counts as done.

use tracing::{info, warn};

use crate::errors::{StoreError, StoreResult, ValidationError};
use crate::models::{
    Category, CategoryUpdate, DayMeal, FullMenuDay, FullWeeklyMenu, MealEntry, MenuDay,
    NewCategory, NewDayMeal, NewMenuDay, NewNutrition, NewTraining, NewWeeklyMenu, Nutrition,
    NutritionUpdate, Training, TrainingUpdate, WeeklyMenu,
};
use crate::store::FitnessStore;

fn ensure_id(id: i64) -> StoreResult<()> {
    if id <= 0 {
        return Err(ValidationError::InvalidId.into());
    }
    Ok(())
}

fn validate_training(title: &str, duration: i32) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTrainingTitle);
    }
    if duration <= 0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    Ok(())
}

// ==================== Trainings ====================

pub async fn create_training(store: &dyn FitnessStore, new: NewTraining) -> StoreResult<Training> {
    validate_training(&new.title, new.duration)?;
    store.create_training(new).await
}

/// Merge `update` into the stored training. The merged row must satisfy the
/// same rules as a new training.
pub async fn update_training(
    store: &dyn FitnessStore,
    id: i64,
    update: TrainingUpdate,
) -> StoreResult<Training> {
    ensure_id(id)?;
    let mut training = store
        .get_training(id)
        .await?
        .ok_or_else(|| StoreError::not_found("training", id))?;

    update.apply_to(&mut training);
    validate_training(&training.title, training.duration)?;

    if !store.update_training(&training).await? {
        return Err(StoreError::not_found("training", id));
    }
    info!(training_id = id, "Training updated");
    Ok(training)
}

// ==================== Nutrition ====================

pub async fn create_nutrition(
    store: &dyn FitnessStore,
    new: NewNutrition,
) -> StoreResult<Nutrition> {
    store.create_nutrition(new).await
}

pub async fn update_nutrition(
    store: &dyn FitnessStore,
    id: i64,
    update: NutritionUpdate,
) -> StoreResult<Nutrition> {
    ensure_id(id)?;
    let mut nutrition = store
        .get_nutrition(id)
        .await?
        .ok_or_else(|| StoreError::not_found("nutrition", id))?;

    update.apply_to(&mut nutrition);

    if !store.update_nutrition(&nutrition).await? {
        return Err(StoreError::not_found("nutrition", id));
    }
    info!(nutrition_id = id, "Nutrition updated");
    Ok(nutrition)
}

// ==================== Categories ====================

pub async fn create_category(store: &dyn FitnessStore, new: NewCategory) -> StoreResult<Category> {
    store.create_category(new).await
}

pub async fn update_category(
    store: &dyn FitnessStore,
    id: i64,
    update: CategoryUpdate,
) -> StoreResult<Category> {
    ensure_id(id)?;
    let mut category = store
        .get_category(id)
        .await?
        .ok_or_else(|| StoreError::not_found("category", id))?;

    update.apply_to(&mut category);

    if !store.update_category(&category).await? {
        return Err(StoreError::not_found("category", id));
    }
    info!(category_id = id, "Category updated");
    Ok(category)
}

// ==================== Weekly menus ====================

pub async fn create_weekly_menu(
    store: &dyn FitnessStore,
    new: NewWeeklyMenu,
) -> StoreResult<WeeklyMenu> {
    if new.name.trim().is_empty() {
        return Err(ValidationError::EmptyMenuName.into());
    }
    store.create_weekly_menu(new).await
}

pub async fn add_day_to_menu(
    store: &dyn FitnessStore,
    menu_id: i64,
    day_number: i32,
    day_name: &str,
) -> StoreResult<MenuDay> {
    if !(1..=7).contains(&day_number) {
        return Err(ValidationError::DayNumberOutOfRange(day_number).into());
    }
    ensure_id(menu_id)?;
    if store.get_weekly_menu(menu_id).await?.is_none() {
        return Err(StoreError::not_found("weekly menu", menu_id));
    }

    store
        .add_day(NewMenuDay {
            menu_id,
            day_number,
            day_name: day_name.to_string(),
        })
        .await
}

/// Add a meal to a day, then refresh the day and menu totals
pub async fn add_meal_to_day(store: &dyn FitnessStore, new: NewDayMeal) -> StoreResult<DayMeal> {
    if store.get_nutrition(new.nutrition_id).await?.is_none() {
        return Err(StoreError::not_found("nutrition", new.nutrition_id));
    }
    let day = store
        .get_day(new.day_id)
        .await?
        .ok_or_else(|| StoreError::not_found("menu day", new.day_id))?;

    let meal = store.add_meal(new).await?;
    info!(meal_id = meal.id, day_id = day.id, "Meal added");

    refresh_totals(store, &day).await;
    Ok(meal)
}

/// Remove a meal, then refresh the day and menu totals
pub async fn delete_meal_from_day(store: &dyn FitnessStore, meal_id: i64) -> StoreResult<()> {
    let meal = store
        .get_meal(meal_id)
        .await?
        .ok_or_else(|| StoreError::not_found("meal", meal_id))?;

    if !store.delete_meal(meal_id).await? {
        return Err(StoreError::not_found("meal", meal_id));
    }
    info!(meal_id, day_id = meal.day_id, "Meal deleted");

    match store.get_day(meal.day_id).await {
        Ok(Some(day)) => refresh_totals(store, &day).await,
        Ok(None) => warn!(day_id = meal.day_id, "Day of deleted meal is gone, totals not refreshed"),
        Err(e) => warn!(day_id = meal.day_id, error = %e, "Failed to load day of deleted meal"),
    }
    Ok(())
}

async fn refresh_totals(store: &dyn FitnessStore, day: &MenuDay) {
    if let Err(e) = recompute_day_calories(store, day.id).await {
        warn!(day_id = day.id, error = %e, "Failed to update day calories");
    }
    if let Err(e) = recompute_menu_calories(store, day.menu_id).await {
        warn!(menu_id = day.menu_id, error = %e, "Failed to update menu calories");
    }
}

/// Sum of the calories of the day's meals. A meal whose nutrition record is
/// gone contributes 0.
pub async fn recompute_day_calories(store: &dyn FitnessStore, day_id: i64) -> StoreResult<i32> {
    let meals = store.meals_for_day(day_id).await?;

    let mut total: i32 = 0;
    for meal in &meals {
        if let Some(nutrition) = store.get_nutrition(meal.nutrition_id).await? {
            total = total
                .checked_add(nutrition.calories)
                .ok_or(StoreError::CalorieOverflow {
                    entity: "menu day",
                    id: day_id,
                })?;
        }
    }

    store.set_day_calories(day_id, total).await?;
    Ok(total)
}

/// Sum of the menu's day totals
pub async fn recompute_menu_calories(store: &dyn FitnessStore, menu_id: i64) -> StoreResult<i32> {
    let total = store
        .days_for_menu(menu_id)
        .await?
        .iter()
        .try_fold(0i32, |acc, d| acc.checked_add(d.total_calories))
        .ok_or(StoreError::CalorieOverflow {
            entity: "weekly menu",
            id: menu_id,
        })?;

    store.set_menu_calories(menu_id, total).await?;
    Ok(total)
}

/// Menu with its days in creation order and each meal's nutrition
pub async fn get_full_weekly_menu(
    store: &dyn FitnessStore,
    menu_id: i64,
) -> StoreResult<FullWeeklyMenu> {
    let menu = store
        .get_weekly_menu(menu_id)
        .await?
        .ok_or_else(|| StoreError::not_found("weekly menu", menu_id))?;

    let mut days = Vec::new();
    for day in store.days_for_menu(menu_id).await? {
        let mut meals = Vec::new();
        for meal in store.meals_for_day(day.id).await? {
            let nutrition = store.get_nutrition(meal.nutrition_id).await?;
            meals.push(MealEntry { meal, nutrition });
        }
        days.push(FullMenuDay { day, meals });
    }

    Ok(FullWeeklyMenu { menu, days })
}

/// The currently active menu, if any
pub async fn get_active_weekly_menu(
    store: &dyn FitnessStore,
) -> StoreResult<Option<FullWeeklyMenu>> {
    let active = store
        .list_weekly_menus()
        .await?
        .into_iter()
        .find(|m| m.active);

    match active {
        Some(menu) => Ok(Some(get_full_weekly_menu(store, menu.id).await?)),
        None => Ok(None),
    }
}

pub async fn activate_weekly_menu(store: &dyn FitnessStore, menu_id: i64) -> StoreResult<()> {
    if !store.activate_weekly_menu(menu_id).await? {
        return Err(StoreError::not_found("weekly menu", menu_id));
    }
    info!(menu_id, "Weekly menu activated");
    Ok(())
}
