//! # Fitness Content Data Model
//!
//! Entities stored in Postgres and the payloads used to create or update them.
//!
//! Update payloads follow partial-update semantics: a blank string, a
//! non-positive count or an absent category leaves the stored value as is.
//! `apply_to` is the single place where that rule lives, so every store
//! implementation merges the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Content category, grouped by `kind` ("training", "nutrition" or "general")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Training {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    /// Duration in minutes
    pub duration: i32,
    pub category_id: Option<i64>,
    pub youtube_link: String,
    pub created_at: DateTime<Utc>,
}

/// A dish or product with its nutrition facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Nutrition {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Weekly menu; at most one is active at a time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WeeklyMenu {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub total_calories: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// One day (1 = Monday … 7 = Sunday) inside a weekly menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MenuDay {
    pub id: i64,
    pub menu_id: i64,
    pub day_number: i32,
    pub day_name: String,
    pub total_calories: i32,
}

/// A meal of a menu day, pointing at a nutrition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DayMeal {
    pub id: i64,
    pub day_id: i64,
    pub meal_type: String,
    pub meal_time: String,
    pub nutrition_id: i64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: i64,
    pub training_id: i64,
    pub notes: String,
    pub completed_at: DateTime<Utc>,
}

/// A meal together with the nutrition it references, if that still exists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealEntry {
    pub meal: DayMeal,
    pub nutrition: Option<Nutrition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullMenuDay {
    pub day: MenuDay,
    pub meals: Vec<MealEntry>,
}

/// Weekly menu with its days (in creation order) and their meals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullWeeklyMenu {
    pub menu: WeeklyMenu,
    pub days: Vec<FullMenuDay>,
}

impl FullWeeklyMenu {
    /// The most recently created day of the menu
    pub fn last_day(&self) -> Option<&MenuDay> {
        self.days.last().map(|d| &d.day)
    }

    /// Days sorted by weekday number, for display
    pub fn days_by_weekday(&self) -> Vec<&FullMenuDay> {
        let mut days: Vec<&FullMenuDay> = self.days.iter().collect();
        days.sort_by_key(|d| d.day.day_number);
        days
    }
}

// ==================== Create payloads ====================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewTraining {
    pub title: String,
    pub duration: i32,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub youtube_link: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewNutrition {
    pub title: String,
    pub description: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewWeeklyMenu {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMenuDay {
    pub menu_id: i64,
    pub day_number: i32,
    pub day_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDayMeal {
    pub day_id: i64,
    pub meal_type: String,
    pub meal_time: String,
    pub nutrition_id: i64,
    pub notes: String,
}

// ==================== Update payloads ====================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingUpdate {
    pub title: String,
    pub duration: i32,
    pub difficulty: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub youtube_link: String,
}

impl TrainingUpdate {
    pub fn apply_to(&self, training: &mut Training) {
        if !self.title.is_empty() {
            training.title = self.title.clone();
        }
        if !self.description.is_empty() {
            training.description = self.description.clone();
        }
        if !self.difficulty.is_empty() {
            training.difficulty = self.difficulty.clone();
        }
        if !self.youtube_link.is_empty() {
            training.youtube_link = self.youtube_link.clone();
        }
        if self.duration > 0 {
            training.duration = self.duration;
        }
        if self.category_id.is_some() {
            training.category_id = self.category_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NutritionUpdate {
    pub title: String,
    pub description: String,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub category_id: Option<i64>,
}

impl NutritionUpdate {
    pub fn apply_to(&self, nutrition: &mut Nutrition) {
        if !self.title.is_empty() {
            nutrition.title = self.title.clone();
        }
        if !self.description.is_empty() {
            nutrition.description = self.description.clone();
        }
        if self.calories > 0 {
            nutrition.calories = self.calories;
        }
        if self.protein >= 0.0 {
            nutrition.protein = self.protein;
        }
        if self.carbs >= 0.0 {
            nutrition.carbs = self.carbs;
        }
        if self.fats >= 0.0 {
            nutrition.fats = self.fats;
        }
        if self.category_id.is_some() {
            nutrition.category_id = self.category_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: String,
    pub kind: String,
}

impl CategoryUpdate {
    pub fn apply_to(&self, category: &mut Category) {
        if !self.name.is_empty() {
            category.name = self.name.clone();
        }
        if !self.description.is_empty() {
            category.description = self.description.clone();
        }
        if !self.kind.is_empty() {
            category.kind = self.kind.clone();
        }
    }
}
