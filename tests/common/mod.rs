#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use fitness_bot::bot::App;
use fitness_bot::config::AppConfig;
use fitness_bot::errors::{StoreError, StoreResult};
use fitness_bot::models::{
    Category, DayMeal, MenuDay, NewCategory, NewDayMeal, NewMenuDay, NewNutrition, NewTraining,
    NewWeeklyMenu, Nutrition, Training, User, UserProgress, WeeklyMenu,
};
use fitness_bot::store::FitnessStore;

pub const ADMIN_ID: i64 = 1001;
pub const USER_ID: i64 = 2002;

#[derive(Default)]
struct Tables {
    next_id: i64,
    trainings: BTreeMap<i64, Training>,
    nutrition: BTreeMap<i64, Nutrition>,
    categories: BTreeMap<i64, Category>,
    menus: BTreeMap<i64, WeeklyMenu>,
    days: BTreeMap<i64, MenuDay>,
    meals: BTreeMap<i64, DayMeal>,
    users: BTreeMap<i64, User>,
    progress: BTreeMap<i64, UserProgress>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `FitnessStore` that records every mutating call and can be told
/// to fail named operations.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call of `operation` return a database error
    pub fn fail_on(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    /// Names of the mutating calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == operation).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check(&self, operation: &str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(StoreError::Database(format!("{operation} failed")));
        }
        Ok(())
    }

    fn record(&self, operation: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        self.check(operation)
    }

    pub fn trainings(&self) -> Vec<Training> {
        self.tables.lock().unwrap().trainings.values().cloned().collect()
    }

    pub fn days(&self) -> Vec<MenuDay> {
        self.tables.lock().unwrap().days.values().cloned().collect()
    }

    pub fn meals(&self) -> Vec<DayMeal> {
        self.tables.lock().unwrap().meals.values().cloned().collect()
    }

    pub fn menu(&self, id: i64) -> Option<WeeklyMenu> {
        self.tables.lock().unwrap().menus.get(&id).cloned()
    }

    pub fn day(&self, id: i64) -> Option<MenuDay> {
        self.tables.lock().unwrap().days.get(&id).cloned()
    }
}

#[async_trait]
impl FitnessStore for MemoryStore {
    async fn create_training(&self, new: NewTraining) -> StoreResult<Training> {
        self.record("create_training")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let training = Training {
            id,
            title: new.title,
            description: new.description,
            difficulty: new.difficulty,
            duration: new.duration,
            category_id: new.category_id,
            youtube_link: new.youtube_link,
            created_at: Utc::now(),
        };
        tables.trainings.insert(id, training.clone());
        Ok(training)
    }

    async fn get_training(&self, id: i64) -> StoreResult<Option<Training>> {
        self.check("get_training")?;
        Ok(self.tables.lock().unwrap().trainings.get(&id).cloned())
    }

    async fn list_trainings(&self) -> StoreResult<Vec<Training>> {
        self.check("list_trainings")?;
        Ok(self.trainings())
    }

    async fn update_training(&self, training: &Training) -> StoreResult<bool> {
        self.record("update_training")?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .trainings
            .insert(training.id, training.clone())
            .is_some())
    }

    async fn delete_training(&self, id: i64) -> StoreResult<bool> {
        self.record("delete_training")?;
        Ok(self.tables.lock().unwrap().trainings.remove(&id).is_some())
    }

    async fn create_nutrition(&self, new: NewNutrition) -> StoreResult<Nutrition> {
        self.record("create_nutrition")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let nutrition = Nutrition {
            id,
            title: new.title,
            description: new.description,
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fats: new.fats,
            category_id: new.category_id,
            created_at: Utc::now(),
        };
        tables.nutrition.insert(id, nutrition.clone());
        Ok(nutrition)
    }

    async fn get_nutrition(&self, id: i64) -> StoreResult<Option<Nutrition>> {
        self.check("get_nutrition")?;
        Ok(self.tables.lock().unwrap().nutrition.get(&id).cloned())
    }

    async fn list_nutrition(&self) -> StoreResult<Vec<Nutrition>> {
        self.check("list_nutrition")?;
        Ok(self.tables.lock().unwrap().nutrition.values().cloned().collect())
    }

    async fn update_nutrition(&self, nutrition: &Nutrition) -> StoreResult<bool> {
        self.record("update_nutrition")?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .nutrition
            .insert(nutrition.id, nutrition.clone())
            .is_some())
    }

    async fn delete_nutrition(&self, id: i64) -> StoreResult<bool> {
        self.record("delete_nutrition")?;
        Ok(self.tables.lock().unwrap().nutrition.remove(&id).is_some())
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        self.record("create_category")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let category = Category {
            id,
            name: new.name,
            description: new.description,
            kind: new.kind,
            created_at: Utc::now(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        self.check("get_category")?;
        Ok(self.tables.lock().unwrap().categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.check("list_categories")?;
        Ok(self.tables.lock().unwrap().categories.values().cloned().collect())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<bool> {
        self.record("update_category")?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .categories
            .insert(category.id, category.clone())
            .is_some())
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        self.record("delete_category")?;
        Ok(self.tables.lock().unwrap().categories.remove(&id).is_some())
    }

    async fn create_weekly_menu(&self, new: NewWeeklyMenu) -> StoreResult<WeeklyMenu> {
        self.record("create_weekly_menu")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let menu = WeeklyMenu {
            id,
            name: new.name,
            description: new.description,
            total_calories: 0,
            active: false,
            created_at: Utc::now(),
        };
        tables.menus.insert(id, menu.clone());
        Ok(menu)
    }

    async fn get_weekly_menu(&self, id: i64) -> StoreResult<Option<WeeklyMenu>> {
        self.check("get_weekly_menu")?;
        Ok(self.menu(id))
    }

    async fn list_weekly_menus(&self) -> StoreResult<Vec<WeeklyMenu>> {
        self.check("list_weekly_menus")?;
        Ok(self.tables.lock().unwrap().menus.values().cloned().collect())
    }

    async fn activate_weekly_menu(&self, id: i64) -> StoreResult<bool> {
        self.record("activate_weekly_menu")?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.menus.contains_key(&id) {
            return Ok(false);
        }
        for menu in tables.menus.values_mut() {
            menu.active = menu.id == id;
        }
        Ok(true)
    }

    async fn delete_weekly_menu(&self, id: i64) -> StoreResult<bool> {
        self.record("delete_weekly_menu")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.menus.remove(&id).is_none() {
            return Ok(false);
        }
        let day_ids: Vec<i64> = tables
            .days
            .values()
            .filter(|d| d.menu_id == id)
            .map(|d| d.id)
            .collect();
        tables.days.retain(|_, d| d.menu_id != id);
        tables.meals.retain(|_, m| !day_ids.contains(&m.day_id));
        Ok(true)
    }

    async fn set_menu_calories(&self, menu_id: i64, total: i32) -> StoreResult<bool> {
        self.record("set_menu_calories")?;
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.menus.get_mut(&menu_id) {
            Some(menu) => {
                menu.total_calories = total;
                true
            }
            None => false,
        })
    }

    async fn add_day(&self, new: NewMenuDay) -> StoreResult<MenuDay> {
        self.record("add_day")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let day = MenuDay {
            id,
            menu_id: new.menu_id,
            day_number: new.day_number,
            day_name: new.day_name,
            total_calories: 0,
        };
        tables.days.insert(id, day.clone());
        Ok(day)
    }

    async fn get_day(&self, id: i64) -> StoreResult<Option<MenuDay>> {
        self.check("get_day")?;
        Ok(self.day(id))
    }

    async fn days_for_menu(&self, menu_id: i64) -> StoreResult<Vec<MenuDay>> {
        self.check("days_for_menu")?;
        Ok(self
            .days()
            .into_iter()
            .filter(|d| d.menu_id == menu_id)
            .collect())
    }

    async fn set_day_calories(&self, day_id: i64, total: i32) -> StoreResult<bool> {
        self.record("set_day_calories")?;
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.days.get_mut(&day_id) {
            Some(day) => {
                day.total_calories = total;
                true
            }
            None => false,
        })
    }

    async fn add_meal(&self, new: NewDayMeal) -> StoreResult<DayMeal> {
        self.record("add_meal")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let meal = DayMeal {
            id,
            day_id: new.day_id,
            meal_type: new.meal_type,
            meal_time: new.meal_time,
            nutrition_id: new.nutrition_id,
            notes: new.notes,
        };
        tables.meals.insert(id, meal.clone());
        Ok(meal)
    }

    async fn get_meal(&self, id: i64) -> StoreResult<Option<DayMeal>> {
        self.check("get_meal")?;
        Ok(self.tables.lock().unwrap().meals.get(&id).cloned())
    }

    async fn meals_for_day(&self, day_id: i64) -> StoreResult<Vec<DayMeal>> {
        self.check("meals_for_day")?;
        Ok(self
            .meals()
            .into_iter()
            .filter(|m| m.day_id == day_id)
            .collect())
    }

    async fn delete_meal(&self, id: i64) -> StoreResult<bool> {
        self.record("delete_meal")?;
        Ok(self.tables.lock().unwrap().meals.remove(&id).is_some())
    }

    async fn get_or_create_user(&self, telegram_id: i64, username: &str) -> StoreResult<User> {
        self.check("get_or_create_user")?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.values().find(|u| u.telegram_id == telegram_id) {
            return Ok(user.clone());
        }
        self.calls.lock().unwrap().push("create_user".to_string());
        let id = tables.next_id();
        let user = User {
            id,
            telegram_id,
            username: username.to_string(),
            role: "user".to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.check("list_users")?;
        Ok(self.tables.lock().unwrap().users.values().cloned().collect())
    }

    async fn add_progress(
        &self,
        user_id: i64,
        training_id: i64,
        notes: &str,
    ) -> StoreResult<UserProgress> {
        self.record("add_progress")?;
        let mut tables = self.tables.lock().unwrap();
        let id = tables.next_id();
        let progress = UserProgress {
            id,
            user_id,
            training_id,
            notes: notes.to_string(),
            completed_at: Utc::now(),
        };
        tables.progress.insert(id, progress.clone());
        Ok(progress)
    }

    async fn list_progress(&self) -> StoreResult<Vec<UserProgress>> {
        self.check("list_progress")?;
        Ok(self.tables.lock().unwrap().progress.values().cloned().collect())
    }

    async fn count_trainings(&self) -> StoreResult<i64> {
        self.check("count_trainings")?;
        Ok(self.tables.lock().unwrap().trainings.len() as i64)
    }
}

/// Bot application over `store` with `ADMIN_ID` as the only admin
pub fn test_app(store: Arc<MemoryStore>) -> App {
    let config = AppConfig::from_vars(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/fitness_test".to_string()),
        "ADMIN_IDS" => Some(ADMIN_ID.to_string()),
        _ => None,
    })
    .expect("test config");
    App::new(config, store)
}

pub async fn seed_nutrition(store: &MemoryStore, title: &str, calories: i32) -> Nutrition {
    store
        .create_nutrition(NewNutrition {
            title: title.to_string(),
            calories,
            ..Default::default()
        })
        .await
        .expect("seed nutrition")
}

pub async fn seed_menu(store: &MemoryStore, name: &str) -> WeeklyMenu {
    store
        .create_weekly_menu(NewWeeklyMenu {
            name: name.to_string(),
            description: String::new(),
        })
        .await
        .expect("seed menu")
}
