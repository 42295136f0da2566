//! # Fitness Store
//!
//! `FitnessStore` is the persistence seam used by the services, the flow
//! engine and the admin panel. `PgStore` is the production implementation;
//! tests plug in an in-memory one.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db;
use crate::errors::StoreResult;
use crate::models::{
    Category, DayMeal, MenuDay, NewCategory, NewDayMeal, NewMenuDay, NewNutrition, NewTraining,
    NewWeeklyMenu, Nutrition, Training, User, UserProgress, WeeklyMenu,
};

/// Primitive CRUD over every fitness entity.
///
/// `update_*` methods write a full, already merged row and return `false`
/// when the row does not exist. `delete_*` methods behave the same way.
#[async_trait]
pub trait FitnessStore: Send + Sync {
    async fn create_training(&self, new: NewTraining) -> StoreResult<Training>;
    async fn get_training(&self, id: i64) -> StoreResult<Option<Training>>;
    async fn list_trainings(&self) -> StoreResult<Vec<Training>>;
    async fn update_training(&self, training: &Training) -> StoreResult<bool>;
    async fn delete_training(&self, id: i64) -> StoreResult<bool>;

    async fn create_nutrition(&self, new: NewNutrition) -> StoreResult<Nutrition>;
    async fn get_nutrition(&self, id: i64) -> StoreResult<Option<Nutrition>>;
    async fn list_nutrition(&self) -> StoreResult<Vec<Nutrition>>;
    async fn update_nutrition(&self, nutrition: &Nutrition) -> StoreResult<bool>;
    async fn delete_nutrition(&self, id: i64) -> StoreResult<bool>;

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn update_category(&self, category: &Category) -> StoreResult<bool>;
    async fn delete_category(&self, id: i64) -> StoreResult<bool>;

    async fn create_weekly_menu(&self, new: NewWeeklyMenu) -> StoreResult<WeeklyMenu>;
    async fn get_weekly_menu(&self, id: i64) -> StoreResult<Option<WeeklyMenu>>;
    async fn list_weekly_menus(&self) -> StoreResult<Vec<WeeklyMenu>>;
    /// Deactivate every menu, then activate `id`
    async fn activate_weekly_menu(&self, id: i64) -> StoreResult<bool>;
    async fn delete_weekly_menu(&self, id: i64) -> StoreResult<bool>;
    async fn set_menu_calories(&self, menu_id: i64, total: i32) -> StoreResult<bool>;

    async fn add_day(&self, new: NewMenuDay) -> StoreResult<MenuDay>;
    async fn get_day(&self, id: i64) -> StoreResult<Option<MenuDay>>;
    /// Days of a menu in creation order
    async fn days_for_menu(&self, menu_id: i64) -> StoreResult<Vec<MenuDay>>;
    async fn set_day_calories(&self, day_id: i64, total: i32) -> StoreResult<bool>;

    async fn add_meal(&self, new: NewDayMeal) -> StoreResult<DayMeal>;
    async fn get_meal(&self, id: i64) -> StoreResult<Option<DayMeal>>;
    async fn meals_for_day(&self, day_id: i64) -> StoreResult<Vec<DayMeal>>;
    async fn delete_meal(&self, id: i64) -> StoreResult<bool>;

    async fn get_or_create_user(&self, telegram_id: i64, username: &str) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn add_progress(
        &self,
        user_id: i64,
        training_id: i64,
        notes: &str,
    ) -> StoreResult<UserProgress>;
    async fn list_progress(&self) -> StoreResult<Vec<UserProgress>>;

    async fn count_trainings(&self) -> StoreResult<i64>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FitnessStore for PgStore {
    async fn create_training(&self, new: NewTraining) -> StoreResult<Training> {
        Ok(db::create_training(&self.pool, &new).await?)
    }

    async fn get_training(&self, id: i64) -> StoreResult<Option<Training>> {
        Ok(db::get_training(&self.pool, id).await?)
    }

    async fn list_trainings(&self) -> StoreResult<Vec<Training>> {
        Ok(db::list_trainings(&self.pool).await?)
    }

    async fn update_training(&self, training: &Training) -> StoreResult<bool> {
        Ok(db::update_training(&self.pool, training).await?)
    }

    async fn delete_training(&self, id: i64) -> StoreResult<bool> {
        Ok(db::delete_training(&self.pool, id).await?)
    }

    async fn create_nutrition(&self, new: NewNutrition) -> StoreResult<Nutrition> {
        Ok(db::create_nutrition(&self.pool, &new).await?)
    }

    async fn get_nutrition(&self, id: i64) -> StoreResult<Option<Nutrition>> {
        Ok(db::get_nutrition(&self.pool, id).await?)
    }

    async fn list_nutrition(&self) -> StoreResult<Vec<Nutrition>> {
        Ok(db::list_nutrition(&self.pool).await?)
    }

    async fn update_nutrition(&self, nutrition: &Nutrition) -> StoreResult<bool> {
        Ok(db::update_nutrition(&self.pool, nutrition).await?)
    }

    async fn delete_nutrition(&self, id: i64) -> StoreResult<bool> {
        Ok(db::delete_nutrition(&self.pool, id).await?)
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        Ok(db::create_category(&self.pool, &new).await?)
    }

    async fn get_category(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(db::get_category(&self.pool, id).await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(db::list_categories(&self.pool).await?)
    }

    async fn update_category(&self, category: &Category) -> StoreResult<bool> {
        Ok(db::update_category(&self.pool, category).await?)
    }

    async fn delete_category(&self, id: i64) -> StoreResult<bool> {
        Ok(db::delete_category(&self.pool, id).await?)
    }

    async fn create_weekly_menu(&self, new: NewWeeklyMenu) -> StoreResult<WeeklyMenu> {
        Ok(db::create_weekly_menu(&self.pool, &new).await?)
    }

    async fn get_weekly_menu(&self, id: i64) -> StoreResult<Option<WeeklyMenu>> {
        Ok(db::get_weekly_menu(&self.pool, id).await?)
    }

    async fn list_weekly_menus(&self) -> StoreResult<Vec<WeeklyMenu>> {
        Ok(db::list_weekly_menus(&self.pool).await?)
    }

    async fn activate_weekly_menu(&self, id: i64) -> StoreResult<bool> {
        Ok(db::activate_weekly_menu(&self.pool, id).await?)
    }

    async fn delete_weekly_menu(&self, id: i64) -> StoreResult<bool> {
        Ok(db::delete_weekly_menu(&self.pool, id).await?)
    }

    async fn set_menu_calories(&self, menu_id: i64, total: i32) -> StoreResult<bool> {
        Ok(db::set_menu_calories(&self.pool, menu_id, total).await?)
    }

    async fn add_day(&self, new: NewMenuDay) -> StoreResult<MenuDay> {
        Ok(db::add_menu_day(&self.pool, &new).await?)
    }

    async fn get_day(&self, id: i64) -> StoreResult<Option<MenuDay>> {
        Ok(db::get_menu_day(&self.pool, id).await?)
    }

    async fn days_for_menu(&self, menu_id: i64) -> StoreResult<Vec<MenuDay>> {
        Ok(db::days_for_menu(&self.pool, menu_id).await?)
    }

    async fn set_day_calories(&self, day_id: i64, total: i32) -> StoreResult<bool> {
        Ok(db::set_day_calories(&self.pool, day_id, total).await?)
    }

    async fn add_meal(&self, new: NewDayMeal) -> StoreResult<DayMeal> {
        Ok(db::add_day_meal(&self.pool, &new).await?)
    }

    async fn get_meal(&self, id: i64) -> StoreResult<Option<DayMeal>> {
        Ok(db::get_day_meal(&self.pool, id).await?)
    }

    async fn meals_for_day(&self, day_id: i64) -> StoreResult<Vec<DayMeal>> {
        Ok(db::meals_for_day(&self.pool, day_id).await?)
    }

    async fn delete_meal(&self, id: i64) -> StoreResult<bool> {
        Ok(db::delete_day_meal(&self.pool, id).await?)
    }

    async fn get_or_create_user(&self, telegram_id: i64, username: &str) -> StoreResult<User> {
        Ok(db::get_or_create_user(&self.pool, telegram_id, username).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(db::list_users(&self.pool).await?)
    }

    async fn add_progress(
        &self,
        user_id: i64,
        training_id: i64,
        notes: &str,
    ) -> StoreResult<UserProgress> {
        Ok(db::add_progress(&self.pool, user_id, training_id, notes).await?)
    }

    async fn list_progress(&self) -> StoreResult<Vec<UserProgress>> {
        Ok(db::list_progress(&self.pool).await?)
    }

    async fn count_trainings(&self) -> StoreResult<i64> {
        Ok(db::count_trainings(&self.pool).await?)
    }
}
