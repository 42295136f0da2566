use anyhow::{Context, Result};
use rand::Rng;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::DbConnectConfig;
use crate::models::{
    Category, DayMeal, MenuDay, NewCategory, NewDayMeal, NewMenuDay, NewNutrition, NewTraining,
    NewWeeklyMenu, Nutrition, Training, User, UserProgress, WeeklyMenu,
};

/// Open a connection pool, retrying with exponential backoff and jitter
pub async fn connect_with_retry(database_url: &str, config: &DbConnectConfig) -> Result<PgPool> {
    let mut attempt = 1;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await;

        match result {
            Ok(pool) => {
                info!(attempt, "Connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < config.max_attempts => {
                let jitter = rand::thread_rng().gen_range(0..=250);
                let delay = config.backoff_delay(attempt) + Duration::from_millis(jitter);
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to connect to database after {attempt} attempts")
                });
            }
        }
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    let statements: [(&str, &str); 8] = [
        (
            "categories",
            "CREATE TABLE IF NOT EXISTS categories (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL DEFAULT 'general',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
        (
            "trainings",
            "CREATE TABLE IF NOT EXISTS trainings (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                difficulty TEXT NOT NULL DEFAULT '',
                duration INTEGER NOT NULL,
                category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
                youtube_link TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
        (
            "nutrition",
            "CREATE TABLE IF NOT EXISTS nutrition (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                calories INTEGER NOT NULL DEFAULT 0,
                protein DOUBLE PRECISION NOT NULL DEFAULT 0,
                carbs DOUBLE PRECISION NOT NULL DEFAULT 0,
                fats DOUBLE PRECISION NOT NULL DEFAULT 0,
                category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
        (
            "weekly_menus",
            "CREATE TABLE IF NOT EXISTS weekly_menus (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                total_calories INTEGER NOT NULL DEFAULT 0,
                active BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
        (
            "menu_days",
            "CREATE TABLE IF NOT EXISTS menu_days (
                id BIGSERIAL PRIMARY KEY,
                menu_id BIGINT NOT NULL REFERENCES weekly_menus(id) ON DELETE CASCADE,
                day_number INTEGER NOT NULL CHECK (day_number BETWEEN 1 AND 7),
                day_name TEXT NOT NULL,
                total_calories INTEGER NOT NULL DEFAULT 0
            )",
        ),
        (
            "day_meals",
            "CREATE TABLE IF NOT EXISTS day_meals (
                id BIGSERIAL PRIMARY KEY,
                day_id BIGINT NOT NULL REFERENCES menu_days(id) ON DELETE CASCADE,
                meal_type TEXT NOT NULL,
                meal_time TEXT NOT NULL DEFAULT '',
                nutrition_id BIGINT NOT NULL,
                notes TEXT NOT NULL DEFAULT ''
            )",
        ),
        (
            "users",
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                telegram_id BIGINT UNIQUE NOT NULL,
                username TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'user',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
        (
            "user_progress",
            "CREATE TABLE IF NOT EXISTS user_progress (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                training_id BIGINT NOT NULL REFERENCES trainings(id) ON DELETE CASCADE,
                notes TEXT NOT NULL DEFAULT '',
                completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        ),
    ];

    for (table, sql) in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {table} table"))?;
    }

    info!("Database schema initialized successfully");
    Ok(())
}

// ==================== Trainings ====================

pub async fn create_training(pool: &PgPool, new: &NewTraining) -> Result<Training> {
    info!(title = %new.title, "Creating training");

    let training = sqlx::query_as::<_, Training>(
        "INSERT INTO trainings (title, description, difficulty, duration, category_id, youtube_link)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, title, description, difficulty, duration, category_id, youtube_link, created_at",
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.difficulty)
    .bind(new.duration)
    .bind(new.category_id)
    .bind(&new.youtube_link)
    .fetch_one(pool)
    .await
    .context("Failed to insert training")?;

    info!(training_id = training.id, "Training created");
    Ok(training)
}

pub async fn get_training(pool: &PgPool, id: i64) -> Result<Option<Training>> {
    sqlx::query_as::<_, Training>(
        "SELECT id, title, description, difficulty, duration, category_id, youtube_link, created_at
         FROM trainings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read training")
}

pub async fn list_trainings(pool: &PgPool) -> Result<Vec<Training>> {
    sqlx::query_as::<_, Training>(
        "SELECT id, title, description, difficulty, duration, category_id, youtube_link, created_at
         FROM trainings ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list trainings")
}

/// Write every column of an already merged training row
pub async fn update_training(pool: &PgPool, training: &Training) -> Result<bool> {
    info!(training_id = training.id, "Updating training");

    let result = sqlx::query(
        "UPDATE trainings
         SET title = $1, description = $2, difficulty = $3, duration = $4,
             category_id = $5, youtube_link = $6
         WHERE id = $7",
    )
    .bind(&training.title)
    .bind(&training.description)
    .bind(&training.difficulty)
    .bind(training.duration)
    .bind(training.category_id)
    .bind(&training.youtube_link)
    .bind(training.id)
    .execute(pool)
    .await
    .context("Failed to update training")?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_training(pool: &PgPool, id: i64) -> Result<bool> {
    info!(training_id = id, "Deleting training");

    let result = sqlx::query("DELETE FROM trainings WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete training")?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_trainings(pool: &PgPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trainings")
        .fetch_one(pool)
        .await
        .context("Failed to count trainings")?;
    Ok(count)
}

// ==================== Nutrition ====================

pub async fn create_nutrition(pool: &PgPool, new: &NewNutrition) -> Result<Nutrition> {
    info!(title = %new.title, "Creating nutrition");

    let nutrition = sqlx::query_as::<_, Nutrition>(
        "INSERT INTO nutrition (title, description, calories, protein, carbs, fats, category_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, title, description, calories, protein, carbs, fats, category_id, created_at",
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.calories)
    .bind(new.protein)
    .bind(new.carbs)
    .bind(new.fats)
    .bind(new.category_id)
    .fetch_one(pool)
    .await
    .context("Failed to insert nutrition")?;

    info!(nutrition_id = nutrition.id, "Nutrition created");
    Ok(nutrition)
}

pub async fn get_nutrition(pool: &PgPool, id: i64) -> Result<Option<Nutrition>> {
    sqlx::query_as::<_, Nutrition>(
        "SELECT id, title, description, calories, protein, carbs, fats, category_id, created_at
         FROM nutrition WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read nutrition")
}

pub async fn list_nutrition(pool: &PgPool) -> Result<Vec<Nutrition>> {
    sqlx::query_as::<_, Nutrition>(
        "SELECT id, title, description, calories, protein, carbs, fats, category_id, created_at
         FROM nutrition ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list nutrition")
}

pub async fn update_nutrition(pool: &PgPool, nutrition: &Nutrition) -> Result<bool> {
    info!(nutrition_id = nutrition.id, "Updating nutrition");

    let result = sqlx::query(
        "UPDATE nutrition
         SET title = $1, description = $2, calories = $3, protein = $4, carbs = $5,
             fats = $6, category_id = $7
         WHERE id = $8",
    )
    .bind(&nutrition.title)
    .bind(&nutrition.description)
    .bind(nutrition.calories)
    .bind(nutrition.protein)
    .bind(nutrition.carbs)
    .bind(nutrition.fats)
    .bind(nutrition.category_id)
    .bind(nutrition.id)
    .execute(pool)
    .await
    .context("Failed to update nutrition")?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_nutrition(pool: &PgPool, id: i64) -> Result<bool> {
    info!(nutrition_id = id, "Deleting nutrition");

    let result = sqlx::query("DELETE FROM nutrition WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete nutrition")?;

    Ok(result.rows_affected() > 0)
}

// ==================== Categories ====================

pub async fn create_category(pool: &PgPool, new: &NewCategory) -> Result<Category> {
    info!(name = %new.name, kind = %new.kind, "Creating category");

    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description, kind)
         VALUES ($1, $2, $3)
         RETURNING id, name, description, kind, created_at",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.kind)
    .fetch_one(pool)
    .await
    .context("Failed to insert category")
}

pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<Category>> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, description, kind, created_at FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read category")
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name, description, kind, created_at FROM categories ORDER BY kind, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")
}

pub async fn update_category(pool: &PgPool, category: &Category) -> Result<bool> {
    info!(category_id = category.id, "Updating category");

    let result =
        sqlx::query("UPDATE categories SET name = $1, description = $2, kind = $3 WHERE id = $4")
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.kind)
            .bind(category.id)
            .execute(pool)
            .await
            .context("Failed to update category")?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_category(pool: &PgPool, id: i64) -> Result<bool> {
    info!(category_id = id, "Deleting category");

    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(result.rows_affected() > 0)
}

// ==================== Weekly menus ====================

pub async fn create_weekly_menu(pool: &PgPool, new: &NewWeeklyMenu) -> Result<WeeklyMenu> {
    info!(name = %new.name, "Creating weekly menu");

    sqlx::query_as::<_, WeeklyMenu>(
        "INSERT INTO weekly_menus (name, description)
         VALUES ($1, $2)
         RETURNING id, name, description, total_calories, active, created_at",
    )
    .bind(&new.name)
    .bind(&new.description)
    .fetch_one(pool)
    .await
    .context("Failed to insert weekly menu")
}

pub async fn get_weekly_menu(pool: &PgPool, id: i64) -> Result<Option<WeeklyMenu>> {
    sqlx::query_as::<_, WeeklyMenu>(
        "SELECT id, name, description, total_calories, active, created_at
         FROM weekly_menus WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read weekly menu")
}

pub async fn list_weekly_menus(pool: &PgPool) -> Result<Vec<WeeklyMenu>> {
    sqlx::query_as::<_, WeeklyMenu>(
        "SELECT id, name, description, total_calories, active, created_at
         FROM weekly_menus ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list weekly menus")
}

/// Make `id` the only active menu
pub async fn activate_weekly_menu(pool: &PgPool, id: i64) -> Result<bool> {
    info!(menu_id = id, "Activating weekly menu");

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query("UPDATE weekly_menus SET active = FALSE WHERE active")
        .execute(&mut *tx)
        .await
        .context("Failed to deactivate weekly menus")?;

    let result = sqlx::query("UPDATE weekly_menus SET active = TRUE WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to activate weekly menu")?;

    if result.rows_affected() == 0 {
        // nothing to activate, keep the previous active menu
        tx.rollback().await.context("Failed to roll back activation")?;
        return Ok(false);
    }

    tx.commit().await.context("Failed to commit activation")?;
    Ok(true)
}

pub async fn delete_weekly_menu(pool: &PgPool, id: i64) -> Result<bool> {
    info!(menu_id = id, "Deleting weekly menu");

    let result = sqlx::query("DELETE FROM weekly_menus WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete weekly menu")?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_menu_calories(pool: &PgPool, id: i64, total: i32) -> Result<bool> {
    debug!(menu_id = id, total, "Setting menu calories");

    let result = sqlx::query("UPDATE weekly_menus SET total_calories = $1 WHERE id = $2")
        .bind(total)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update menu calories")?;

    Ok(result.rows_affected() > 0)
}

// ==================== Menu days ====================

pub async fn add_menu_day(pool: &PgPool, new: &NewMenuDay) -> Result<MenuDay> {
    info!(menu_id = new.menu_id, day_number = new.day_number, "Adding menu day");

    sqlx::query_as::<_, MenuDay>(
        "INSERT INTO menu_days (menu_id, day_number, day_name)
         VALUES ($1, $2, $3)
         RETURNING id, menu_id, day_number, day_name, total_calories",
    )
    .bind(new.menu_id)
    .bind(new.day_number)
    .bind(&new.day_name)
    .fetch_one(pool)
    .await
    .context("Failed to insert menu day")
}

pub async fn get_menu_day(pool: &PgPool, id: i64) -> Result<Option<MenuDay>> {
    sqlx::query_as::<_, MenuDay>(
        "SELECT id, menu_id, day_number, day_name, total_calories FROM menu_days WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read menu day")
}

/// Days of a menu in creation order
pub async fn days_for_menu(pool: &PgPool, menu_id: i64) -> Result<Vec<MenuDay>> {
    sqlx::query_as::<_, MenuDay>(
        "SELECT id, menu_id, day_number, day_name, total_calories
         FROM menu_days WHERE menu_id = $1 ORDER BY id",
    )
    .bind(menu_id)
    .fetch_all(pool)
    .await
    .context("Failed to list menu days")
}

pub async fn set_day_calories(pool: &PgPool, id: i64, total: i32) -> Result<bool> {
    debug!(day_id = id, total, "Setting day calories");

    let result = sqlx::query("UPDATE menu_days SET total_calories = $1 WHERE id = $2")
        .bind(total)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update day calories")?;

    Ok(result.rows_affected() > 0)
}

// ==================== Day meals ====================

pub async fn add_day_meal(pool: &PgPool, new: &NewDayMeal) -> Result<DayMeal> {
    info!(day_id = new.day_id, nutrition_id = new.nutrition_id, "Adding meal");

    sqlx::query_as::<_, DayMeal>(
        "INSERT INTO day_meals (day_id, meal_type, meal_time, nutrition_id, notes)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, day_id, meal_type, meal_time, nutrition_id, notes",
    )
    .bind(new.day_id)
    .bind(&new.meal_type)
    .bind(&new.meal_time)
    .bind(new.nutrition_id)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
    .context("Failed to insert meal")
}

pub async fn get_day_meal(pool: &PgPool, id: i64) -> Result<Option<DayMeal>> {
    sqlx::query_as::<_, DayMeal>(
        "SELECT id, day_id, meal_type, meal_time, nutrition_id, notes FROM day_meals WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read meal")
}

pub async fn meals_for_day(pool: &PgPool, day_id: i64) -> Result<Vec<DayMeal>> {
    sqlx::query_as::<_, DayMeal>(
        "SELECT id, day_id, meal_type, meal_time, nutrition_id, notes
         FROM day_meals WHERE day_id = $1 ORDER BY id",
    )
    .bind(day_id)
    .fetch_all(pool)
    .await
    .context("Failed to list meals")
}

pub async fn delete_day_meal(pool: &PgPool, id: i64) -> Result<bool> {
    info!(meal_id = id, "Deleting meal");

    let result = sqlx::query("DELETE FROM day_meals WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete meal")?;

    Ok(result.rows_affected() > 0)
}

// ==================== Users and progress ====================

/// Get or create a user by Telegram ID
pub async fn get_or_create_user(pool: &PgPool, telegram_id: i64, username: &str) -> Result<User> {
    let existing = sqlx::query_as::<_, User>(
        "SELECT id, telegram_id, username, role, created_at FROM users WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to query user")?;

    if let Some(user) = existing {
        return Ok(user);
    }

    info!(telegram_id, "Creating new user");
    sqlx::query_as::<_, User>(
        "INSERT INTO users (telegram_id, username) VALUES ($1, $2)
         ON CONFLICT (telegram_id) DO UPDATE SET username = EXCLUDED.username
         RETURNING id, telegram_id, username, role, created_at",
    )
    .bind(telegram_id)
    .bind(username)
    .fetch_one(pool)
    .await
    .context("Failed to insert user")
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        "SELECT id, telegram_id, username, role, created_at FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list users")
}

pub async fn add_progress(
    pool: &PgPool,
    user_id: i64,
    training_id: i64,
    notes: &str,
) -> Result<UserProgress> {
    info!(user_id, training_id, "Recording progress");

    sqlx::query_as::<_, UserProgress>(
        "INSERT INTO user_progress (user_id, training_id, notes)
         VALUES ($1, $2, $3)
         RETURNING id, user_id, training_id, notes, completed_at",
    )
    .bind(user_id)
    .bind(training_id)
    .bind(notes)
    .fetch_one(pool)
    .await
    .context("Failed to insert progress")
}

pub async fn list_progress(pool: &PgPool) -> Result<Vec<UserProgress>> {
    sqlx::query_as::<_, UserProgress>(
        "SELECT id, user_id, training_id, notes, completed_at
         FROM user_progress ORDER BY completed_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list progress")
}
