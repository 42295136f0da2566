//! Admin REST panel
//!
//! A small JSON API over the same store the bot uses. Every route lives under
//! `/admin` and requires the `X-Admin-Key` header.

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::errors::StoreError;
use crate::models::{
    Category, FullWeeklyMenu, NewTraining, Nutrition, Training, User, UserProgress, WeeklyMenu,
};
use crate::services;
use crate::store::FitnessStore;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn FitnessStore>,
    api_key: Arc<str>,
}

/// Build the admin router
pub fn router(store: Arc<dyn FitnessStore>, api_key: impl Into<String>) -> Router {
    let state = ApiState {
        store,
        api_key: Arc::from(api_key.into()),
    };

    Router::new()
        .route("/admin/trainings", get(list_trainings).post(create_training))
        .route("/admin/categories", get(list_categories))
        .route("/admin/nutrition", get(list_nutrition))
        .route("/admin/weekly-menus", get(list_weekly_menus))
        .route("/admin/weekly-menus/:id", get(get_weekly_menu))
        .route("/admin/users", get(list_users))
        .route("/admin/progress", get(list_progress))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_key))
        .with_state(state)
}

async fn require_admin_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == &*state.api_key => Ok(next.run(request).await),
        _ => {
            warn!(path = %request.uri().path(), "Rejected admin request without a valid key");
            Err(AppError::Unauthorized)
        }
    }
}

async fn list_trainings(State(state): State<ApiState>) -> Result<Json<Vec<Training>>, AppError> {
    Ok(Json(state.store.list_trainings().await?))
}

async fn create_training(
    State(state): State<ApiState>,
    Json(new): Json<NewTraining>,
) -> Result<(StatusCode, Json<Training>), AppError> {
    let training = services::create_training(state.store.as_ref(), new).await?;
    info!(training_id = training.id, "Training created through admin API");
    Ok((StatusCode::CREATED, Json(training)))
}

async fn list_categories(State(state): State<ApiState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.store.list_categories().await?))
}

async fn list_nutrition(State(state): State<ApiState>) -> Result<Json<Vec<Nutrition>>, AppError> {
    Ok(Json(state.store.list_nutrition().await?))
}

async fn list_weekly_menus(
    State(state): State<ApiState>,
) -> Result<Json<Vec<WeeklyMenu>>, AppError> {
    Ok(Json(state.store.list_weekly_menus().await?))
}

async fn get_weekly_menu(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<FullWeeklyMenu>, AppError> {
    Ok(Json(services::get_full_weekly_menu(state.store.as_ref(), id).await?))
}

async fn list_users(State(state): State<ApiState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.store.list_users().await?))
}

async fn list_progress(
    State(state): State<ApiState>,
) -> Result<Json<Vec<UserProgress>>, AppError> {
    Ok(Json(state.store.list_progress().await?))
}

// ============================================================
// Errors
// ============================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(v) => AppError::BadRequest(v.to_string()),
            StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
            StoreError::CalorieOverflow { .. } => AppError::Internal(e.to_string()),
            StoreError::Database(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                error!(error = %msg, "Admin API request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
