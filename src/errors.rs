//! # Store Error Types Module
//!
//! This module defines the error types returned by the persistence layer and
//! the service functions built on top of it. Flow-level input errors live in
//! `dialogue` and never reach this boundary.

use thiserror::Error;

/// Entity rules enforced before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("training title must not be empty")]
    EmptyTrainingTitle,
    #[error("training duration must be a positive number of minutes")]
    NonPositiveDuration,
    #[error("weekly menu name must not be empty")]
    EmptyMenuName,
    #[error("day number must be between 1 and 7, got {0}")]
    DayNumberOutOfRange(i32),
    #[error("identifier must be positive")]
    InvalidId,
}

impl ValidationError {
    /// Localization key of the message shown to the admin
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::EmptyTrainingTitle => "validation-empty-training-title",
            ValidationError::NonPositiveDuration => "validation-non-positive-duration",
            ValidationError::EmptyMenuName => "validation-empty-menu-name",
            ValidationError::DayNumberOutOfRange(_) => "validation-day-out-of-range",
            ValidationError::InvalidId => "validation-invalid-id",
        }
    }
}

/// Custom error types for store and service operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The payload broke an entity rule
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// A referenced row does not exist
    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// A calorie total no longer fits the column
    #[error("calorie total of {entity} #{id} overflows")]
    CalorieOverflow { entity: &'static str, id: i64 },
    /// Anything the database reported
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Database(format!("{err:#}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
