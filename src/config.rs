//! # Application Configuration Module
//!
//! This module defines the runtime configuration shared by the bot and the
//! admin panel binaries, loaded from environment variables (and `.env`).

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::time::Duration;

// Defaults for configuration values
pub const DEFAULT_ADMIN_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DB_CONNECT_ATTEMPTS: u32 = 15;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Retry policy for the initial database connection
#[derive(Debug, Clone, PartialEq)]
pub struct DbConnectConfig {
    /// Maximum pool size
    pub max_connections: u32,
    /// Number of connection attempts before giving up
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for DbConnectConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            max_attempts: DEFAULT_DB_CONNECT_ATTEMPTS,
            base_retry_delay_ms: 1000, // 1 second
            max_retry_delay_ms: 10000, // 10 seconds
        }
    }
}

impl DbConnectConfig {
    /// Exponential backoff for the given 1-based attempt, before jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_retry_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_retry_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Configuration for both binaries
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_token: Option<String>,
    pub database_url: String,
    pub admin_ids: HashSet<i64>,
    pub admin_api_key: Option<String>,
    pub admin_bind_addr: String,
    pub db: DbConnectConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(database_url) = non_empty("DATABASE_URL") else {
            bail!("DATABASE_URL must be set");
        };

        let defaults = DbConnectConfig::default();
        let db = DbConnectConfig {
            max_connections: parse_or(non_empty("DB_MAX_CONNECTIONS"), defaults.max_connections),
            max_attempts: parse_or(non_empty("DB_CONNECT_ATTEMPTS"), defaults.max_attempts).max(1),
            base_retry_delay_ms: parse_or(
                non_empty("DB_RETRY_BASE_DELAY_MS"),
                defaults.base_retry_delay_ms,
            ),
            max_retry_delay_ms: parse_or(
                non_empty("DB_RETRY_MAX_DELAY_MS"),
                defaults.max_retry_delay_ms,
            ),
        };

        Ok(Self {
            telegram_token: non_empty("TELEGRAM_BOT_TOKEN"),
            database_url,
            admin_ids: parse_admin_ids(&lookup("ADMIN_IDS").unwrap_or_default()),
            admin_api_key: non_empty("ADMIN_API_KEY"),
            admin_bind_addr: non_empty("ADMIN_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_ADMIN_BIND_ADDR.to_string()),
            db,
            log_format: non_empty("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    /// Whether the Telegram user may use admin features
    pub fn is_admin(&self, telegram_id: i64) -> bool {
        self.admin_ids.contains(&telegram_id)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma separated list of Telegram ids, skipping malformed entries
pub fn parse_admin_ids(raw: &str) -> HashSet<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
