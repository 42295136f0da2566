//! # Fitness Telegram Bot
//!
//! A Telegram bot that serves training programs, nutrition plans and weekly
//! menus to users, and lets administrators manage that content through
//! multi-step chat flows or a small REST panel.

pub mod admin_api;
pub mod bot;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
