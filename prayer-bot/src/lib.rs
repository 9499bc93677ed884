//! # Prayer bot
//!
//! Telegram bot that posts the daily prayer times of one city and reminds subscribed chats when
//! each prayer begins. Wires pbot-core, handler-chain, storage and pbot-telegram together with the
//! timetable scraper, the reminder scheduler and the command handlers.

pub mod cli;
pub mod clock;
pub mod commands;
pub mod components;
pub mod config;
pub mod handlers;
pub mod oauth;
pub mod prayer;
pub mod runner;
pub mod scheduler;
pub mod secrets;
pub mod timetable;

pub use cli::{load_config, Cli, Commands};
pub use components::{build_handler_chain, BotComponents};
pub use config::{BotConfig, ConfigError};
pub use runner::{list_users, run_bot};
