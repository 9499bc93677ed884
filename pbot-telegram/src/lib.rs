//! # pbot-telegram
//!
//! Telegram transport layer: adapters, [`pbot_core::Bot`] implementation, a long-polling
//! [`UpdateSource`] and the [`BotRuntime`] event loop with bounded reconnects.
//! Handles only Telegram connectivity and handler-chain execution; no persistence or prayer logic.

mod adapters;
mod bot_adapter;
mod error;
mod runtime;
mod update_source;

pub use adapters::TelegramMessageWrapper;
pub use bot_adapter::TelegramBotAdapter;
pub use error::ConnectionError;
pub use runtime::{BotRuntime, RuntimeOptions, RuntimeState};
pub use update_source::{TelegramUpdateSource, UpdateSource};
