//! # pbot-core
//!
//! Core types and traits for the prayer bot: [`Bot`], [`Handler`], message and user types,
//! and tracing initialization. Transport-agnostic; used by handler-chain, pbot-telegram and prayer-bot.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{BotError, HandlerError, Result};
pub use logger::init_tracing;
pub use types::{
    BotCommand, Chat, Handler, HandlerResponse, Message, MessageDirection, ToCoreMessage, User,
};
