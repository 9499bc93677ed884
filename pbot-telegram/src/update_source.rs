//! Inbound side of the transport: something that yields batches of core messages.

use async_trait::async_trait;
use pbot_core::{Message, ToCoreMessage};
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use tracing::debug;

use crate::adapters::TelegramMessageWrapper;
use crate::error::ConnectionError;

/// Source of inbound messages. An `Err` means the connection is lost; the runtime reconnects.
#[async_trait]
pub trait UpdateSource: Send {
    async fn poll(&mut self) -> Result<Vec<Message>, ConnectionError>;
}

/// Long-polls `getUpdates`, acknowledging each batch through the offset.
pub struct TelegramUpdateSource {
    bot: teloxide::Bot,
    offset: i32,
    timeout_secs: u32,
}

impl TelegramUpdateSource {
    pub fn new(bot: teloxide::Bot, timeout_secs: u32) -> Self {
        Self {
            bot,
            offset: 0,
            timeout_secs,
        }
    }
}

#[async_trait]
impl UpdateSource for TelegramUpdateSource {
    async fn poll(&mut self) -> Result<Vec<Message>, ConnectionError> {
        let updates = self
            .bot
            .get_updates()
            .offset(self.offset)
            .timeout(self.timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let mut messages = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset = update.id.as_offset();
            if let UpdateKind::Message(msg) = update.kind {
                messages.push(TelegramMessageWrapper(&msg).to_core());
            }
        }

        if !messages.is_empty() {
            debug!(count = messages.len(), offset = self.offset, "Polled updates");
        }
        Ok(messages)
    }
}
