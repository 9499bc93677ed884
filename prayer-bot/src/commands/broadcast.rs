use std::sync::Arc;

use async_trait::async_trait;
use pbot_core::{Bot, Chat, HandlerError, Result};
use storage::{Repository, UserRepository};
use tracing::{info, warn};

use super::{storage_error, Command, CommandContext, Reply};

/// `/broadcast <text>`: admin chat only, sends the text to every stored chat.
pub struct BroadcastCommand {
    bot: Arc<dyn Bot>,
    repo: Arc<UserRepository>,
    admin_chat_id: Option<i64>,
}

impl BroadcastCommand {
    pub fn new(bot: Arc<dyn Bot>, repo: Arc<UserRepository>, admin_chat_id: Option<i64>) -> Self {
        Self {
            bot,
            repo,
            admin_chat_id,
        }
    }
}

#[async_trait]
impl Command for BroadcastCommand {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let chat_id = ctx.message.chat.id;
        if self.admin_chat_id != Some(chat_id) {
            warn!(chat_id, "Broadcast attempt from non-admin chat");
            return Err(HandlerError::Unauthorized.into());
        }
        if ctx.args.is_empty() {
            return Err(HandlerError::InvalidCommand("broadcast text is empty".to_string()).into());
        }

        let users = self.repo.list().await.map_err(storage_error)?;
        let mut sent = 0;
        for user in &users {
            match self.bot.send_message(&Chat::private(user.id), ctx.args).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(chat_id = user.id, error = %e, "Broadcast delivery failed"),
            }
        }
        info!(sent, total = users.len(), "Broadcast finished");

        Ok(Reply::Text(format!(
            "Broadcast sent to {} of {} chats.",
            sent,
            users.len()
        )))
    }
}
