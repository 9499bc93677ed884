use std::sync::Arc;

use async_trait::async_trait;
use pbot_core::Result;
use storage::{Repository, UserRecord, UserRepository};
use tracing::info;

use super::{storage_error, Command, CommandContext, Reply};
use crate::scheduler::ReminderScheduler;

pub const INTRO_TEXT: &str = "I will send you a reminder everyday on the prayer times of that day.\n\
Send /stop to stop reminding or /today to get just today's prayer times.";
pub const ALREADY_ACTIVE_TEXT: &str = "The bot is already activated.";

/// Subscribes the chat and (re)starts its daily reminders.
pub struct StartCommand {
    repo: Arc<UserRepository>,
    scheduler: Arc<ReminderScheduler>,
}

impl StartCommand {
    pub fn new(repo: Arc<UserRepository>, scheduler: Arc<ReminderScheduler>) -> Self {
        Self { repo, scheduler }
    }
}

#[async_trait]
impl Command for StartCommand {
    fn name(&self) -> &'static str {
        "start"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let chat_id = ctx.message.chat.id;

        let reply = match self.repo.get(chat_id).await.map_err(storage_error)? {
            None => {
                self.repo
                    .put(&UserRecord::new(chat_id))
                    .await
                    .map_err(storage_error)?;
                info!(chat_id, "New chat subscribed");
                INTRO_TEXT
            }
            Some(user) if user.active => ALREADY_ACTIVE_TEXT,
            Some(_) => {
                self.repo
                    .set_active(chat_id, true)
                    .await
                    .map_err(storage_error)?;
                info!(chat_id, "Chat reactivated");
                INTRO_TEXT
            }
        };

        // Replaces any running timer, so a storage failure above leaves the old one in place.
        self.scheduler.schedule_daily(chat_id).await;
        Ok(Reply::Text(reply.to_string()))
    }
}
