use std::sync::Arc;

use async_trait::async_trait;
use pbot_core::Result;
use storage::UserRepository;
use tracing::info;

use super::{storage_error, Command, CommandContext, Reply};
use crate::scheduler::ReminderScheduler;

pub const STOPPED_TEXT: &str = "Reminders stopped. To reactivate, send /start again.";

pub struct StopCommand {
    repo: Arc<UserRepository>,
    scheduler: Arc<ReminderScheduler>,
}

impl StopCommand {
    pub fn new(repo: Arc<UserRepository>, scheduler: Arc<ReminderScheduler>) -> Self {
        Self { repo, scheduler }
    }
}

#[async_trait]
impl Command for StopCommand {
    fn name(&self) -> &'static str {
        "stop"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let chat_id = ctx.message.chat.id;
        let known = self
            .repo
            .set_active(chat_id, false)
            .await
            .map_err(storage_error)?;
        self.scheduler.cancel(chat_id).await;
        info!(chat_id, known, "Reminders stopped");
        Ok(Reply::Text(STOPPED_TEXT.to_string()))
    }
}
