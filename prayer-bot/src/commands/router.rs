use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use pbot_core::{Bot, Handler, HandlerResponse, Message, Result};
use tracing::{debug, info, instrument};

use crate::clock::Clock;

/// What a command sends back to the chat it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Already escaped for MarkdownV2.
    Markdown(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(s) | Reply::Markdown(s) => s,
        }
    }
}

pub struct CommandContext<'a> {
    pub message: &'a Message,
    /// Everything after the command name, trimmed.
    pub args: &'a str,
    /// Local time of the timetable's zone.
    pub now: DateTime<FixedOffset>,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Name without the leading slash.
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply>;
}

/// Dispatches `/name` messages to the registered command and sends its reply.
///
/// Plain text, unknown commands and commands addressed to another bot (`/stop@other_bot`) return
/// [`HandlerResponse::Ignore`].
pub struct CommandRouter {
    bot: Arc<dyn Bot>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    bot_username: Option<String>,
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRouter {
    pub fn new(bot: Arc<dyn Bot>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            bot,
            clock,
            offset,
            bot_username: None,
            commands: HashMap::new(),
        }
    }

    /// Username from `getMe`. Without it, `@mentions` are not checked.
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    pub fn register(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.insert(command.name(), command);
        self
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl Handler for CommandRouter {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let Some(parsed) = message.command() else {
            return Ok(HandlerResponse::Ignore);
        };
        let name = parsed.name;
        if let Some(username) = &self.bot_username {
            if !parsed.is_for(username) {
                debug!(command = %name, mention = ?parsed.mention, "Command addressed to another bot");
                return Ok(HandlerResponse::Ignore);
            }
        }
        let Some(command) = self.commands.get(name) else {
            debug!(command = %name, "Unknown command ignored");
            return Ok(HandlerResponse::Ignore);
        };

        let ctx = CommandContext {
            message,
            args: parsed.args,
            now: self.clock.now().with_timezone(&self.offset),
        };
        let reply = command.execute(&ctx).await?;

        match &reply {
            Reply::Text(text) => self.bot.send_message(&message.chat, text).await?,
            Reply::Markdown(text) => self.bot.send_markdown(&message.chat, text).await?,
        }
        info!(command = %name, "Command handled");

        Ok(HandlerResponse::Reply(reply.text().to_string()))
    }
}
