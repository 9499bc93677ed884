//! Conversion of incoming teloxide messages into [`pbot_core::Message`].

use pbot_core::{Chat, Message, MessageDirection, ToCoreMessage, User};

/// Wraps a teloxide Message for conversion to core [`Message`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl ToCoreMessage for TelegramMessageWrapper<'_> {
    fn to_core(&self) -> Message {
        let msg = self.0;
        let text = msg.text();
        Message {
            id: msg.id.to_string(),
            user: msg.from.as_ref().map(sender).unwrap_or_else(anonymous),
            chat: Chat {
                id: msg.chat.id.0,
                chat_type: chat_type(&msg.chat).to_string(),
            },
            content: text.unwrap_or_default().to_string(),
            message_type: match text {
                Some(t) if t.starts_with('/') => "command",
                Some(_) => "text",
                None => "other",
            }
            .to_string(),
            direction: MessageDirection::Incoming,
            created_at: msg.date,
        }
    }
}

fn sender(user: &teloxide::types::User) -> User {
    User {
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

// Channel posts carry no sender.
fn anonymous() -> User {
    User {
        id: 0,
        username: None,
        first_name: None,
        last_name: None,
    }
}

fn chat_type(chat: &teloxide::types::Chat) -> &'static str {
    if chat.is_private() {
        "private"
    } else if chat.is_supergroup() {
        "supergroup"
    } else if chat.is_group() {
        "group"
    } else if chat.is_channel() {
        "channel"
    } else {
        "unknown"
    }
}
