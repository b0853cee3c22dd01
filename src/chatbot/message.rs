//! Inbound chat events, decoupled from the Telegram types.

use std::fmt;

use teloxide::types::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Multi-user chats where the bot only answers when mentioned.
    pub fn requires_mention(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
        })
    }
}

/// A text message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
    pub username: String,
    pub chat_kind: ChatKind,
    pub text: String,
}

impl ChatEvent {
    /// Extract the fields the bot needs. `None` for messages without text or sender.
    pub fn from_telegram(msg: &Message) -> Option<Self> {
        let user = msg.from.as_ref()?;
        let text = msg.text()?.to_string();

        let chat_kind = if msg.chat.is_private() {
            ChatKind::Private
        } else if msg.chat.is_group() {
            ChatKind::Group
        } else if msg.chat.is_supergroup() {
            ChatKind::Supergroup
        } else {
            ChatKind::Channel
        };

        let username = user
            .username
            .clone()
            .unwrap_or_else(|| user.first_name.clone());

        Some(Self {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0 as i64,
            user_id: user.id.0 as i64,
            username,
            chat_kind,
            text,
        })
    }

    /// First 100 characters, for logs.
    pub fn preview(&self) -> String {
        self.text.chars().take(100).collect()
    }
}
