//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId, ReplyParameters};
use tracing::warn;

/// Longest reply sent; Telegram rejects messages over 4096 characters.
pub const MAX_REPLY_CHARS: usize = 4000;

/// Where replies go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send `text` to `chat_id`, optionally quoting a message. Returns the new message id.
    async fn send_text(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, String>;

    /// Show a "typing…" indicator. Best effort.
    async fn send_typing(&self, _chat_id: i64) {}
}

/// Cut `text` to [`MAX_REPLY_CHARS`], marking the cut with an ellipsis.
pub fn truncate_reply(text: &str) -> String {
    if text.chars().count() > MAX_REPLY_CHARS {
        let truncated: String = text.chars().take(MAX_REPLY_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, String> {
        let text = truncate_reply(text);
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(msg_id) = reply_to {
            // Still deliver if the quoted message was deleted meanwhile
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32)).allow_sending_without_reply();
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn send_typing(&self, chat_id: i64) {
        if let Err(e) = self.bot.send_chat_action(ChatId(chat_id), ChatAction::Typing).await {
            warn!("Failed to send typing action: {e}");
        }
    }
}
