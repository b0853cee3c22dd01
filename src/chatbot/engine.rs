//! Chatbot engine - routes chat events to the rate limiter, sanitizer and responder.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::chatbot::commands::{Command, HELP_TEXT};
use crate::chatbot::message::{ChatEvent, ChatKind};
use crate::chatbot::responder::{ForecastError, Responder};
use crate::chatbot::telegram::ReplySink;
use crate::rate_limit::RateLimiter;
use crate::sanitizer::{sanitize, SanitizeError};

/// Reply when a user exceeds the rate limit.
pub const THROTTLE_MESSAGE: &str =
    "Easy nuh! You're sending questions too quickly. Please wait a minute and try again.";

/// What the engine did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to the bot; nothing sent.
    Ignored,
    /// Help text sent.
    Help,
    Throttled,
    Rejected(SanitizeError),
    /// Forecast sent.
    Answered,
    /// The model returned no text; nothing sent.
    Empty,
    /// Fallback text sent in place of a forecast.
    Failed(ForecastError),
}

/// The chatbot engine.
pub struct ForecastEngine {
    /// Matches the bot's handle anywhere in a message, any case, but not as
    /// the prefix of a longer handle.
    mention: Regex,
    limiter: RateLimiter,
    responder: Responder,
    transport: Arc<dyn ReplySink>,
}

impl ForecastEngine {
    pub fn new(
        bot_handle: &str,
        limiter: RateLimiter,
        responder: Responder,
        transport: Arc<dyn ReplySink>,
    ) -> Result<Self, regex::Error> {
        let mention = Regex::new(&format!(r"(?i){}\b", regex::escape(bot_handle)))?;
        Ok(Self {
            mention,
            limiter,
            responder,
            transport,
        })
    }

    /// Handle one of the bot commands.
    pub async fn handle_command(&self, event: &ChatEvent, command: Command) -> Outcome {
        info!("⌨️ /{:?} from {} ({}) in {}", command, event.username, event.user_id, event.chat_kind);

        let Some(question) = command.fixed_question() else {
            self.reply(event, HELP_TEXT).await;
            return Outcome::Help;
        };

        // Fixed questions are trusted text, but still cost a completion
        if self.limiter.is_rate_limited(event.user_id) {
            return self.throttle(event).await;
        }

        self.transport.send_typing(event.chat_id).await;
        let result = self.responder.respond(question).await;
        self.deliver(event, result).await
    }

    /// Handle a free-text message.
    pub async fn handle_text(&self, event: &ChatEvent) -> Outcome {
        info!(
            "📨 User {} ({}) in {}: \"{}\"",
            event.username,
            event.user_id,
            event.chat_kind,
            event.preview()
        );

        if event.chat_kind == ChatKind::Channel {
            return Outcome::Ignored;
        }

        let text = if event.chat_kind.requires_mention() {
            if !self.mention.is_match(&event.text) {
                debug!("Not mentioned in chat {}, ignoring", event.chat_id);
                return Outcome::Ignored;
            }
            self.mention.replace_all(&event.text, "").trim().to_string()
        } else {
            event.text.clone()
        };

        if self.limiter.is_rate_limited(event.user_id) {
            return self.throttle(event).await;
        }

        let question = match sanitize(&text) {
            Ok(q) => q,
            Err(e) => {
                debug!("Rejected input from {}: {e}", event.user_id);
                self.reply(event, e.user_message()).await;
                return Outcome::Rejected(e);
            }
        };

        self.transport.send_typing(event.chat_id).await;
        let result = self.responder.respond(question.as_str()).await;
        self.deliver(event, result).await
    }

    async fn throttle(&self, event: &ChatEvent) -> Outcome {
        info!(
            "🐢 Rate limited {} ({}), window {}s",
            event.username,
            event.user_id,
            self.limiter.window().as_secs()
        );
        self.reply(event, THROTTLE_MESSAGE).await;
        Outcome::Throttled
    }

    async fn deliver(&self, event: &ChatEvent, result: Result<String, ForecastError>) -> Outcome {
        match result {
            Ok(text) if text.trim().is_empty() => {
                warn!("Empty completion for {} ({}), nothing sent", event.username, event.user_id);
                Outcome::Empty
            }
            Ok(text) => {
                info!("🤖 Bot response: \"{}\"", text.chars().take(100).collect::<String>());
                self.reply(event, &text).await;
                Outcome::Answered
            }
            Err(e) => {
                match e {
                    ForecastError::Unavailable => {
                        warn!("OpenAI API key is not configured; returning fallback message.")
                    }
                    ForecastError::Backend(ref inner) => error!("OpenAI request failed: {inner}"),
                }
                self.reply(event, e.user_message()).await;
                Outcome::Failed(e)
            }
        }
    }

    async fn reply(&self, event: &ChatEvent, text: &str) {
        // Send failures are already logged by the transport
        let _ = self
            .transport
            .send_text(event.chat_id, text, Some(event.message_id))
            .await;
    }
}
