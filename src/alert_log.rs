//! Tracing layer that forwards warnings and errors to an operator chat.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Lines queued before new ones are dropped.
const QUEUE_CAPACITY: usize = 256;

/// Warnings buffered before an early flush.
const MAX_BUFFERED_WARNINGS: usize = 20;

const FLUSH_INTERVAL: Duration = Duration::from_secs(10);

static TELEGRAM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{6,12}:[A-Za-z0-9_-]{30,}").expect("token pattern is valid"));

static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsk-[A-Za-z0-9_-]{8,}").expect("api key pattern is valid"));

enum AlertMessage {
    /// Sent immediately.
    Error(String),
    /// Batched and sent periodically.
    Warning(String),
}

pub struct AlertLayer {
    tx: mpsc::Sender<AlertMessage>,
}

impl AlertLayer {
    /// Start the sender task. Must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::channel::<AlertMessage>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            let mut warnings: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(AlertMessage::Error(text)) => send_alert(&bot, chat_id, &text).await,
                            Some(AlertMessage::Warning(text)) => {
                                warnings.push(text);
                                if warnings.len() >= MAX_BUFFERED_WARNINGS {
                                    flush(&bot, chat_id, &mut warnings).await;
                                }
                            }
                            None => {
                                flush(&bot, chat_id, &mut warnings).await;
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => flush(&bot, chat_id, &mut warnings).await,
                }
            }
        });

        Self { tx }
    }
}

/// Mask bot tokens and API keys.
pub fn redact(text: &str) -> String {
    let text = TELEGRAM_TOKEN.replace_all(text, "[TELEGRAM_TOKEN]");
    API_KEY.replace_all(&text, "[API_KEY]").into_owned()
}

async fn send_alert(bot: &Bot, chat_id: ChatId, text: &str) {
    let text = if text.chars().count() > 4000 {
        let truncated: String = text.chars().take(4000).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    };
    // Not through tracing, or a failing send would feed itself
    if let Err(e) = bot.send_message(chat_id, text).await {
        eprintln!("Failed to send alert to Telegram: {e}");
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_alert(bot, chat_id, &combined).await;
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let fields = std::mem::take(&mut self.message);
            self.message = format!("{value:?}");
            if !fields.is_empty() {
                self.message.push_str(&format!(" ({fields})"));
            }
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message.push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

/// Render an event as a single alert line, or `None` below WARN.
fn format_event(level: Level, target: &str, message: &str) -> Option<AlertMessage> {
    let line = redact(&format!("{target}: {message}"));
    match level {
        Level::ERROR => Some(AlertMessage::Error(format!("❌ {line}"))),
        Level::WARN => Some(AlertMessage::Warning(format!("⚠️ {line}"))),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for AlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let Some(msg) = format_event(*metadata.level(), metadata.target(), &visitor.message) else {
            return;
        };
        if self.tx.try_send(msg).is_err() {
            eprintln!("Alert queue full or closed, message dropped");
        }
    }
}
