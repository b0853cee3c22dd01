//! Chatbot module - answers crowd-level questions about Jamaican towns.

pub mod commands;
pub mod engine;
pub mod message;
pub mod prompt;
pub mod responder;
pub mod telegram;


pub use commands::Command;
pub use engine::ForecastEngine;
pub use message::ChatEvent;
pub use responder::{Completion, Responder};
pub use telegram::TelegramClient;
