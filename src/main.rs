mod alert_log;
mod chatbot;
mod config;
mod openai;
mod rate_limit;
mod sanitizer;

use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;

use chatbot::{ChatEvent, Command, Completion, ForecastEngine, Responder, TelegramClient};
use config::Config;
use rate_limit::RateLimiter;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            error!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    let log_file = std::fs::create_dir_all(&log_dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("jampacked.log"))
    });
    let (file_writer, _guard) = match log_file {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        Err(ref e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            (None, None)
        }
    };

    let alert_layer = config
        .alert_chat_id
        .map(|chat_id| alert_log::AlertLayer::new(bot.clone(), ChatId(chat_id)));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                )
        }))
        .with(alert_layer)
        .init();

    info!("🚀 Starting bot ...");

    match bot.get_me().await {
        Ok(me) => {
            let actual = format!("@{}", me.username());
            info!("Bot user ID: {}, username: {}", me.id, actual);
            if !actual.eq_ignore_ascii_case(&config.bot_username) {
                warn!(
                    "BOT_USERNAME is {} but Telegram reports {}; group mentions use {}",
                    config.bot_username, actual, config.bot_username
                );
            }
        }
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let backend: Option<Arc<dyn Completion>> = match config.openai_api_key.clone() {
        Some(key) => match openai::Client::new(
            key,
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.request_timeout,
        ) {
            Ok(client) => {
                info!("Completion model: {}", config.openai_model);
                Some(Arc::new(client) as Arc<dyn Completion>)
            }
            Err(e) => {
                error!("Failed to build completion client: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let responder = Responder::new(backend, config.max_in_flight);
    if !responder.is_available() {
        warn!("OPENAI_API_KEY is not set; every question will get the service-unavailable reply.");
    }
    let limiter = RateLimiter::in_memory(config.rate_limit_max_requests, config.rate_limit_window);
    let telegram = Arc::new(TelegramClient::new(bot.clone()));
    let engine = match ForecastEngine::new(&config.bot_username, limiter, responder, telegram) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Invalid bot handle {}: {e}", config.bot_username);
            std::process::exit(1);
        }
    };

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text));

    info!("Polling ...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(msg: Message, cmd: Command, engine: Arc<ForecastEngine>) -> ResponseResult<()> {
    let Some(event) = ChatEvent::from_telegram(&msg) else {
        return Ok(());
    };
    let outcome = engine.handle_command(&event, cmd).await;
    debug!("/{:?} in chat {} → {:?}", cmd, event.chat_id, outcome);
    Ok(())
}

async fn handle_text(msg: Message, engine: Arc<ForecastEngine>) -> ResponseResult<()> {
    let Some(event) = ChatEvent::from_telegram(&msg) else {
        return Ok(());
    };
    // Commands this bot doesn't know, or ones addressed to other bots
    if event.text.starts_with('/') {
        debug!("Ignoring unknown command in chat {}", event.chat_id);
        return Ok(());
    }
    let outcome = engine.handle_text(&event).await;
    debug!("Message {} in chat {} → {:?}", event.message_id, event.chat_id, outcome);
    Ok(())
}
