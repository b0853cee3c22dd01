//! Forwards questions to the completion service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::chatbot::prompt::{CrowdLevel, PromptRequest};
use crate::openai;

/// Sent when no model credential is configured.
pub const UNAVAILABLE_MESSAGE: &str =
    "I can't reach the prediction service right now. Please set OPENAI_API_KEY and try again.";

/// Sent when the completion call fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I couldn't generate a response just now. Please try again later.";

/// A text completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: &PromptRequest) -> Result<String, openai::Error>;
}

#[async_trait]
impl Completion for openai::Client {
    async fn complete(&self, request: &PromptRequest) -> Result<String, openai::Error> {
        self.chat(request.system(), request.user()).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    /// No credential configured; no call was attempted.
    Unavailable,
    Backend(openai::Error),
}

impl ForecastError {
    /// Reply sent to the user in place of a forecast.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unavailable => UNAVAILABLE_MESSAGE,
            Self::Backend(_) => APOLOGY_MESSAGE,
        }
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "completion service not configured"),
            Self::Backend(e) => write!(f, "completion failed: {e}"),
        }
    }
}

impl std::error::Error for ForecastError {}

impl From<openai::Error> for ForecastError {
    fn from(e: openai::Error) -> Self {
        Self::Backend(e)
    }
}

/// Builds the prompt and calls the backend, at most `max_in_flight` calls at once.
pub struct Responder {
    backend: Option<Arc<dyn Completion>>,
    permits: Semaphore,
}

impl Responder {
    pub fn new(backend: Option<Arc<dyn Completion>>, max_in_flight: usize) -> Self {
        Self {
            backend,
            permits: Semaphore::new(max_in_flight.max(1)),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Ask the model about `question`. An empty string means the service returned no content.
    pub async fn respond(&self, question: &str) -> Result<String, ForecastError> {
        let Some(ref backend) = self.backend else {
            return Err(ForecastError::Unavailable);
        };

        let request = PromptRequest::new(question);

        if self.permits.available_permits() == 0 {
            info!("⏳ Completion calls saturated, queueing");
        }
        // The semaphore is never closed
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ForecastError::Unavailable)?;

        let text = backend.complete(&request).await?;
        match CrowdLevel::find_in(&text) {
            Some(level) => debug!("Forecast crowd level: {level}"),
            None => debug!("Forecast without a crowd level ({} chars)", text.len()),
        }
        Ok(text)
    }
}
