use std::time::Duration;

use serde::{Deserialize, Serialize};

pub struct Client {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl Client {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            api_key,
            model,
            base_url,
            http,
        })
    }

    /// Run a system + user chat completion and return the first choice's text.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.model,
            messages: [
                ApiMessage { role: "system", content: system },
                ApiMessage { role: "user", content: user },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), &body));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Http(e.to_string())
            }
        })?;
        parse_completion(&body)
    }
}

fn parse_completion(body: &str) -> Result<String, Error> {
    let parsed: ApiResponse = serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

fn error_from_status(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect());

    if status == 429 {
        Error::Quota(message)
    } else {
        Error::Api { status, message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Http(String),
    Timeout,
    Api { status: u16, message: String },
    /// Rate limited or out of credit (HTTP 429).
    Quota(String),
    Parse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Timeout => write!(f, "request timed out"),
            Error::Api { status, message } => write!(f, "API error {status}: {message}"),
            Error::Quota(e) => write!(f, "quota exceeded: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for Error {}
