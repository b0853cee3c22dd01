use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Handle used when `BOT_USERNAME` is not set.
pub const DEFAULT_BOT_USERNAME: &str = "@jampacked_bot";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur when loading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { name: &'static str, value: String, reason: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "{name} is not set. Please configure your environment."),
            Self::Invalid { name, value, reason } => {
                write!(f, "invalid value '{value}' for {name}: {reason}")
            }
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub telegram_token: String,
    /// Model credential. `None` puts the responder in "service unavailable" mode.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Mention handle, always starting with `@`.
    pub bot_username: String,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window: Duration,
    pub request_timeout: Duration,
    /// Completion calls allowed in flight before callers queue.
    pub max_in_flight: usize,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    /// Chat that receives WARN/ERROR log lines.
    pub alert_chat_id: Option<i64>,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = get("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let bot_username = get("BOT_USERNAME")
            .map(|u| format!("@{}", u.trim_start_matches('@')))
            .unwrap_or_else(|| DEFAULT_BOT_USERNAME.to_string());
        if bot_username.len() < 2 || bot_username[1..].contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "BOT_USERNAME '{bot_username}' is not a valid handle"
            )));
        }

        let alert_chat_id = match get("ALERT_CHAT_ID") {
            Some(raw) => Some(raw.parse::<i64>().map_err(|e| ConfigError::Invalid {
                name: "ALERT_CHAT_ID",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            telegram_token,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            bot_username,
            rate_limit_max_requests: positive(&get, "RATE_LIMIT_MAX_REQUESTS", 5)? as usize,
            rate_limit_window: Duration::from_secs(positive(&get, "RATE_LIMIT_WINDOW_SECS", 60)?),
            request_timeout: Duration::from_secs(positive(&get, "REQUEST_TIMEOUT_SECS", 30)?),
            max_in_flight: positive(&get, "MAX_IN_FLIGHT", 4)? as usize,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            alert_chat_id,
        })
    }
}

/// Parse an optional integer that must be at least 1.
fn positive<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid { name, value: raw, reason: "must be at least 1".into() }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid { name, value: raw, reason: e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(&[("TELEGRAM_TOKEN", TOKEN)]).expect("should load minimal config");
        assert_eq!(config.telegram_token, TOKEN);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_model, DEFAULT_MODEL);
        assert_eq!(config.openai_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.bot_username, DEFAULT_BOT_USERNAME);
        assert_eq!(config.rate_limit_max_requests, 5);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.alert_chat_id, None);
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(load(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(err, ConfigError::Missing("TELEGRAM_TOKEN"));
        assert!(err.to_string().contains("TELEGRAM_TOKEN is not set"));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", "   ")]));
        assert_eq!(err, ConfigError::Missing("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", "invalid_token_no_colon")]));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", "notanumber:ABCdef")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_invalid_token_format_empty_secret() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", "123456789:")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_api_key_is_unset() {
        let config = load(&[("TELEGRAM_TOKEN", TOKEN), ("OPENAI_API_KEY", "")]).unwrap();
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    fn test_api_key_is_trimmed() {
        let config = load(&[("TELEGRAM_TOKEN", TOKEN), ("OPENAI_API_KEY", " sk-abc \n")]).unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-abc"));
    }

    #[test]
    fn test_bot_username_gets_at_prefix() {
        let config = load(&[("TELEGRAM_TOKEN", TOKEN), ("BOT_USERNAME", "other_bot")]).unwrap();
        assert_eq!(config.bot_username, "@other_bot");

        let config = load(&[("TELEGRAM_TOKEN", TOKEN), ("BOT_USERNAME", "@@other_bot")]).unwrap();
        assert_eq!(config.bot_username, "@other_bot");
    }

    #[test]
    fn test_bot_username_rejects_bare_at() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", TOKEN), ("BOT_USERNAME", "@")]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let config = load(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ])
        .unwrap();
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_numeric_overrides() {
        let config = load(&[
            ("TELEGRAM_TOKEN", TOKEN),
            ("RATE_LIMIT_MAX_REQUESTS", "10"),
            ("RATE_LIMIT_WINDOW_SECS", "120"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("MAX_IN_FLIGHT", "1"),
            ("ALERT_CHAT_ID", "-100123"),
            ("DATA_DIR", "/var/lib/jampacked"),
        ])
        .unwrap();
        assert_eq!(config.rate_limit_max_requests, 10);
        assert_eq!(config.rate_limit_window, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.alert_chat_id, Some(-100123));
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/jampacked"));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", TOKEN), ("RATE_LIMIT_MAX_REQUESTS", "0")]));
        assert!(matches!(err, ConfigError::Invalid { name: "RATE_LIMIT_MAX_REQUESTS", .. }));
    }

    #[test]
    fn test_non_numeric_window_rejected() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", TOKEN), ("RATE_LIMIT_WINDOW_SECS", "a minute")]));
        assert!(matches!(err, ConfigError::Invalid { name: "RATE_LIMIT_WINDOW_SECS", .. }));
        assert!(err.to_string().contains("a minute"));
    }

    #[test]
    fn test_invalid_alert_chat_id() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", TOKEN), ("ALERT_CHAT_ID", "ops")]));
        assert!(matches!(err, ConfigError::Invalid { name: "ALERT_CHAT_ID", .. }));
    }
}
