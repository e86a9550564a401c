use thiserror::Error;

const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OMDB_URL: &str = "https://www.omdbapi.com/";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("TELEGRAM_TOKEN is malformed, expected <bot id>:<secret>")]
    MalformedToken,

    #[error("PORT is not a valid port number: {0}")]
    InvalidPort(String),
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_token: String,
    /// Numeric prefix of the bot token. Incoming webhooks must address this bot.
    pub bot_id: String,
    pub omdb_api_key: String,
    pub webhook_url: Option<String>,
    pub bind_addr: String,
    pub omdb_base_url: String,
    pub telegram_api_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = var("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        let omdb_api_key = var("OMDB_API_KEY").ok_or(ConfigError::Missing("OMDB_API_KEY"))?;
        let bot_id = bot_id(&telegram_token)?;

        let bind_addr = match (var("BIND_ADDR"), var("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
                format!("{DEFAULT_BIND_HOST}:{port}")
            }
            (None, None) => format!("{DEFAULT_BIND_HOST}:{DEFAULT_PORT}"),
        };

        Ok(Self {
            telegram_token,
            bot_id,
            omdb_api_key,
            webhook_url: var("WEBHOOK_URL").map(|url| url.trim_end_matches('/').to_string()),
            bind_addr,
            omdb_base_url: var("OMDB_BASE_URL").unwrap_or_else(|| DEFAULT_OMDB_URL.to_string()),
            telegram_api_url: var("TELEGRAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
        })
    }

    /// Public URL Telegram should post updates to, when a base URL is configured.
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_ref()
            .map(|base| format!("{base}/webhook/{}", self.bot_id))
    }
}

fn bot_id(token: &str) -> Result<String, ConfigError> {
    match token.split_once(':') {
        Some((id, secret))
            if !id.is_empty() && !secret.is_empty() && id.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(id.to_string())
        }
        _ => Err(ConfigError::MalformedToken),
    }
}
