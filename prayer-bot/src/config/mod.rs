//! Bot configuration, read once from the environment and the credential source at startup.
//!
//! The resulting [`BotConfig`] is immutable and handed to the components that need it.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use pbot_telegram::RuntimeOptions;
use reqwest::Url;
use thiserror::Error;

use crate::secrets::{ClientSecret, EnvSecretProvider, FileSecretProvider, SecretProvider};

pub const DEFAULT_TIMETABLE_URL: &str = "https://umma.ru/raspisanie-namaza/moscow";
pub const DEFAULT_LOG_FILE: &str = "logs/prayer-bot.log";

/// Startup configuration failures. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("cannot read credential file {path}: {source}")]
    CredentialFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed client secret in {origin}: {reason}")]
    MalformedSecret { origin: String, reason: String },
}

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match var(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name: name.to_string(),
                reason: format!("expected a boolean, got {:?}", v),
            }),
        },
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// `DATABASE_URL`, required.
pub fn database_url_from_env() -> Result<String, ConfigError> {
    var("DATABASE_URL").ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))
}

/// Picks the credential source: `CREDENTIALS_FILE` wins over inline `CLIENT_SECRET_JSON`.
pub fn secret_provider_from_env() -> Result<Box<dyn SecretProvider>, ConfigError> {
    if let Some(path) = var("CREDENTIALS_FILE") {
        return Ok(Box::new(FileSecretProvider::new(path)));
    }
    if var("CLIENT_SECRET_JSON").is_some() {
        return Ok(Box::new(EnvSecretProvider::new("CLIENT_SECRET_JSON")));
    }
    Err(ConfigError::Missing("CREDENTIALS_FILE".to_string()))
}

#[derive(Clone)]
pub struct BotConfig {
    /// TELEGRAM_BOT_TOKEN or BOT_TOKEN
    pub bot_token: String,
    /// DATABASE_URL
    pub database_url: String,
    pub client_secret: ClientSecret,
    /// Where `client_secret` was read from
    pub secret_origin: String,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<Url>,
    pub log_file: String,
    /// Only this chat may /broadcast
    pub admin_chat_id: Option<i64>,
    pub timetable_url: Url,
    /// Attach an OAuth bearer token to timetable requests
    pub timetable_authorized: bool,
    /// Time zone the timetable is published in
    pub utc_offset: FixedOffset,
    pub max_reconnect_attempts: usize,
    pub reconnect_backoff_ms: u64,
    pub poll_timeout_secs: u32,
    /// Deadline for timetable and OAuth requests
    pub http_timeout: Duration,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("client_secret", &self.client_secret)
            .field("secret_origin", &self.secret_origin)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("log_file", &self.log_file)
            .field("admin_chat_id", &self.admin_chat_id)
            .field("timetable_url", &self.timetable_url)
            .field("timetable_authorized", &self.timetable_authorized)
            .field("utc_offset", &self.utc_offset)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_backoff_ms", &self.reconnect_backoff_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl BotConfig {
    /// Loads from the environment. `token` (e.g. from the CLI) overrides TELEGRAM_BOT_TOKEN.
    pub fn from_env(token: Option<String>) -> Result<Self, ConfigError> {
        let provider = secret_provider_from_env()?;
        Self::load_with(token, provider.as_ref())
    }

    /// Loads everything except the client secret from the environment; the secret comes from `secrets`.
    pub fn load_with(token: Option<String>, secrets: &dyn SecretProvider) -> Result<Self, ConfigError> {
        let bot_token = token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| var("TELEGRAM_BOT_TOKEN"))
            .or_else(|| var("BOT_TOKEN"))
            .ok_or_else(|| ConfigError::Missing("TELEGRAM_BOT_TOKEN".to_string()))?;
        let database_url = database_url_from_env()?;
        let client_secret = secrets.client_secret()?;

        let telegram_api_url = match var("TELEGRAM_API_URL").or_else(|| var("TELOXIDE_API_URL")) {
            Some(raw) => Some(parse_url("TELEGRAM_API_URL", &raw)?),
            None => None,
        };
        let timetable_url = parse_url(
            "TIMETABLE_URL",
            &var("TIMETABLE_URL").unwrap_or_else(|| DEFAULT_TIMETABLE_URL.to_string()),
        )?;

        let admin_chat_id = match var("ADMIN_CHAT_ID") {
            Some(_) => Some(parse_var("ADMIN_CHAT_ID", 0i64)?),
            None => None,
        };

        let offset_minutes: i32 = parse_var("UTC_OFFSET_MINUTES", 180)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                name: "UTC_OFFSET_MINUTES".to_string(),
                reason: format!("{} is not a valid UTC offset", offset_minutes),
            })?;

        let max_reconnect_attempts: usize = parse_var("MAX_RECONNECT_ATTEMPTS", 5)?;
        if max_reconnect_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_RECONNECT_ATTEMPTS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let http_timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS", 30)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bot_token,
            database_url,
            client_secret,
            secret_origin: secrets.describe(),
            telegram_api_url,
            log_file: var("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            admin_chat_id,
            timetable_url,
            timetable_authorized: parse_bool("TIMETABLE_AUTHORIZED", false)?,
            utc_offset,
            max_reconnect_attempts,
            reconnect_backoff_ms: parse_var("RECONNECT_BACKOFF_MS", 500)?,
            poll_timeout_secs: parse_var("POLL_TIMEOUT_SECS", 10)?,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            max_reconnect_attempts: self.max_reconnect_attempts,
            backoff_factor_ms: self.reconnect_backoff_ms,
            max_backoff: Duration::from_secs(30),
        }
    }
}
