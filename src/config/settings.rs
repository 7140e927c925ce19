//! Environment settings and Telegram credentials.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Telegram Bot API credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Token issued by `@BotFather`.
    pub bot_token: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        if !bot_token.contains(':') {
            return Err(ConfigError::InvalidBotToken);
        }

        Ok(Self { bot_token })
    }
}

/// Runtime tuning read from the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the bot configuration JSON file.
    pub config_path: PathBuf,

    /// OAuth access token for the Sheets API. Used for investor sheet reads
    /// and import writes; `None` disables the writes.
    #[serde(default, skip_serializing)]
    pub sheets_access_token: Option<String>,

    /// Delay between successful poll cycles in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// First delay after a failed poll cycle in seconds.
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    /// Upper bound for the failure delay in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Timeout of a single sheet request in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Minimum gap between outgoing messages in milliseconds.
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("bot_config.json")
}

fn default_poll_interval() -> u64 {
    7
}

fn default_error_backoff() -> u64 {
    10
}

fn default_max_backoff() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_send_interval() -> u64 {
    50 // stays well under the Bot API's 30 messages per second
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("config_path", &self.config_path)
            .field("writes_enabled", &self.sheets_access_token.is_some())
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("error_backoff_secs", &self.error_backoff_secs)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("send_interval_ms", &self.send_interval_ms)
            .finish_non_exhaustive()
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            sheets_access_token: None,
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
            max_backoff_secs: default_max_backoff(),
            fetch_timeout_secs: default_fetch_timeout(),
            send_interval_ms: default_send_interval(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    ///
    /// Unset or unparsable numbers fall back to their defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            config_path: std::env::var("BOT_CONFIG")
                .map_or_else(|_| default_config_path(), PathBuf::from),
            sheets_access_token: std::env::var("SHEETS_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            poll_interval_secs: parse_or(
                std::env::var("POLL_INTERVAL_SECS").ok(),
                default_poll_interval(),
            ),
            error_backoff_secs: parse_or(
                std::env::var("ERROR_BACKOFF_SECS").ok(),
                default_error_backoff(),
            ),
            max_backoff_secs: parse_or(
                std::env::var("MAX_BACKOFF_SECS").ok(),
                default_max_backoff(),
            ),
            fetch_timeout_secs: parse_or(
                std::env::var("FETCH_TIMEOUT_SECS").ok(),
                default_fetch_timeout(),
            ),
            send_interval_ms: parse_or(
                std::env::var("SEND_INTERVAL_MS").ok(),
                default_send_interval(),
            ),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    /// Never shorter than the initial backoff.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(self.error_backoff_secs))
    }

    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

/// Parses a positive integer, falling back to `default`.
fn parse_or(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid bot token format (expected <id>:<secret>)")]
    InvalidBotToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_secs(7));
        assert_eq!(settings.error_backoff(), Duration::from_secs(10));
        assert_eq!(settings.max_backoff(), Duration::from_secs(60));
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(10));
        assert!(settings.sheets_access_token.is_none());
    }

    #[test]
    fn test_max_backoff_never_below_initial() {
        let settings = BotSettings {
            error_backoff_secs: 90,
            max_backoff_secs: 30,
            ..BotSettings::default()
        };
        assert_eq!(settings.max_backoff(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(Some(" 15 ".to_owned()), 7), 15);
        assert_eq!(parse_or(Some("abc".to_owned()), 7), 7);
        assert_eq!(parse_or(Some("0".to_owned()), 7), 7);
        assert_eq!(parse_or(None, 7), 7);
    }

    #[test]
    fn test_debug_hides_token() {
        let config = TelegramConfig::new("123:secret".to_owned());
        assert!(!format!("{config:?}").contains("secret"));
    }
}
