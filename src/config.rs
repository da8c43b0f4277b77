//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token. `None` disables the Telegram channel.
    pub telegram_token: Option<String>,
    /// Telegram usernames / numeric IDs allowed to talk to the bot.
    /// `"*"` allows everyone.
    pub allowed_users: Vec<String>,
    /// Sessions idle longer than this are pruned (equivalent to cancel).
    pub session_idle_timeout: Duration,
    /// Maximum number of documents returned by /history.
    pub history_limit: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            allowed_users: vec!["*".to_string()],
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            history_limit: 10,
        }
    }
}

impl BotConfig {
    /// Build the configuration from environment variables.
    ///
    /// `TELEGRAM_BOT_TOKEN` and `TELEGRAM_ALLOWED_USERS` control the Telegram
    /// channel; `DOCUGEN_SESSION_TIMEOUT_SECS` and `DOCUGEN_HISTORY_LIMIT`
    /// override the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();

        let allowed_users: Vec<String> = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session_idle_timeout = match std::env::var("DOCUGEN_SESSION_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DOCUGEN_SESSION_TIMEOUT_SECS".into(),
                    message: format!("expected an integer number of seconds, got {raw:?}"),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => defaults.session_idle_timeout,
        };

        let history_limit = match std::env::var("DOCUGEN_HISTORY_LIMIT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DOCUGEN_HISTORY_LIMIT".into(),
                message: format!("expected an integer, got {raw:?}"),
            })?,
            Err(_) => defaults.history_limit,
        };

        Ok(Self {
            telegram_token,
            allowed_users,
            session_idle_timeout,
            history_limit,
        })
    }
}
