//! Centralized CLI configuration.
//!
//! Loaded via the `config` crate from environment variables, with nested
//! sections separated by `__` (e.g. `NOTIFICATION__BASE_URL`).

use loanshark_automation::TelegramConfig;
use loanshark_chain::ChainConfig;
use loanshark_notification::NotificationApiConfig;
use serde::Deserialize;

/// CLI configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    /// PostgreSQL connection URL. Workflows are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Notification backend.
    #[serde(default)]
    pub notification: NotificationApiConfig,

    /// Telegram bot.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Chain endpoint.
    #[serde(default)]
    pub chain: ChainConfig,
}

impl CliConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its field.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_uses_defaults() {
        let config: CliConfig = config::Config::builder()
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert!(config.database_url.is_none());
        assert_eq!(config.notification.timeout_secs, 30);
        assert_eq!(config.chain.receipt_poll_interval_ms, 1_000);
    }

    #[test]
    fn nested_overrides_apply() {
        let config: CliConfig = config::Config::builder()
            .set_override("telegram.bot_url", "https://t.me/OtherBot")
            .expect("override")
            .set_override("chain.rpc_url", "http://node:8545")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(config.telegram.bot_url, "https://t.me/OtherBot");
        assert_eq!(config.chain.rpc_url, "http://node:8545");
        assert_eq!(config.notification.base_url, "http://localhost:8080");
    }
}
