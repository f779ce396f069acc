//! Telegram bot deep links.
//!
//! A Telegram subscription is only complete once the user starts the bot
//! with the workflow key, which lets the bot bind its chat to the record.

use loanshark_core::WorkflowKey;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// URL of the notification bot.
    #[serde(default = "default_bot_url")]
    pub bot_url: String,
}

fn default_bot_url() -> String {
    "https://t.me/LoansharkBot".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_url: default_bot_url(),
        }
    }
}

/// Builds the link starting the bot for a workflow.
#[must_use]
pub fn telegram_start_link(bot_url: &str, key: &WorkflowKey) -> String {
    format!("{bot_url}?start={key}")
}

/// Hands a link to the user.
pub trait DeepLinkOpener: Send + Sync {
    /// Opens the link.
    fn open(&self, url: &str);
}

/// [`DeepLinkOpener`] that keeps the links it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingOpener {
    /// Creates an opener with no links.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the links opened so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeepLinkOpener for RecordingOpener {
    fn open(&self, url: &str) {
        info!(url, "deep link ready");
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
