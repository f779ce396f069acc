//! The subscriber notification record.

use loanshark_core::WorkflowKey;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Account prefix identifying Ethereum mainnet accounts.
const MAINNET_ACCOUNT_PREFIX: &str = "eip155:1:";

/// Condition name seeded from the trigger's borrow limit.
pub const BORROW_LIMIT_OVER: &str = "borrowLimitOver";

/// Whether a record or channel is enabled.
///
/// The backend writes a disabled status as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// Enabled.
    #[serde(rename = "on")]
    On,
    /// Not enabled.
    #[default]
    #[serde(rename = "", alias = "off")]
    Off,
}

/// A threshold the backend watches for the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition name.
    pub condition: String,
    /// Threshold value, as entered on the trigger.
    #[serde(default)]
    pub value: JsonValue,
}

impl Condition {
    /// Creates a `borrowLimitOver` condition.
    #[must_use]
    pub fn borrow_limit_over(value: JsonValue) -> Self {
        Self {
            condition: BORROW_LIMIT_OVER.to_string(),
            value,
        }
    }
}

/// Telegram channel preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramNotification {
    /// Channel status.
    #[serde(default)]
    pub status: SubscriptionStatus,
    /// Chat bound by the bot once the user follows the deep link.
    #[serde(default)]
    pub chat_id: String,
    /// Telegram username.
    #[serde(default)]
    pub username: String,
}

/// Email channel preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    /// Channel status.
    #[serde(default)]
    pub status: SubscriptionStatus,
    /// Recipients.
    #[serde(default)]
    pub to_list: String,
    /// Copied recipients.
    #[serde(default)]
    pub cc_list: String,
}

/// Discord channel preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordNotification {
    /// Channel status.
    #[serde(default)]
    pub status: SubscriptionStatus,
    /// Channel the bot posts to.
    #[serde(default)]
    pub chat_id: String,
    /// Discord user id.
    #[serde(default)]
    pub client_id: String,
}

/// Per-channel preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Telegram.
    #[serde(default)]
    pub telegram: TelegramNotification,
    /// Email.
    #[serde(default)]
    pub email: EmailNotification,
    /// Discord.
    #[serde(default)]
    pub discord: DiscordNotification,
}

/// Notification preferences of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberInformation {
    /// Account address the notifications concern.
    #[serde(default)]
    pub address: String,
    /// Record status.
    #[serde(default)]
    pub status: SubscriptionStatus,
    /// Key of the workflow owning the record.
    pub key: WorkflowKey,
    /// Watched conditions.
    #[serde(default)]
    pub condition: Vec<Condition>,
    /// Channel preferences.
    #[serde(default)]
    pub notification: Notification,
}

impl SubscriberInformation {
    /// Creates a record with every field empty.
    #[must_use]
    pub fn empty(key: WorkflowKey) -> Self {
        Self {
            address: String::new(),
            status: SubscriptionStatus::Off,
            key,
            condition: Vec::new(),
            notification: Notification::default(),
        }
    }

    /// Creates an enabled record for a newly saved workflow.
    ///
    /// `account` may carry the `eip155:1:` chain prefix; it is stripped.
    #[must_use]
    pub fn new(key: WorkflowKey, account: &str, condition: Vec<Condition>) -> Self {
        Self {
            address: account_address(account).to_string(),
            status: SubscriptionStatus::On,
            key,
            condition,
            notification: Notification::default(),
        }
    }
}

/// Strips the mainnet chain prefix from an account identifier.
#[must_use]
pub fn account_address(account: &str) -> &str {
    account.strip_prefix(MAINNET_ACCOUNT_PREFIX).unwrap_or(account)
}
