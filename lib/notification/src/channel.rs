//! Notification channels configured as workflow actions.

use crate::subscriber::{SubscriberInformation, SubscriptionStatus};
use loanshark_workflow::{Step, Workflow};

/// A notification channel and the values its action step carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationChannel {
    /// Telegram bot messages.
    Telegram {
        /// Telegram username.
        username: String,
    },
    /// Email.
    Email {
        /// Recipients.
        to_list: String,
    },
    /// Discord messages.
    Discord {
        /// Discord user id.
        client_id: String,
    },
}

impl NotificationChannel {
    /// Connector key of Telegram actions.
    pub const TELEGRAM: &'static str = "telegram";
    /// Connector key of Email actions.
    pub const EMAIL: &'static str = "email";
    /// Connector key of Discord actions.
    pub const DISCORD: &'static str = "discord";

    /// Reads the channel configured by an action step.
    ///
    /// Returns `None` for steps of any other connector.
    #[must_use]
    pub fn from_step(step: &Step) -> Option<Self> {
        let text = |key: &str| step.input_text(key).unwrap_or_default();
        match step.connector.as_str() {
            Self::TELEGRAM => Some(Self::Telegram {
                username: text("username"),
            }),
            Self::EMAIL => Some(Self::Email {
                to_list: text("toList"),
            }),
            Self::DISCORD => Some(Self::Discord {
                client_id: text("userId"),
            }),
            _ => None,
        }
    }

    /// Reads every notification channel among a workflow's actions, in order.
    #[must_use]
    pub fn from_workflow(workflow: &Workflow) -> Vec<Self> {
        workflow.actions.iter().filter_map(Self::from_step).collect()
    }

    /// Returns the connector key of the channel.
    #[must_use]
    pub fn connector(&self) -> &'static str {
        match self {
            Self::Telegram { .. } => Self::TELEGRAM,
            Self::Email { .. } => Self::EMAIL,
            Self::Discord { .. } => Self::DISCORD,
        }
    }

    /// Returns true if the user must open the Telegram bot to bind a chat.
    #[must_use]
    pub fn requires_bot_redirect(&self) -> bool {
        matches!(self, Self::Telegram { .. })
    }

    /// Enables the channel on a record and writes its fields.
    ///
    /// Chat bindings are reset; the bot re-binds them when the user follows
    /// the deep link. Other channels are left untouched.
    pub fn apply(&self, record: &mut SubscriberInformation) {
        let notification = &mut record.notification;
        match self {
            Self::Telegram { username } => {
                notification.telegram.status = SubscriptionStatus::On;
                notification.telegram.chat_id.clear();
                notification.telegram.username.clone_from(username);
            }
            Self::Email { to_list } => {
                notification.email.status = SubscriptionStatus::On;
                notification.email.to_list.clone_from(to_list);
                notification.email.cc_list.clear();
            }
            Self::Discord { client_id } => {
                notification.discord.status = SubscriptionStatus::On;
                notification.discord.chat_id.clear();
                notification.discord.client_id.clone_from(client_id);
            }
        }
    }
}
