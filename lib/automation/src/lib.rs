//! Saving workflows for loanshark.
//!
//! A save persists the workflow, brings the notification backend's
//! subscriber record in line with the workflow's notification actions, and
//! for top-up automations registers the position on-chain.

pub mod deep_link;
pub mod error;
pub mod save;

pub use deep_link::{DeepLinkOpener, RecordingOpener, TelegramConfig, telegram_start_link};
pub use error::SaveError;
pub use save::{NotificationSync, SaveOrchestrator, SaveOutcome, SaveRequest};
