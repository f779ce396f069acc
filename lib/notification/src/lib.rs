//! Notification preferences for loanshark workflows.
//!
//! Each saved workflow with a Telegram, Email or Discord action owns one
//! [`SubscriberInformation`] record held by a remote notification backend.
//! [`NotificationChannel`] turns an action step into the fields it contributes
//! to that record, and [`NotificationApi`] is the seam to the backend.

pub mod channel;
pub mod client;
pub mod error;
pub mod memory;
pub mod subscriber;

pub use channel::NotificationChannel;
pub use client::{ApiResponse, HttpNotificationClient, NotificationApi, NotificationApiConfig};
pub use error::NotificationError;
pub use memory::{ApiCall, InMemoryNotificationApi};
pub use subscriber::{
    Condition, DiscordNotification, EmailNotification, Notification, SubscriberInformation,
    SubscriptionStatus, TelegramNotification,
};
