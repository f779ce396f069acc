//! Error types for the notification crate.

use std::fmt;

/// Errors talking to the notification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The HTTP client could not be built.
    ClientBuild { reason: String },
    /// The request did not complete.
    RequestFailed { endpoint: String, reason: String },
    /// The backend answered with a non-success status.
    UnexpectedStatus { endpoint: String, status: u16 },
    /// The response body could not be decoded.
    InvalidResponse { endpoint: String, reason: String },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBuild { reason } => {
                write!(f, "failed to build notification client: {reason}")
            }
            Self::RequestFailed { endpoint, reason } => {
                write!(f, "notification request to {endpoint} failed: {reason}")
            }
            Self::UnexpectedStatus { endpoint, status } => {
                write!(f, "notification endpoint {endpoint} returned status {status}")
            }
            Self::InvalidResponse { endpoint, reason } => {
                write!(f, "invalid response from {endpoint}: {reason}")
            }
        }
    }
}

impl std::error::Error for NotificationError {}
