//! Error types for the workflow crate.

use loanshark_core::WorkflowKey;
use std::fmt;

/// Errors from workflow persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No workflow is stored under the key.
    NotFound { key: WorkflowKey },
    /// A workflow is already stored under the key.
    AlreadyExists { key: WorkflowKey },
    /// An update was attempted on a workflow that was never saved.
    MissingKey,
    /// The workflow could not be encoded or decoded.
    Serialization { reason: String },
    /// The storage backend failed.
    Backend { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "workflow not found: {key}"),
            Self::AlreadyExists { key } => write!(f, "workflow already exists: {key}"),
            Self::MissingKey => write!(f, "workflow has no key"),
            Self::Serialization { reason } => {
                write!(f, "workflow serialization failed: {reason}")
            }
            Self::Backend { reason } => write!(f, "workflow storage failed: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}
