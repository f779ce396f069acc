//! Error types for the automation crate.

use loanshark_core::WorkflowKey;
use std::fmt;

/// Errors that fail a save.
///
/// Notification and pipeline failures are reported in the
/// [`SaveOutcome`](crate::SaveOutcome) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The workflow could not be persisted (use as context wrapper).
    PersistFailed { key: WorkflowKey },
    /// The workflow signature could not be serialized.
    Signature { reason: String },
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersistFailed { key } => write!(f, "failed to persist workflow {key}"),
            Self::Signature { reason } => {
                write!(f, "failed to serialize workflow signature: {reason}")
            }
        }
    }
}

impl std::error::Error for SaveError {}
