//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `CatalogError`: Loading or validating a connector catalog

use std::fmt;
use std::path::PathBuf;

/// Errors from loading or validating a connector catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog file could not be read.
    ReadFailed { path: PathBuf, reason: String },
    /// The catalog is not valid JSON for the connector schema.
    ParseFailed { reason: String },
    /// A connector has an empty key.
    EmptyConnectorKey { index: usize },
    /// Two connectors share a key.
    DuplicateConnector { key: String },
    /// An operation has an empty key.
    EmptyOperationKey { connector: String },
    /// Two operations of the same kind share a key within a connector.
    DuplicateOperation {
        connector: String,
        kind: String,
        key: String,
    },
    /// A field of an operation is invalid (empty or duplicate key).
    InvalidField {
        connector: String,
        operation: String,
        field: String,
        reason: String,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { path, reason } => {
                write!(f, "failed to read catalog {}: {reason}", path.display())
            }
            Self::ParseFailed { reason } => {
                write!(f, "failed to parse catalog: {reason}")
            }
            Self::EmptyConnectorKey { index } => {
                write!(f, "connector at index {index} has an empty key")
            }
            Self::DuplicateConnector { key } => {
                write!(f, "duplicate connector key: {key}")
            }
            Self::EmptyOperationKey { connector } => {
                write!(f, "connector '{connector}' has an operation with an empty key")
            }
            Self::DuplicateOperation {
                connector,
                kind,
                key,
            } => {
                write!(f, "connector '{connector}' has duplicate {kind} '{key}'")
            }
            Self::InvalidField {
                connector,
                operation,
                field,
                reason,
            } => {
                write!(
                    f,
                    "invalid field '{field}' in '{connector}.{operation}': {reason}"
                )
            }
        }
    }
}

impl std::error::Error for CatalogError {}
