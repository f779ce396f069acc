//! Error types for CLI commands.

use std::fmt;
use std::path::PathBuf;

/// Errors that end a command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The database could not be reached or migrated.
    Database { details: String },
    /// A connector catalog could not be loaded (use as context wrapper).
    Catalog,
    /// A workflow file could not be read.
    WorkflowFile { path: PathBuf, details: String },
    /// A backend client could not be built (use as context wrapper).
    Client { backend: &'static str },
    /// The save failed (use as context wrapper).
    Save,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::Catalog => write!(f, "failed to load connector catalog"),
            Self::WorkflowFile { path, details } => {
                write!(f, "failed to read workflow '{}': {details}", path.display())
            }
            Self::Client { backend } => write!(f, "failed to set up {backend} client"),
            Self::Save => write!(f, "failed to save workflow"),
        }
    }
}

impl std::error::Error for CliError {}
