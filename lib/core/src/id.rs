//! Strongly-typed identifiers for domain entities.
//!
//! Workflow keys are assigned by the workflow builder (`staging-<uuid>`) or by
//! the backend for workflows it already knows about, so they are opaque
//! strings. Internal identifiers (credentials, pipeline runs) use ULID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;
use uuid::Uuid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid_str = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Reference to a stored credential authenticating a workflow step.
    CredentialId,
    "cred"
);

define_id!(
    /// Identifier for one run of the on-chain top-up pipeline.
    PipelineRunId,
    "run"
);

/// Prefix of keys minted by the workflow builder before the backend has
/// seen the workflow.
const STAGING_PREFIX: &str = "staging-";

/// Key identifying a persisted workflow.
///
/// Also identifies the workflow's notification-preferences record, and is
/// the `start` parameter of the Telegram bot deep link, so it is limited to
/// the characters that parameter allows (`A-Z`, `a-z`, `0-9`, `_`, `-`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkflowKey(String);

impl WorkflowKey {
    /// Mints a fresh `staging-<uuid-v4>` key.
    #[must_use]
    pub fn staging() -> Self {
        Self(format!("{STAGING_PREFIX}{}", Uuid::new_v4()))
    }

    /// Returns true if this key was minted by [`WorkflowKey::staging`].
    #[must_use]
    pub fn is_staging(&self) -> bool {
        self.0
            .strip_prefix(STAGING_PREFIX)
            .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkflowKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseIdError {
                id_type: "WorkflowKey",
                reason: "key is empty".to_string(),
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ParseIdError {
                id_type: "WorkflowKey",
                reason: format!("key '{s}' contains disallowed character '{c}'"),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for WorkflowKey {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkflowKey> for String {
    fn from(key: WorkflowKey) -> Self {
        key.0
    }
}

impl AsRef<str> for WorkflowKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
