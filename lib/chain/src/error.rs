//! Error types for the chain crate.
//!
//! - `ChainError`: wallet, RPC and value-encoding failures
//! - `PipelineError`: top-up pipeline failures (wraps `ChainError` via context)

use crate::topup::PipelineStage;
use std::fmt;

/// Errors from wallet calls and on-chain value handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A string is not a valid address.
    InvalidAddress { value: String, reason: String },
    /// A string is not a valid hex word.
    InvalidHex { value: String, reason: String },
    /// A decimal amount could not be parsed.
    InvalidAmount { value: String, reason: String },
    /// An amount does not fit its target type.
    AmountOverflow { what: String },
    /// A workflow input needed by the pipeline is missing.
    MissingInput { field: String },
    /// The wallet exposed no accounts.
    NoAccounts,
    /// The HTTP client could not be built.
    ClientBuild { reason: String },
    /// A JSON-RPC request did not complete.
    Transport { method: String, reason: String },
    /// The node returned a JSON-RPC error.
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    /// A JSON-RPC response could not be decoded.
    InvalidResponse { method: String, reason: String },
    /// A mined transaction reverted.
    TransactionReverted { hash: String },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress { value, reason } => {
                write!(f, "invalid address '{value}': {reason}")
            }
            Self::InvalidHex { value, reason } => write!(f, "invalid hex '{value}': {reason}"),
            Self::InvalidAmount { value, reason } => {
                write!(f, "invalid amount '{value}': {reason}")
            }
            Self::AmountOverflow { what } => write!(f, "amount overflow: {what}"),
            Self::MissingInput { field } => write!(f, "workflow input '{field}' is missing"),
            Self::NoAccounts => write!(f, "wallet returned no accounts"),
            Self::ClientBuild { reason } => write!(f, "failed to build RPC client: {reason}"),
            Self::Transport { method, reason } => {
                write!(f, "{method} request failed: {reason}")
            }
            Self::Rpc {
                method,
                code,
                message,
            } => write!(f, "{method} returned error {code}: {message}"),
            Self::InvalidResponse { method, reason } => {
                write!(f, "invalid {method} response: {reason}")
            }
            Self::TransactionReverted { hash } => write!(f, "transaction {hash} reverted"),
        }
    }
}

impl std::error::Error for ChainError {}

/// Errors from the top-up pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The pipeline was asked to move between states out of order.
    InvalidTransition { from: String, to: String },
    /// A stage failed (use as context wrapper).
    StageFailed { stage: PipelineStage },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid pipeline transition from {from} to {to}")
            }
            Self::StageFailed { stage } => write!(f, "top-up pipeline failed at {stage}"),
        }
    }
}

impl std::error::Error for PipelineError {}
