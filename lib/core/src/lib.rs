//! Core domain types and utilities for loanshark.
//!
//! This crate provides the identifiers shared by the
//! workflow builder, the notification client and the on-chain pipeline.

pub mod id;

pub use id::{CredentialId, ParseIdError, PipelineRunId, WorkflowKey};
