//! Workflow model and editor state for loanshark.
//!
//! This crate provides:
//!
//! - **Definition**: a workflow is one trigger followed by an ordered list of actions
//! - **System state**: per-step `selected`/`authenticated`/`configured`/`tested` flags
//! - **Store**: the in-progress workflow backed by a [`WorkflowRepository`]
//! - **Step coordination**: derives step flags from the connector catalog

pub mod definition;
pub mod error;
pub mod step;
pub mod store;
pub mod system;

pub use definition::{Step, StepInput, StepType, Workflow, WorkflowState};
pub use error::StoreError;
pub use step::{StepCoordinator, StepOutputs, StepStatus, StepValidation, TestState, derive_step_status};
pub use store::{InMemoryWorkflowRepository, WorkflowRepository, WorkflowStore};
pub use system::{StepFlags, StepPath, SystemState};
