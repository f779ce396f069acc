//! Workflow definition types.
//!
//! A workflow is a trigger followed by an ordered list of actions. Each step
//! names a connector and one of its operations, and carries the values the
//! user entered for that operation's input fields.

use crate::system::{StepPath, SystemState};
use loanshark_core::{CredentialId, WorkflowKey};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Values entered for a step's input fields, keyed by field key.
pub type StepInput = BTreeMap<String, JsonValue>;

/// Whether a step is the workflow trigger or one of its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// The workflow entry point.
    Trigger,
    /// A step run after the trigger fires.
    Action,
}

/// A configured trigger or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step type.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Key of the connector in the catalog; empty when none is chosen.
    #[serde(default)]
    pub connector: String,
    /// Key of the trigger or action within the connector.
    #[serde(default)]
    pub operation: String,
    /// Entered input values.
    #[serde(default)]
    pub input: StepInput,
    /// Credential authenticating the step against its connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<CredentialId>,
}

impl Step {
    /// Creates a step with no connector chosen.
    #[must_use]
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            connector: String::new(),
            operation: String::new(),
            input: StepInput::new(),
            authentication: None,
        }
    }

    /// Creates a trigger step for the given connector and operation.
    #[must_use]
    pub fn trigger(connector: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(StepType::Trigger).with_operation(connector, operation)
    }

    /// Creates an action step for the given connector and operation.
    #[must_use]
    pub fn action(connector: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(StepType::Action).with_operation(connector, operation)
    }

    fn with_operation(mut self, connector: impl Into<String>, operation: impl Into<String>) -> Self {
        self.connector = connector.into();
        self.operation = operation.into();
        self
    }

    /// Sets an input value.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    /// Sets the authentication credential.
    #[must_use]
    pub fn with_authentication(mut self, credential: CredentialId) -> Self {
        self.authentication = Some(credential);
        self
    }

    /// Returns an input value rendered as text.
    ///
    /// Strings are returned as-is, numbers and booleans in their JSON form.
    /// Missing and null values yield `None`.
    #[must_use]
    pub fn input_text(&self, key: &str) -> Option<String> {
        match self.input.get(key)? {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Whether a saved workflow is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    /// The automation runs when its trigger fires.
    On,
    /// The automation is paused.
    #[default]
    Off,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// A trigger-and-actions automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Key assigned when the workflow was first saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<WorkflowKey>,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Account that created the workflow.
    #[serde(default)]
    pub creator: String,
    /// The trigger step.
    pub trigger: Step,
    /// Action steps, in execution order.
    #[serde(default)]
    pub actions: Vec<Step>,
    /// Whether the workflow is active.
    #[serde(default)]
    pub state: WorkflowState,
    /// Serialized form of the workflow as last saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Editor flags; not part of the persisted definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemState>,
}

impl Workflow {
    /// Creates an unsaved workflow with the given trigger and no actions.
    #[must_use]
    pub fn new(creator: impl Into<String>, trigger: Step) -> Self {
        Self {
            key: None,
            title: String::new(),
            creator: creator.into(),
            trigger,
            actions: Vec::new(),
            state: WorkflowState::Off,
            signature: None,
            system: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Appends an action.
    #[must_use]
    pub fn with_action(mut self, action: Step) -> Self {
        self.actions.push(action);
        self
    }

    /// Returns the step at a path.
    #[must_use]
    pub fn step(&self, path: StepPath) -> Option<&Step> {
        match path {
            StepPath::Trigger => Some(&self.trigger),
            StepPath::Action(index) => self.actions.get(index),
        }
    }

    /// Returns the step at a path for modification.
    pub fn step_mut(&mut self, path: StepPath) -> Option<&mut Step> {
        match path {
            StepPath::Trigger => Some(&mut self.trigger),
            StepPath::Action(index) => self.actions.get_mut(index),
        }
    }

    /// Iterates over every step with its path, trigger first.
    pub fn steps(&self) -> impl Iterator<Item = (StepPath, &Step)> {
        std::iter::once((StepPath::Trigger, &self.trigger)).chain(
            self.actions
                .iter()
                .enumerate()
                .map(|(index, step)| (StepPath::Action(index), step)),
        )
    }

    /// Returns a copy without the editor-only `signature` and `system` fields.
    #[must_use]
    pub fn without_transient(&self) -> Self {
        Self {
            signature: None,
            system: None,
            ..self.clone()
        }
    }
}
