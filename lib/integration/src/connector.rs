//! Connector definitions and related types.
//!
//! A connector is a named integration (a DeFi protocol, a token contract, a
//! notification channel) exposing trigger and action operations. Connectors
//! are pure data: the workflow builder only reads their schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Value type of a configurable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free-form text.
    String,
    /// A blockchain address.
    Address,
    /// True/false.
    Boolean,
    /// Whole number.
    Integer,
    /// Decimal number.
    Number,
}

/// Schema of one input or output field of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Key of the field in a step's input map.
    pub key: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Placeholder shown in the builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Whether the field takes a list of values.
    #[serde(default)]
    pub list: bool,
    /// Whether a value must be present before the step counts as configured.
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    /// Creates an optional, single-valued field.
    #[must_use]
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            field_type,
            placeholder: None,
            list: false,
            required: false,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// How an operation reaches the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// Fires on a contract event; needs a chain and contract address.
    #[serde(rename = "blockchain:event")]
    BlockchainEvent,
    /// Calls a contract function.
    #[serde(rename = "blockchain:call")]
    BlockchainCall,
}

/// The executable part of an operation definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
    /// Underlying operation type.
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    /// Solidity event or function signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Configurable inputs.
    #[serde(default)]
    pub input_fields: Vec<FieldDef>,
    /// Values produced for later steps.
    #[serde(default)]
    pub output_fields: Vec<FieldDef>,
    /// Sample output.
    #[serde(default)]
    pub sample: JsonValue,
}

/// Display metadata for an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationDisplay {
    /// Short label.
    #[serde(default)]
    pub label: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
}

/// Definition of one trigger or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDef {
    /// Key referenced by a workflow step's `operation`.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Display metadata.
    #[serde(default)]
    pub display: OperationDisplay,
    /// Executable specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationSpec>,
    /// Fields declared directly on the operation rather than its spec.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_fields: Vec<FieldDef>,
}

impl OperationDef {
    /// Returns every input field, spec fields first.
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.operation
            .iter()
            .flat_map(|spec| spec.input_fields.iter())
            .chain(self.input_fields.iter())
    }

    /// Returns the output fields of the operation.
    #[must_use]
    pub fn output_fields(&self) -> &[FieldDef] {
        self.operation
            .as_ref()
            .map_or(&[], |spec| spec.output_fields.as_slice())
    }

    /// Returns the keys of all required input fields.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_fields()
            .filter(|field| field.required)
            .map(|field| field.key.as_str())
            .collect()
    }

    /// Returns true if the operation is triggered by a contract event.
    #[must_use]
    pub fn is_blockchain_event(&self) -> bool {
        self.operation
            .as_ref()
            .is_some_and(|spec| spec.operation_type == OperationType::BlockchainEvent)
    }
}

/// Whether an operation is looked up among triggers or actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Workflow entry point.
    Trigger,
    /// Step run after the trigger fires.
    Action,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger => write!(f, "trigger"),
            Self::Action => write!(f, "action"),
        }
    }
}

/// Authentication a connector requires before its steps can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorAuthentication {
    /// Authentication scheme (e.g. "oauth2").
    #[serde(rename = "type")]
    pub scheme: String,
}

/// A named integration exposing trigger and action operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    /// Key referenced by a workflow step's `connector`.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Connector definition version.
    #[serde(default)]
    pub version: String,
    /// Platform version the definition targets.
    #[serde(default)]
    pub platform_version: String,
    /// Connector family (e.g. "web3").
    #[serde(rename = "type", default)]
    pub connector_type: String,
    /// Available triggers.
    #[serde(default)]
    pub triggers: Vec<OperationDef>,
    /// Available actions.
    #[serde(default)]
    pub actions: Vec<OperationDef>,
    /// Present when steps using this connector must carry a credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<ConnectorAuthentication>,
}

impl Connector {
    /// Returns true if steps using this connector must be authenticated.
    #[must_use]
    pub fn requires_authentication(&self) -> bool {
        self.authentication.is_some()
    }

    /// Looks up a trigger by key.
    #[must_use]
    pub fn trigger(&self, key: &str) -> Option<&OperationDef> {
        self.triggers.iter().find(|op| op.key == key)
    }

    /// Looks up an action by key.
    #[must_use]
    pub fn action(&self, key: &str) -> Option<&OperationDef> {
        self.actions.iter().find(|op| op.key == key)
    }

    /// Looks up an operation of the given kind.
    #[must_use]
    pub fn operation(&self, kind: OperationKind, key: &str) -> Option<&OperationDef> {
        match kind {
            OperationKind::Trigger => self.trigger(key),
            OperationKind::Action => self.action(key),
        }
    }

    /// Returns the operations of the given kind.
    #[must_use]
    pub fn operations(&self, kind: OperationKind) -> &[OperationDef] {
        match kind {
            OperationKind::Trigger => &self.triggers,
            OperationKind::Action => &self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer_trigger() -> OperationDef {
        serde_json::from_value(json!({
            "key": "TransferTrigger",
            "name": "Transfer",
            "display": {"label": "Transfer", "description": "Transfer"},
            "operation": {
                "type": "blockchain:event",
                "signature": "event Transfer(address indexed from, address indexed to, uint256 value)",
                "inputFields": [
                    {"key": "from", "label": "From", "type": "address", "required": true},
                    {"key": "value", "label": "Value", "type": "string"}
                ],
                "outputFields": [
                    {"key": "value", "label": "Value", "type": "string"}
                ]
            },
            "inputFields": [
                {"key": "memo", "label": "Memo", "type": "string", "required": true}
            ]
        }))
        .expect("valid operation")
    }

    #[test]
    fn required_fields_span_spec_and_operation() {
        let op = transfer_trigger();
        assert_eq!(op.required_fields(), vec!["from", "memo"]);
        assert!(op.is_blockchain_event());
        assert_eq!(op.output_fields().len(), 1);
    }

    #[test]
    fn operation_without_spec_has_no_outputs() {
        let op: OperationDef = serde_json::from_value(json!({
            "key": "noop",
            "name": "Noop"
        }))
        .expect("valid operation");
        assert!(op.required_fields().is_empty());
        assert!(!op.is_blockchain_event());
        assert!(op.output_fields().is_empty());
    }

    #[test]
    fn connector_lookup_by_kind() {
        let connector = Connector {
            key: "erc20".to_string(),
            name: "ERC20".to_string(),
            version: "1.0.0".to_string(),
            platform_version: "1.0.0".to_string(),
            connector_type: "web3".to_string(),
            triggers: vec![transfer_trigger()],
            actions: vec![],
            authentication: None,
        };

        assert!(connector.operation(OperationKind::Trigger, "TransferTrigger").is_some());
        assert!(connector.operation(OperationKind::Action, "TransferTrigger").is_none());
        assert!(!connector.requires_authentication());
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let result: Result<FieldDef, _> =
            serde_json::from_value(json!({"key": "x", "type": "blob"}));
        assert!(result.is_err());
    }

    #[test]
    fn field_builder() {
        let field = FieldDef::new("toList", FieldType::String).required();
        assert_eq!(field.label, "toList");
        assert!(field.required);
        assert!(!field.list);
    }
}
