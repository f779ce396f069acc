//! Step configuration coordination.
//!
//! Step flags are a projection of the workflow onto the connector catalog:
//! [`derive_step_status`] computes them from the resolved connector,
//! operation and entered inputs, and [`StepCoordinator::sync`] writes the
//! result for every step into the [`WorkflowStore`]. The coordinator is re-run
//! after every change to a step's connector, operation or inputs.

use crate::definition::{Step, Workflow};
use crate::store::WorkflowStore;
use crate::system::{StepFlags, StepPath};
use loanshark_integration::{Connector, ConnectorCatalog, FieldDef, OperationDef, OperationKind};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// Input key holding the chain of a blockchain event trigger.
pub const CHAIN_FIELD: &str = "_grinderyChain";

/// Input key holding the contract address of a blockchain event trigger.
pub const CONTRACT_ADDRESS_FIELD: &str = "_grinderyContractAddress";

/// Validation outcome for a step's entered inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepValidation {
    /// Error reported by the input form, if any.
    pub input_error: Option<String>,
    /// Keys of fields whose values failed validation.
    pub field_errors: Vec<String>,
}

impl StepValidation {
    /// Returns true if no validation error is outstanding.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.input_error.is_none() && self.field_errors.is_empty()
    }
}

/// Derived status of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStatus {
    /// The connector and operation both resolved.
    pub selected: bool,
    /// The connector requires authentication.
    pub authentication_required: bool,
    /// Authentication is satisfied.
    pub authenticated: bool,
    /// Every required input has a value.
    pub configured: bool,
}

impl StepStatus {
    /// Combines the status with the step's test state into editor flags.
    #[must_use]
    pub fn into_flags(self, tested: bool) -> StepFlags {
        StepFlags {
            selected: self.selected,
            authenticated: self.authenticated,
            configured: self.configured,
            tested,
        }
    }
}

/// Whether an action has been tested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestState {
    /// No test has run.
    #[default]
    NotTested,
    /// Testing was skipped for a workflow being edited.
    Skipped,
    /// A test run succeeded.
    Passed,
}

impl TestState {
    /// Returns true if the step counts as tested.
    #[must_use]
    pub fn is_tested(self) -> bool {
        !matches!(self, Self::NotTested)
    }
}

fn has_value(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Derives a step's status from its resolved connector and operation.
///
/// A missing connector means nothing is selected. A missing operation makes
/// every flag false.
#[must_use]
pub fn derive_step_status(
    connector: Option<&Connector>,
    operation: Option<&OperationDef>,
    step: &Step,
    validation: &StepValidation,
) -> StepStatus {
    let Some(connector) = connector else {
        return StepStatus::default();
    };
    let authentication_required = connector.requires_authentication();
    let Some(operation) = operation else {
        return StepStatus {
            authentication_required,
            ..StepStatus::default()
        };
    };

    let inputs_present = operation
        .required_fields()
        .into_iter()
        .all(|key| has_value(step.input.get(key)));
    let chain_present = !operation.is_blockchain_event()
        || (has_value(step.input.get(CHAIN_FIELD))
            && has_value(step.input.get(CONTRACT_ADDRESS_FIELD)));

    StepStatus {
        selected: true,
        authentication_required,
        authenticated: !authentication_required || step.authentication.is_some(),
        configured: inputs_present && chain_present && validation.is_clean(),
    }
}

/// Output fields a step makes available to later steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutputs<'a> {
    /// Step location.
    pub path: StepPath,
    /// Connector key.
    pub connector: &'a str,
    /// Operation key.
    pub operation: &'a str,
    /// Resolved output fields.
    pub fields: &'a [FieldDef],
}

/// Re-derives and publishes the flags of every step.
#[derive(Debug, Clone, Default)]
pub struct StepCoordinator {
    initial_test_state: TestState,
    tests: BTreeMap<usize, TestState>,
    validations: BTreeMap<StepPath, StepValidation>,
}

impl StepCoordinator {
    /// Creates a coordinator for a workflow.
    ///
    /// Actions of a workflow that was already saved start out as
    /// [`TestState::Skipped`]; those of a new workflow start untested.
    #[must_use]
    pub fn for_workflow(workflow: &Workflow) -> Self {
        let initial_test_state = if workflow.key.is_some() {
            TestState::Skipped
        } else {
            TestState::NotTested
        };
        Self {
            initial_test_state,
            ..Self::default()
        }
    }

    /// Records the test state of an action.
    pub fn record_test(&mut self, index: usize, state: TestState) {
        self.tests.insert(index, state);
    }

    /// Returns the test state of an action.
    #[must_use]
    pub fn test_state(&self, index: usize) -> TestState {
        self.tests
            .get(&index)
            .copied()
            .unwrap_or(self.initial_test_state)
    }

    /// Removes an action from the store along with its recorded test state
    /// and validation, shifting those of the actions after it.
    pub fn remove_action(&mut self, store: &mut WorkflowStore, index: usize) -> Option<Step> {
        let removed = store.remove_action(index)?;

        self.tests = std::mem::take(&mut self.tests)
            .into_iter()
            .filter(|(i, _)| *i != index)
            .map(|(i, state)| (if i > index { i - 1 } else { i }, state))
            .collect();
        self.validations = std::mem::take(&mut self.validations)
            .into_iter()
            .filter_map(|(path, validation)| match path {
                StepPath::Action(i) if i == index => None,
                StepPath::Action(i) if i > index => Some((StepPath::Action(i - 1), validation)),
                path => Some((path, validation)),
            })
            .collect();
        Some(removed)
    }

    /// Records the validation outcome of a step.
    pub fn set_validation(&mut self, path: StepPath, validation: StepValidation) {
        if validation.is_clean() {
            self.validations.remove(&path);
        } else {
            self.validations.insert(path, validation);
        }
    }

    /// Derives the status of the step at a path.
    #[must_use]
    pub fn status(&self, catalog: &ConnectorCatalog, workflow: &Workflow, path: StepPath) -> StepStatus {
        let Some(step) = workflow.step(path) else {
            return StepStatus::default();
        };
        let (connector, operation) = resolve(catalog, path, step);
        let clean = StepValidation::default();
        let validation = self.validations.get(&path).unwrap_or(&clean);
        derive_step_status(connector, operation, step, validation)
    }

    /// Re-derives every step's flags and writes them into the store.
    pub fn sync(&self, store: &mut WorkflowStore, catalog: &ConnectorCatalog) {
        let flags: Vec<_> = store
            .workflow()
            .steps()
            .map(|(path, _)| {
                let tested = match path {
                    StepPath::Trigger => true,
                    StepPath::Action(index) => self.test_state(index).is_tested(),
                };
                let flags = self.status(catalog, store.workflow(), path).into_flags(tested);
                (path, flags)
            })
            .collect();

        for (path, flags) in flags {
            debug!(step = %path, ?flags, "step flags derived");
            store.apply_step_flags(path, flags);
        }
    }

    /// Lists the output fields each resolved step offers to later steps.
    #[must_use]
    pub fn output_fields<'a>(
        catalog: &'a ConnectorCatalog,
        workflow: &'a Workflow,
    ) -> Vec<StepOutputs<'a>> {
        workflow
            .steps()
            .filter_map(|(path, step)| {
                let (_, operation) = resolve(catalog, path, step);
                operation.map(|op| StepOutputs {
                    path,
                    connector: &step.connector,
                    operation: &step.operation,
                    fields: op.output_fields(),
                })
            })
            .collect()
    }
}

fn resolve<'a>(
    catalog: &'a ConnectorCatalog,
    path: StepPath,
    step: &Step,
) -> (Option<&'a Connector>, Option<&'a OperationDef>) {
    let kind = match path {
        StepPath::Trigger => OperationKind::Trigger,
        StepPath::Action(_) => OperationKind::Action,
    };
    let connector = catalog.get(&step.connector);
    let operation = connector.and_then(|c| c.operation(kind, &step.operation));
    (connector, operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWorkflowRepository;
    use loanshark_core::CredentialId;
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> ConnectorCatalog {
        ConnectorCatalog::from_json(
            &json!([
                {
                    "key": "erc20",
                    "name": "ERC20",
                    "triggers": [{
                        "key": "TransferTrigger",
                        "name": "Transfer",
                        "operation": {
                            "type": "blockchain:event",
                            "inputFields": [{"key": "from", "type": "address", "required": true}],
                            "outputFields": [{"key": "value", "type": "string"}]
                        }
                    }],
                    "actions": [{
                        "key": "approve",
                        "name": "Approve",
                        "operation": {
                            "type": "blockchain:call",
                            "inputFields": [
                                {"key": "spender", "type": "address", "required": true},
                                {"key": "memo", "type": "string"}
                            ]
                        },
                        "inputFields": [{"key": "amount", "type": "number", "required": true}]
                    }]
                },
                {
                    "key": "gmail",
                    "name": "Gmail",
                    "authentication": {"type": "oauth2"},
                    "actions": [{
                        "key": "send",
                        "name": "Send",
                        "operation": {"type": "blockchain:call"}
                    }]
                }
            ])
            .to_string(),
        )
        .expect("valid catalog")
    }

    fn status(catalog: &ConnectorCatalog, workflow: &Workflow, path: StepPath) -> StepStatus {
        StepCoordinator::for_workflow(workflow).status(catalog, workflow, path)
    }

    fn approve() -> Step {
        Step::action("erc20", "approve")
            .with_input("spender", "0x26b8")
            .with_input("amount", 10)
    }

    #[test]
    fn configured_iff_required_values_present() {
        let catalog = catalog();
        let cases = [
            (approve(), true),
            (approve().with_input("spender", ""), false),
            (approve().with_input("amount", JsonValue::Null), false),
            (Step::action("erc20", "approve").with_input("amount", 0), false),
            (approve().with_input("memo", ""), true),
        ];
        for (step, expected) in cases {
            let workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger")).with_action(step);
            let status = status(&catalog, &workflow, StepPath::Action(0));
            assert_eq!(status.configured, expected, "{:?}", workflow.actions[0].input);
            assert!(status.selected);
        }
    }

    #[test]
    fn event_triggers_need_chain_and_contract() {
        let catalog = catalog();
        let trigger = Step::trigger("erc20", "TransferTrigger").with_input("from", "0x1");
        let workflow = Workflow::new("me", trigger.clone());
        assert!(!status(&catalog, &workflow, StepPath::Trigger).configured);

        let workflow = Workflow::new(
            "me",
            trigger
                .with_input(CHAIN_FIELD, "eip155:1")
                .with_input(CONTRACT_ADDRESS_FIELD, "0x9f2b"),
        );
        assert!(status(&catalog, &workflow, StepPath::Trigger).configured);
    }

    #[test]
    fn validation_error_blocks_configured() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger")).with_action(approve());
        let mut coordinator = StepCoordinator::for_workflow(&workflow);
        coordinator.set_validation(
            StepPath::Action(0),
            StepValidation {
                input_error: Some("amount must be positive".to_string()),
                field_errors: vec![],
            },
        );
        assert!(!coordinator.status(&catalog, &workflow, StepPath::Action(0)).configured);

        coordinator.set_validation(StepPath::Action(0), StepValidation::default());
        assert!(coordinator.status(&catalog, &workflow, StepPath::Action(0)).configured);
    }

    #[test]
    fn unknown_connector_selects_nothing() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("nope", "x"));
        assert_eq!(status(&catalog, &workflow, StepPath::Trigger), StepStatus::default());
    }

    #[test]
    fn unknown_operation_clears_flags() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "nope"));
        let status = status(&catalog, &workflow, StepPath::Trigger);
        assert!(!status.selected);
        assert!(!status.authenticated);
        assert!(!status.configured);
    }

    #[test]
    fn trigger_operations_are_not_resolved_as_actions() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "approve"));
        assert!(!status(&catalog, &workflow, StepPath::Trigger).selected);
    }

    #[test]
    fn authentication_follows_connector_requirement() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger"))
            .with_action(Step::action("gmail", "send"))
            .with_action(Step::action("gmail", "send").with_authentication(CredentialId::new()))
            .with_action(approve());

        let unauthenticated = status(&catalog, &workflow, StepPath::Action(0));
        assert!(unauthenticated.authentication_required);
        assert!(!unauthenticated.authenticated);
        assert!(status(&catalog, &workflow, StepPath::Action(1)).authenticated);
        assert!(status(&catalog, &workflow, StepPath::Action(2)).authenticated);
    }

    #[test]
    fn sync_writes_flags_and_tested_state() {
        let catalog = catalog();
        let workflow = Workflow::new(
            "me",
            Step::trigger("erc20", "TransferTrigger")
                .with_input("from", "0x1")
                .with_input(CHAIN_FIELD, "eip155:1")
                .with_input(CONTRACT_ADDRESS_FIELD, "0x9f2b"),
        )
        .with_action(approve());
        let mut store = WorkflowStore::new(Arc::new(InMemoryWorkflowRepository::new()), workflow);

        let mut coordinator = StepCoordinator::for_workflow(store.workflow());
        coordinator.sync(&mut store, &catalog);
        assert!(store.step_flags(StepPath::Trigger).is_complete());
        let action = store.step_flags(StepPath::Action(0));
        assert!(action.configured);
        assert!(!action.tested);
        assert!(!store.ready_to_save());

        coordinator.record_test(0, TestState::Passed);
        coordinator.sync(&mut store, &catalog);
        assert!(store.ready_to_save());
    }

    #[test]
    fn removing_an_action_shifts_its_test_state() {
        let catalog = catalog();
        let workflow = Workflow::new(
            "me",
            Step::trigger("erc20", "TransferTrigger")
                .with_input("from", "0x1")
                .with_input(CHAIN_FIELD, "eip155:1")
                .with_input(CONTRACT_ADDRESS_FIELD, "0x9f2b"),
        )
        .with_action(approve())
        .with_action(approve().with_input("memo", "second"));
        let mut store = WorkflowStore::new(Arc::new(InMemoryWorkflowRepository::new()), workflow);

        let mut coordinator = StepCoordinator::for_workflow(store.workflow());
        coordinator.record_test(0, TestState::Passed);
        coordinator.set_validation(
            StepPath::Action(1),
            StepValidation {
                input_error: None,
                field_errors: vec!["amount".to_string()],
            },
        );
        coordinator.sync(&mut store, &catalog);
        assert!(!store.ready_to_save());

        let removed = coordinator.remove_action(&mut store, 0).expect("removed");
        assert!(removed.input.get("memo").is_none());
        coordinator.sync(&mut store, &catalog);

        assert_eq!(coordinator.test_state(0), TestState::NotTested);
        let flags = store.step_flags(StepPath::Action(0));
        assert!(!flags.tested);
        assert!(!flags.configured);
        assert!(!store.ready_to_save());
        assert!(coordinator.remove_action(&mut store, 3).is_none());
    }

    #[test]
    fn saved_workflows_start_with_tests_skipped() {
        let mut workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger"));
        assert_eq!(StepCoordinator::for_workflow(&workflow).test_state(0), TestState::NotTested);

        workflow.key = Some("wf-1".parse().expect("key"));
        let coordinator = StepCoordinator::for_workflow(&workflow);
        assert_eq!(coordinator.test_state(0), TestState::Skipped);
        assert!(coordinator.test_state(0).is_tested());
    }

    #[test]
    fn sync_recomputes_after_connector_change() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger")).with_action(approve());
        let mut store = WorkflowStore::new(Arc::new(InMemoryWorkflowRepository::new()), workflow);
        let coordinator = StepCoordinator::for_workflow(store.workflow());

        coordinator.sync(&mut store, &catalog);
        assert!(store.step_flags(StepPath::Action(0)).configured);

        store.set_connector(StepPath::Action(0), "gmail");
        coordinator.sync(&mut store, &catalog);
        assert!(!store.step_flags(StepPath::Action(0)).selected);

        store.set_operation(StepPath::Action(0), "send");
        coordinator.sync(&mut store, &catalog);
        let flags = store.step_flags(StepPath::Action(0));
        assert!(flags.selected);
        assert!(flags.configured);
        assert!(!flags.authenticated);
    }

    #[test]
    fn output_fields_list_resolved_steps() {
        let catalog = catalog();
        let workflow = Workflow::new("me", Step::trigger("erc20", "TransferTrigger"))
            .with_action(approve())
            .with_action(Step::action("nope", "x"));

        let outputs = StepCoordinator::output_fields(&catalog, &workflow);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].path, StepPath::Trigger);
        assert_eq!(outputs[0].fields.len(), 1);
        assert_eq!(outputs[0].fields[0].key, "value");
        assert!(outputs[1].fields.is_empty());
    }
}
