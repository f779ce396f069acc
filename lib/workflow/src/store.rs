//! Workflow persistence and the in-progress editor state.
//!
//! [`WorkflowRepository`] is the persistence seam; [`WorkflowStore`] holds the
//! workflow being edited and writes it through the repository on save.
//! Writes are last-write-wins with no transactional isolation.

use crate::definition::{Step, StepType, Workflow, WorkflowState};
use crate::error::StoreError;
use crate::system::{StepFlags, StepPath};
use async_trait::async_trait;
use loanshark_core::WorkflowKey;
use rootcause::Report;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Persistence for saved workflows.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Stores a new workflow under a key.
    ///
    /// # Errors
    ///
    /// Returns an error if a workflow already exists under the key or the
    /// backend fails.
    async fn create(&self, key: &WorkflowKey, workflow: &Workflow) -> Result<(), Report<StoreError>>;

    /// Replaces the workflow stored under the workflow's own key.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow has no key or the backend fails.
    async fn update(&self, workflow: &Workflow) -> Result<(), Report<StoreError>>;

    /// Loads a workflow by key.
    async fn get(&self, key: &WorkflowKey) -> Result<Option<Workflow>, Report<StoreError>>;

    /// Deletes a workflow by key.
    async fn delete(&self, key: &WorkflowKey) -> Result<(), Report<StoreError>>;
}

/// Repository keeping workflows in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<Mutex<HashMap<WorkflowKey, Workflow>>>,
}

impl InMemoryWorkflowRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored workflows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no workflows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<WorkflowKey, Workflow>> {
        self.workflows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn create(&self, key: &WorkflowKey, workflow: &Workflow) -> Result<(), Report<StoreError>> {
        let mut workflows = self.lock();
        if workflows.contains_key(key) {
            return Err(StoreError::AlreadyExists { key: key.clone() }.into());
        }
        let mut stored = workflow.clone();
        stored.key = Some(key.clone());
        workflows.insert(key.clone(), stored);
        Ok(())
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), Report<StoreError>> {
        let key = workflow.key.clone().ok_or(StoreError::MissingKey)?;
        self.lock().insert(key, workflow.clone());
        Ok(())
    }

    async fn get(&self, key: &WorkflowKey) -> Result<Option<Workflow>, Report<StoreError>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn delete(&self, key: &WorkflowKey) -> Result<(), Report<StoreError>> {
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { key: key.clone() }.into())
    }
}

/// The workflow being edited, with its editor flags.
pub struct WorkflowStore {
    workflow: Workflow,
    repository: Arc<dyn WorkflowRepository>,
}

impl WorkflowStore {
    /// Creates a store editing the given workflow.
    #[must_use]
    pub fn new(repository: Arc<dyn WorkflowRepository>, workflow: Workflow) -> Self {
        Self {
            workflow,
            repository,
        }
    }

    /// Opens a saved workflow for editing.
    ///
    /// # Errors
    ///
    /// Returns an error if no workflow is stored under the key.
    pub async fn load(
        repository: Arc<dyn WorkflowRepository>,
        key: &WorkflowKey,
    ) -> Result<Self, Report<StoreError>> {
        let workflow = repository
            .get(key)
            .await?
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        Ok(Self::new(repository, workflow))
    }

    /// Returns the workflow being edited.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Returns the workflow being edited for modification.
    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }

    /// Returns the key the workflow was saved under, if any.
    #[must_use]
    pub fn key(&self) -> Option<&WorkflowKey> {
        self.workflow.key.as_ref()
    }

    /// Sets the workflow state.
    pub fn set_state(&mut self, state: WorkflowState) {
        self.workflow.state = state;
    }

    /// Records the editor flags of a step.
    pub fn apply_step_flags(&mut self, path: StepPath, flags: StepFlags) {
        self.workflow
            .system
            .get_or_insert_with(Default::default)
            .set_flags(path, flags);
    }

    /// Returns the recorded editor flags of a step.
    #[must_use]
    pub fn step_flags(&self, path: StepPath) -> StepFlags {
        self.workflow
            .system
            .as_ref()
            .map(|system| system.flags(path))
            .unwrap_or_default()
    }

    /// Returns true if the trigger and every action are selected,
    /// authenticated, configured and tested.
    #[must_use]
    pub fn ready_to_save(&self) -> bool {
        self.workflow
            .system
            .as_ref()
            .is_some_and(|system| system.all_complete(self.workflow.actions.len()))
    }

    /// Appends an empty action and returns its path.
    pub fn add_action(&mut self) -> StepPath {
        self.push_action(Step::new(StepType::Action))
    }

    /// Appends an action and returns its path.
    pub fn push_action(&mut self, step: Step) -> StepPath {
        self.workflow.actions.push(step);
        let path = StepPath::Action(self.workflow.actions.len() - 1);
        if let Some(system) = self.workflow.system.as_mut() {
            system.set_flags(path, StepFlags::default());
        }
        path
    }

    /// Removes the action at an index, keeping editor flags aligned.
    pub fn remove_action(&mut self, index: usize) -> Option<Step> {
        if index >= self.workflow.actions.len() {
            return None;
        }
        if let Some(system) = self.workflow.system.as_mut()
            && index < system.actions.len()
        {
            system.actions.remove(index);
        }
        Some(self.workflow.actions.remove(index))
    }

    /// Chooses the connector of a step, clearing its operation and inputs.
    ///
    /// Returns false if there is no step at the path.
    pub fn set_connector(&mut self, path: StepPath, connector: impl Into<String>) -> bool {
        let Some(step) = self.workflow.step_mut(path) else {
            return false;
        };
        step.connector = connector.into();
        step.operation.clear();
        step.input.clear();
        step.authentication = None;
        true
    }

    /// Chooses the operation of a step, clearing its inputs.
    ///
    /// Returns false if there is no step at the path.
    pub fn set_operation(&mut self, path: StepPath, operation: impl Into<String>) -> bool {
        let Some(step) = self.workflow.step_mut(path) else {
            return false;
        };
        step.operation = operation.into();
        step.input.clear();
        true
    }

    /// Sets one input value of a step.
    ///
    /// Returns false if there is no step at the path.
    pub fn set_input(
        &mut self,
        path: StepPath,
        key: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> bool {
        let Some(step) = self.workflow.step_mut(path) else {
            return false;
        };
        step.input.insert(key.into(), value.into());
        true
    }

    /// Persists the workflow as a new record under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository rejects the workflow.
    pub async fn save(&mut self, key: WorkflowKey) -> Result<(), Report<StoreError>> {
        let mut persisted = self.workflow.without_transient();
        persisted.key = Some(key.clone());
        self.repository.create(&key, &persisted).await?;

        info!(workflow_key = %key, "workflow created");
        self.workflow.key = Some(key);
        Ok(())
    }

    /// Persists an edited workflow over its saved record and continues
    /// editing it.
    ///
    /// Editor flags are not persisted, so when `workflow` carries none the
    /// current ones are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow has no key or the repository fails.
    pub async fn edit(&mut self, workflow: Workflow) -> Result<(), Report<StoreError>> {
        self.repository.update(&workflow).await?;

        debug!(workflow_key = ?workflow.key, state = %workflow.state, "workflow updated");
        let system = self.workflow.system.take();
        self.workflow = workflow;
        if self.workflow.system.is_none() {
            self.workflow.system = system;
        }
        Ok(())
    }
}
