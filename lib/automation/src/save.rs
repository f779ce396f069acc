//! Save orchestration.
//!
//! A workflow opened from a saved key is updated in place; any other
//! workflow is created under a fresh staging key. Either way the
//! notification backend's subscriber record is brought in line with the
//! workflow's notification actions, and top-up automations are then
//! registered on-chain.
//!
//! Only persisting the workflow can fail a save. Notification and on-chain
//! failures are logged and reported in the [`SaveOutcome`].

use crate::deep_link::{DeepLinkOpener, TelegramConfig, telegram_start_link};
use crate::error::SaveError;
use loanshark_chain::topup::is_topup_workflow;
use loanshark_chain::{PipelineState, TopupPipeline, WalletClient};
use loanshark_core::WorkflowKey;
use loanshark_notification::subscriber::BORROW_LIMIT_OVER;
use loanshark_notification::{
    ApiResponse, Condition, NotificationApi, NotificationChannel, NotificationError,
    SubscriberInformation,
};
use loanshark_workflow::{Workflow, WorkflowState, WorkflowStore};
use rootcause::Report;
use rootcause::prelude::ResultExt;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A request to save the workflow being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Key of the saved workflow the editor was opened with, if any.
    pub route_key: Option<WorkflowKey>,
    /// Account of the user saving.
    pub user: String,
}

/// How the subscriber record ended up after a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSync {
    /// The workflow has no notification actions.
    NotRequired,
    /// The backend accepted the record.
    Synced,
    /// The backend answered with a non-success code.
    Rejected { code: Option<i64> },
    /// The backend could not be reached.
    Failed { reason: String },
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Key the workflow is stored under.
    pub key: WorkflowKey,
    /// Subscriber record sync.
    pub notification: NotificationSync,
    /// Final state of the top-up pipeline; `Idle` if it did not run.
    pub pipeline: PipelineState,
    /// Telegram bot link handed to the user, if any.
    pub telegram_link: Option<String>,
}

/// Saves workflows against the notification backend and the chain.
pub struct SaveOrchestrator {
    notifications: Arc<dyn NotificationApi>,
    opener: Arc<dyn DeepLinkOpener>,
    telegram: TelegramConfig,
}

impl SaveOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        notifications: Arc<dyn NotificationApi>,
        opener: Arc<dyn DeepLinkOpener>,
        telegram: TelegramConfig,
    ) -> Self {
        Self {
            notifications,
            opener,
            telegram,
        }
    }

    /// Saves the workflow being edited.
    ///
    /// Without a wallet the on-chain registration is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow could not be persisted.
    #[instrument(skip_all, fields(user = %request.user, route_key = ?request.route_key))]
    pub async fn save(
        &self,
        store: &mut WorkflowStore,
        request: SaveRequest,
        wallet: Option<&dyn WalletClient>,
    ) -> Result<SaveOutcome, Report<SaveError>> {
        let (key, notification) = match request.route_key {
            Some(key) => {
                let notification = self.update(store, &key).await?;
                (key, notification)
            }
            None => self.create(store, &request.user).await?,
        };

        let telegram_link = NotificationChannel::from_workflow(store.workflow())
            .iter()
            .any(NotificationChannel::requires_bot_redirect)
            .then(|| telegram_start_link(&self.telegram.bot_url, &key));
        if let Some(link) = &telegram_link {
            self.opener.open(link);
        }

        let pipeline = run_pipeline(store.workflow(), &key, wallet).await;
        Ok(SaveOutcome {
            key,
            notification,
            pipeline,
            telegram_link,
        })
    }

    async fn update(
        &self,
        store: &mut WorkflowStore,
        key: &WorkflowKey,
    ) -> Result<NotificationSync, Report<SaveError>> {
        let ready = store.ready_to_save();
        let mut workflow = store.workflow().without_transient();
        workflow.key = Some(key.clone());
        let signature = serde_json::to_string(&workflow).map_err(|e| SaveError::Signature {
            reason: e.to_string(),
        })?;
        workflow.state = if workflow.state == WorkflowState::On && ready {
            WorkflowState::On
        } else {
            WorkflowState::Off
        };
        workflow.signature = Some(signature);

        store.edit(workflow).await.context(SaveError::PersistFailed { key: key.clone() })?;
        info!(workflow_key = %key, state = %store.workflow().state, "workflow updated");

        let mut record = match self.notifications.get_subscriber_information_by_key(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(workflow_key = %key, "no subscriber information stored");
                SubscriberInformation::empty(key.clone())
            }
            Err(report) => {
                warn!(workflow_key = %key, error = %report, "failed to fetch subscriber information");
                SubscriberInformation::empty(key.clone())
            }
        };

        let channels = NotificationChannel::from_workflow(store.workflow());
        if channels.is_empty() {
            return Ok(NotificationSync::NotRequired);
        }
        for channel in &channels {
            channel.apply(&mut record);
        }
        let response = self.notifications.update_subscriber_information(&record).await;
        Ok(sync_outcome(key, response))
    }

    async fn create(
        &self,
        store: &mut WorkflowStore,
        user: &str,
    ) -> Result<(WorkflowKey, NotificationSync), Report<SaveError>> {
        let key = WorkflowKey::staging();
        store
            .save(key.clone())
            .await
            .context(SaveError::PersistFailed { key: key.clone() })?;

        let workflow = store.workflow();
        let channels = NotificationChannel::from_workflow(workflow);
        if channels.is_empty() {
            return Ok((key, NotificationSync::NotRequired));
        }

        let limit = workflow
            .trigger
            .input
            .get(BORROW_LIMIT_OVER)
            .cloned()
            .unwrap_or(JsonValue::Null);
        let mut record =
            SubscriberInformation::new(key.clone(), user, vec![Condition::borrow_limit_over(limit)]);
        for channel in &channels {
            channel.apply(&mut record);
        }
        let response = self.notifications.add_subscriber_information(&record).await;
        let notification = sync_outcome(&key, response);
        Ok((key, notification))
    }
}

fn sync_outcome(
    key: &WorkflowKey,
    response: Result<ApiResponse, Report<NotificationError>>,
) -> NotificationSync {
    match response {
        Ok(response) if response.is_success() => {
            debug!(workflow_key = %key, "subscriber information synced");
            NotificationSync::Synced
        }
        Ok(response) => {
            warn!(workflow_key = %key, code = ?response.code, "notification backend rejected subscriber information");
            NotificationSync::Rejected {
                code: response.code,
            }
        }
        Err(report) => {
            warn!(workflow_key = %key, error = %report, "failed to sync subscriber information");
            NotificationSync::Failed {
                reason: report.current_context().to_string(),
            }
        }
    }
}

async fn run_pipeline(
    workflow: &Workflow,
    key: &WorkflowKey,
    wallet: Option<&dyn WalletClient>,
) -> PipelineState {
    if !is_topup_workflow(workflow) {
        debug!(workflow_key = %key, "not a top-up automation");
        return PipelineState::Idle;
    }
    let Some(wallet) = wallet else {
        info!(workflow_key = %key, "no wallet, skipping top-up registration");
        return PipelineState::Idle;
    };

    let mut pipeline = TopupPipeline::new();
    info!(workflow_key = %key, run_id = %pipeline.run_id(), "starting top-up registration");
    if let Err(report) = pipeline.run(wallet, workflow).await {
        warn!(workflow_key = %key, error = %report, "top-up registration failed");
    }
    pipeline.state().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep_link::RecordingOpener;
    use async_trait::async_trait;
    use loanshark_chain::{Address, ChainError, PipelineStage, TransactionRequest, TxReceipt};
    use loanshark_notification::{ApiCall, InMemoryNotificationApi, SubscriptionStatus};
    use loanshark_workflow::{
        InMemoryWorkflowRepository, Step, StepFlags, StepPath, StoreError, WorkflowRepository,
    };
    use std::sync::Mutex;

    const USER: &str = "eip155:1:0xabc";
    const DONE: StepFlags = StepFlags {
        selected: true,
        authenticated: true,
        configured: true,
        tested: true,
    };

    struct Harness {
        repository: Arc<InMemoryWorkflowRepository>,
        api: InMemoryNotificationApi,
        opener: RecordingOpener,
        orchestrator: SaveOrchestrator,
    }

    fn harness() -> Harness {
        let repository = Arc::new(InMemoryWorkflowRepository::new());
        let api = InMemoryNotificationApi::new();
        let opener = RecordingOpener::new();
        let orchestrator = SaveOrchestrator::new(
            Arc::new(api.clone()),
            Arc::new(opener.clone()),
            TelegramConfig {
                bot_url: "https://t.me/TestBot".to_string(),
            },
        );
        Harness {
            repository,
            api,
            opener,
            orchestrator,
        }
    }

    fn request(route_key: Option<WorkflowKey>) -> SaveRequest {
        SaveRequest {
            route_key,
            user: USER.to_string(),
        }
    }

    fn telegram_workflow() -> Workflow {
        Workflow::new(USER, Step::trigger("notify", "condition").with_input(BORROW_LIMIT_OVER, "80"))
            .with_action(Step::action("telegram", "subscribe").with_input("username", "alice"))
    }

    fn topup_workflow() -> Workflow {
        Workflow::new(
            USER,
            Step::trigger("aave", "changeInHealthFactor").with_input("healthFactorIsBelow", "1.5"),
        )
        .with_action(
            Step::action("smartVault", "topup")
                .with_input("percentageOfYourDepositeUsedForEachTopUp", "50"),
        )
    }

    #[derive(Default)]
    struct RegistrationFails {
        sent: Mutex<Vec<TransactionRequest>>,
    }

    #[async_trait]
    impl WalletClient for RegistrationFails {
        async fn request_accounts(&self) -> Result<Vec<Address>, Report<ChainError>> {
            Ok(vec![Address::from_bytes([0xab; 20])])
        }

        async fn token_balance(&self, _token: &Address, _owner: &Address) -> Result<u128, Report<ChainError>> {
            Ok(1_000_000)
        }

        async fn exchange_rate(&self, _pool: &Address) -> Result<u128, Report<ChainError>> {
            Err(ChainError::NoAccounts.into())
        }

        async fn send_transaction(&self, request: TransactionRequest) -> Result<TxReceipt, Report<ChainError>> {
            let registering = request.value > 0;
            self.sent.lock().unwrap().push(request);
            if registering {
                return Err(ChainError::TransactionReverted {
                    hash: "0xbad".to_string(),
                }
                .into());
            }
            Ok(TxReceipt {
                transaction_hash: "0x01".to_string(),
                block_number: Some(7),
            })
        }
    }

    #[tokio::test]
    async fn new_workflow_gets_staging_key() {
        let h = harness();
        let mut store = WorkflowStore::new(h.repository.clone(), telegram_workflow());

        let outcome = h.orchestrator.save(&mut store, request(None), None).await.expect("save");

        assert!(outcome.key.is_staging());
        assert_eq!(store.key(), Some(&outcome.key));
        assert!(h.repository.get(&outcome.key).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn telegram_action_enables_record_and_opens_bot() {
        let h = harness();
        let mut store = WorkflowStore::new(h.repository.clone(), telegram_workflow());

        let outcome = h.orchestrator.save(&mut store, request(None), None).await.expect("save");

        assert_eq!(outcome.notification, NotificationSync::Synced);
        let record = h.api.record(&outcome.key).expect("record");
        assert_eq!(record.notification.telegram.status, SubscriptionStatus::On);
        assert_eq!(record.notification.telegram.username, "alice");
        assert_eq!(record.address, "0xabc");
        assert_eq!(record.condition, vec![Condition::borrow_limit_over("80".into())]);

        let link = format!("https://t.me/TestBot?start={}", outcome.key);
        assert_eq!(h.opener.opened(), vec![link.clone()]);
        assert_eq!(outcome.telegram_link, Some(link));
    }

    #[tokio::test]
    async fn no_notification_actions_skip_the_backend() {
        let h = harness();
        let workflow = Workflow::new(USER, Step::trigger("notify", "condition"))
            .with_action(Step::action("uniswap", "swap"));
        let mut store = WorkflowStore::new(h.repository.clone(), workflow);

        let created = h.orchestrator.save(&mut store, request(None), None).await.expect("create");
        assert_eq!(created.notification, NotificationSync::NotRequired);

        let updated = h
            .orchestrator
            .save(&mut store, request(Some(created.key.clone())), None)
            .await
            .expect("update");
        assert_eq!(updated.notification, NotificationSync::NotRequired);

        let calls = h.api.calls();
        assert!(!calls.contains(&ApiCall::Add));
        assert!(!calls.contains(&ApiCall::Update));
        assert!(h.opener.opened().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_on_only_when_ready() {
        let h = harness();
        let key: WorkflowKey = "staging-existing".parse().expect("key");
        let mut workflow = telegram_workflow();
        workflow.key = Some(key.clone());
        workflow.state = WorkflowState::On;
        h.repository.create(&key, &workflow).await.expect("seed");

        let mut store = WorkflowStore::load(h.repository.clone(), &key).await.expect("load");
        store.apply_step_flags(StepPath::Trigger, DONE);
        store.apply_step_flags(StepPath::Action(0), DONE);
        h.orchestrator
            .save(&mut store, request(Some(key.clone())), None)
            .await
            .expect("save ready");
        let saved = h.repository.get(&key).await.expect("get").expect("stored");
        assert_eq!(saved.state, WorkflowState::On);
        assert!(saved.system.is_none());
        assert!(saved.signature.is_some());

        assert!(store.ready_to_save());

        h.orchestrator
            .save(&mut store, request(Some(key.clone())), None)
            .await
            .expect("save unchanged");
        let saved = h.repository.get(&key).await.expect("get").expect("stored");
        assert_eq!(saved.state, WorkflowState::On);

        store.add_action();
        h.orchestrator
            .save(&mut store, request(Some(key.clone())), None)
            .await
            .expect("save not ready");
        let saved = h.repository.get(&key).await.expect("get").expect("stored");
        assert_eq!(saved.state, WorkflowState::Off);
    }

    #[tokio::test]
    async fn update_stays_off_when_it_was_off() {
        let h = harness();
        let key: WorkflowKey = "staging-off".parse().expect("key");
        let mut workflow = telegram_workflow();
        workflow.key = Some(key.clone());
        h.repository.create(&key, &workflow).await.expect("seed");

        let mut store = WorkflowStore::load(h.repository.clone(), &key).await.expect("load");
        store.apply_step_flags(StepPath::Trigger, DONE);
        store.apply_step_flags(StepPath::Action(0), DONE);
        h.orchestrator
            .save(&mut store, request(Some(key.clone())), None)
            .await
            .expect("save");
        assert_eq!(store.workflow().state, WorkflowState::Off);
    }

    #[tokio::test]
    async fn update_merges_into_stored_record() {
        let h = harness();
        let key: WorkflowKey = "staging-merge".parse().expect("key");
        let mut stored = SubscriberInformation::new(key.clone(), USER, vec![]);
        stored.notification.email.to_list = "old@example.com".to_string();
        stored.notification.telegram.chat_id = "12345".to_string();
        h.api.add_subscriber_information(&stored).await.expect("seed");

        let mut workflow = telegram_workflow();
        workflow.key = Some(key.clone());
        h.repository.create(&key, &workflow).await.expect("seed workflow");
        let mut store = WorkflowStore::load(h.repository.clone(), &key).await.expect("load");

        let outcome = h
            .orchestrator
            .save(&mut store, request(Some(key.clone())), None)
            .await
            .expect("save");

        assert_eq!(outcome.notification, NotificationSync::Synced);
        let record = h.api.record(&key).expect("record");
        assert_eq!(record.notification.telegram.status, SubscriptionStatus::On);
        assert_eq!(record.notification.telegram.chat_id, "");
        assert_eq!(record.notification.email.to_list, "old@example.com");
        assert_eq!(record.address, "0xabc");
    }

    #[tokio::test]
    async fn unreachable_backend_does_not_fail_the_save() {
        let h = harness();
        h.api.set_unavailable(true);
        let mut store = WorkflowStore::new(h.repository.clone(), telegram_workflow());

        let outcome = h.orchestrator.save(&mut store, request(None), None).await.expect("save");

        assert!(matches!(outcome.notification, NotificationSync::Failed { .. }));
        assert!(h.repository.get(&outcome.key).await.expect("get").is_some());
        assert_eq!(h.opener.opened().len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_fails_the_save() {
        struct Broken;

        #[async_trait]
        impl WorkflowRepository for Broken {
            async fn create(&self, _key: &WorkflowKey, _workflow: &Workflow) -> Result<(), Report<StoreError>> {
                Err(StoreError::Backend {
                    reason: "down".to_string(),
                }
                .into())
            }

            async fn update(&self, _workflow: &Workflow) -> Result<(), Report<StoreError>> {
                Err(StoreError::Backend {
                    reason: "down".to_string(),
                }
                .into())
            }

            async fn get(&self, _key: &WorkflowKey) -> Result<Option<Workflow>, Report<StoreError>> {
                Ok(None)
            }

            async fn delete(&self, key: &WorkflowKey) -> Result<(), Report<StoreError>> {
                Err(StoreError::NotFound { key: key.clone() }.into())
            }
        }

        let h = harness();
        let mut store = WorkflowStore::new(Arc::new(Broken), telegram_workflow());
        let err = h.orchestrator.save(&mut store, request(None), None).await.unwrap_err();

        assert!(matches!(err.current_context(), SaveError::PersistFailed { .. }));
        assert!(h.api.calls().is_empty());
        assert!(h.opener.opened().is_empty());
    }

    #[tokio::test]
    async fn topup_registration_failure_is_reported() {
        let h = harness();
        let wallet = RegistrationFails::default();
        let mut store = WorkflowStore::new(h.repository.clone(), topup_workflow());

        let outcome = h
            .orchestrator
            .save(&mut store, request(None), Some(&wallet))
            .await
            .expect("save");

        assert!(matches!(
            outcome.pipeline,
            PipelineState::Failed {
                stage: PipelineStage::Registration,
                ..
            }
        ));
        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent.iter().filter(|tx| tx.value == 0).count(), 1);
    }

    #[tokio::test]
    async fn pipeline_is_skipped_without_wallet_or_topup() {
        let h = harness();
        let wallet = RegistrationFails::default();

        let mut store = WorkflowStore::new(h.repository.clone(), topup_workflow());
        let outcome = h.orchestrator.save(&mut store, request(None), None).await.expect("save");
        assert_eq!(outcome.pipeline, PipelineState::Idle);

        let mut store = WorkflowStore::new(h.repository.clone(), telegram_workflow());
        let outcome = h
            .orchestrator
            .save(&mut store, request(None), Some(&wallet))
            .await
            .expect("save");
        assert_eq!(outcome.pipeline, PipelineState::Idle);
        assert!(wallet.sent.lock().unwrap().is_empty());
    }
}
