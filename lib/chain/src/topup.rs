//! Top-up registration pipeline.
//!
//! Registering a top-up automation takes two transactions in strict order:
//! an ERC-20 approval letting the top-up action contract spend the user's
//! LP tokens, then the registration itself. The registration is only
//! submitted once the approval is mined.
//!
//! ```text
//! Idle -> AwaitingApproval -> Approved -> AwaitingRegistration -> Registered
//!              |                                  |
//!              +------------> Failed <------------+
//! ```
//!
//! A failed stage is never retried, and an approval granted before a failed
//! registration is left in place.

use crate::abi::{CallEncoder, REGISTER_SELECTOR, approve};
use crate::address::{Address, Bytes32};
use crate::amount::{apply_slippage, parse_decimal_units, percentage_of};
use crate::contracts::{
    ACTION_TOKEN, DEPOSIT_POOL, LP_TOKEN, REGISTRATION_GAS_DEPOSIT, TOKEN_DECIMALS, TOPUP_ACTION,
    protocol_tag,
};
use crate::error::{ChainError, PipelineError};
use crate::wallet::{TransactionRequest, TxReceipt, WalletClient};
use loanshark_core::PipelineRunId;
use loanshark_workflow::Workflow;
use rootcause::Report;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Connector whose action marks a workflow as a top-up automation.
pub const TOPUP_CONNECTOR: &str = "smartVault";
/// Trigger input holding the health factor threshold.
pub const HEALTH_FACTOR_INPUT: &str = "healthFactorIsBelow";
/// Action input holding the share of the deposit used per top-up.
pub const TOPUP_PERCENTAGE_INPUT: &str = "percentageOfYourDepositeUsedForEachTopUp";

/// Returns true if the workflow's first action is a smart vault top-up.
#[must_use]
pub fn is_topup_workflow(workflow: &Workflow) -> bool {
    workflow
        .actions
        .first()
        .is_some_and(|action| action.connector == TOPUP_CONNECTOR)
}

/// Amounts derived from a top-up workflow and the user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopupParams {
    /// Health factor threshold in 18-decimal units.
    pub threshold: u128,
    /// LP token balance committed to the automation.
    pub total_amount: u128,
    /// Amount used by each top-up.
    pub single_topup_amount: u128,
}

impl TopupParams {
    /// Derives the parameters from a workflow's inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger's health factor or the first action's
    /// percentage is missing or not a decimal number.
    pub fn from_workflow(workflow: &Workflow, total_amount: u128) -> Result<Self, Report<ChainError>> {
        let missing = |field: &str| ChainError::MissingInput {
            field: field.to_string(),
        };
        let health_factor = workflow
            .trigger
            .input_text(HEALTH_FACTOR_INPUT)
            .ok_or_else(|| missing(HEALTH_FACTOR_INPUT))?;
        let percentage = workflow
            .actions
            .first()
            .and_then(|action| action.input_text(TOPUP_PERCENTAGE_INPUT))
            .ok_or_else(|| missing(TOPUP_PERCENTAGE_INPUT))?;

        Ok(Self {
            threshold: parse_decimal_units(&health_factor, TOKEN_DECIMALS)?,
            total_amount,
            single_topup_amount: percentage_of(total_amount, &percentage)?,
        })
    }
}

/// The position record registered with the top-up action contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopupRecord {
    /// Health factor below which a top-up fires.
    pub threshold: u64,
    /// Keeper priority fee.
    pub priority_fee: u64,
    /// Keeper maximum fee.
    pub max_fee: u64,
    /// Token used to top up.
    pub action_token: Address,
    /// Token deposited.
    pub deposit_token: Address,
    /// Amount per top-up.
    pub single_topup_amount: u128,
    /// Amount over all top-ups.
    pub total_topup_amount: u128,
    /// Deposit token balance backing the top-ups.
    pub deposit_token_balance: u128,
    /// Protocol-specific extra data.
    pub extra: Bytes32,
}

/// Arguments of the top-up action contract's `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterArgs {
    /// Registering account, right-padded.
    pub account: Bytes32,
    /// Protocol tag.
    pub protocol: Bytes32,
    /// LP tokens deposited.
    pub deposit_amount: u128,
    /// Position record.
    pub record: TopupRecord,
}

impl RegisterArgs {
    /// Packs the registration for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold does not fit the contract's `uint64`.
    pub fn new(account: &Address, params: &TopupParams) -> Result<Self, Report<ChainError>> {
        let threshold = u64::try_from(params.threshold).map_err(|_| ChainError::AmountOverflow {
            what: format!("health factor threshold {}", params.threshold),
        })?;
        Ok(Self {
            account: Bytes32::right_padded(account),
            protocol: protocol_tag(),
            deposit_amount: params.total_amount,
            record: TopupRecord {
                threshold,
                priority_fee: 0,
                max_fee: 1,
                action_token: ACTION_TOKEN,
                deposit_token: LP_TOKEN,
                single_topup_amount: apply_slippage(params.single_topup_amount),
                total_topup_amount: apply_slippage(params.total_amount),
                deposit_token_balance: apply_slippage(params.total_amount),
                extra: Bytes32::from_u128(1),
            },
        })
    }

    /// Encodes the `register` calldata.
    #[must_use]
    pub fn calldata(&self) -> Vec<u8> {
        let record = &self.record;
        CallEncoder::new(REGISTER_SELECTOR)
            .word(&self.account)
            .word(&self.protocol)
            .uint(self.deposit_amount)
            .uint(u128::from(record.threshold))
            .uint(u128::from(record.priority_fee))
            .uint(u128::from(record.max_fee))
            .address(&record.action_token)
            .address(&record.deposit_token)
            .uint(record.single_topup_amount)
            .uint(record.total_topup_amount)
            .uint(record.deposit_token_balance)
            .word(&record.extra)
            .finish()
    }
}

/// Transaction stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Reading the balance and approving the allowance.
    Approval,
    /// Registering with the top-up action contract.
    Registration,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approval => write!(f, "approval"),
            Self::Registration => write!(f, "registration"),
        }
    }
}

/// State of a top-up pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Approval submitted, waiting to be mined.
    AwaitingApproval,
    /// Approval mined.
    Approved,
    /// Registration submitted, waiting to be mined.
    AwaitingRegistration,
    /// Registration mined.
    Registered,
    /// A stage failed; no further transitions.
    Failed {
        /// Failed stage.
        stage: PipelineStage,
        /// Failure description.
        reason: String,
    },
}

impl PipelineState {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Registered | Self::Failed { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Approved => "approved",
            Self::AwaitingRegistration => "awaiting_registration",
            Self::Registered => "registered",
            Self::Failed { .. } => "failed",
        }
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::AwaitingApproval)
                | (Self::AwaitingApproval, Self::Approved)
                | (Self::Approved, Self::AwaitingRegistration)
                | (Self::AwaitingRegistration, Self::Registered)
                | (Self::AwaitingApproval | Self::AwaitingRegistration, Self::Failed { .. })
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, reason } => write!(f, "failed at {stage}: {reason}"),
            other => f.write_str(other.name()),
        }
    }
}

/// One run of the approve-then-register pipeline.
#[derive(Debug)]
pub struct TopupPipeline {
    run_id: PipelineRunId,
    state: PipelineState,
    approval: Option<TxReceipt>,
    registration: Option<TxReceipt>,
    final_balance: Option<u128>,
}

impl Default for TopupPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TopupPipeline {
    /// Creates an idle pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: PipelineRunId::new(),
            state: PipelineState::Idle,
            approval: None,
            registration: None,
            final_balance: None,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn run_id(&self) -> PipelineRunId {
        self.run_id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Returns the mined approval, if any.
    #[must_use]
    pub fn approval(&self) -> Option<&TxReceipt> {
        self.approval.as_ref()
    }

    /// Returns the mined registration, if any.
    #[must_use]
    pub fn registration(&self) -> Option<&TxReceipt> {
        self.registration.as_ref()
    }

    /// Returns the LP token balance observed after registration.
    #[must_use]
    pub fn final_balance(&self) -> Option<u128> {
        self.final_balance
    }

    /// Moves to the next state.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is not allowed from the current state.
    pub fn transition(&mut self, next: PipelineState) -> Result<(), Report<PipelineError>> {
        if !self.state.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            }
            .into());
        }
        debug!(run_id = %self.run_id, from = self.state.name(), to = next.name(), "pipeline transition");
        self.state = next;
        Ok(())
    }

    /// Runs the pipeline for a top-up workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline was already run or a stage fails. A
    /// failed stage leaves the pipeline in [`PipelineState::Failed`].
    pub async fn run(
        &mut self,
        wallet: &dyn WalletClient,
        workflow: &Workflow,
    ) -> Result<(), Report<PipelineError>> {
        self.transition(PipelineState::AwaitingApproval)?;
        let (account, args) = match self.approve(wallet, workflow).await {
            Ok(prepared) => prepared,
            Err(report) => return Err(self.fail(PipelineStage::Approval, report)),
        };
        self.transition(PipelineState::Approved)?;

        self.transition(PipelineState::AwaitingRegistration)?;
        if let Err(report) = self.register(wallet, &account, &args).await {
            return Err(self.fail(PipelineStage::Registration, report));
        }
        self.transition(PipelineState::Registered)?;

        match wallet.token_balance(&LP_TOKEN, &account).await {
            Ok(balance) => {
                debug!(run_id = %self.run_id, balance, "post-registration balance");
                self.final_balance = Some(balance);
            }
            Err(report) => {
                warn!(run_id = %self.run_id, error = %report, "failed to read post-registration balance");
            }
        }
        Ok(())
    }

    async fn approve(
        &mut self,
        wallet: &dyn WalletClient,
        workflow: &Workflow,
    ) -> Result<(Address, RegisterArgs), Report<ChainError>> {
        let account = wallet
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(ChainError::NoAccounts)?;

        match wallet.exchange_rate(&DEPOSIT_POOL).await {
            Ok(rate) => debug!(run_id = %self.run_id, rate, "deposit pool exchange rate"),
            Err(report) => {
                warn!(run_id = %self.run_id, error = %report, "failed to read exchange rate");
            }
        }

        let total_amount = wallet.token_balance(&LP_TOKEN, &account).await?;
        let params = TopupParams::from_workflow(workflow, total_amount)?;
        let args = RegisterArgs::new(&account, &params)?;
        info!(
            run_id = %self.run_id,
            account = %account,
            total_amount,
            single_topup_amount = params.single_topup_amount,
            "approving top-up allowance"
        );

        let receipt = wallet
            .send_transaction(TransactionRequest::call(
                account,
                LP_TOKEN,
                approve(&TOPUP_ACTION, total_amount),
            ))
            .await?;
        self.approval = Some(receipt);
        Ok((account, args))
    }

    async fn register(
        &mut self,
        wallet: &dyn WalletClient,
        account: &Address,
        args: &RegisterArgs,
    ) -> Result<(), Report<ChainError>> {
        info!(run_id = %self.run_id, account = %account, "registering top-up");

        let receipt = wallet
            .send_transaction(
                TransactionRequest::call(*account, TOPUP_ACTION, args.calldata())
                    .with_value(REGISTRATION_GAS_DEPOSIT),
            )
            .await?;
        self.registration = Some(receipt);
        Ok(())
    }

    fn fail(&mut self, stage: PipelineStage, report: Report<ChainError>) -> Report<PipelineError> {
        let reason = report.current_context().to_string();
        error!(run_id = %self.run_id, %stage, %reason, "top-up pipeline failed");
        if stage == PipelineStage::Registration {
            warn!(run_id = %self.run_id, "top-up allowance remains approved");
        }
        self.state = PipelineState::Failed { stage, reason };
        report.context(PipelineError::StageFailed { stage })
    }
}
