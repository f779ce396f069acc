//! On-chain side of loanshark top-up automations.
//!
//! Saving a top-up workflow grants the top-up action contract an allowance
//! over the user's LP tokens and registers the automation with it. This
//! crate provides:
//!
//! - **Addresses and amounts**: validated addresses, bytes32 words and
//!   base-unit arithmetic
//! - **ABI**: calldata for the handful of contract calls involved
//! - **Wallet**: the [`WalletClient`] seam and a JSON-RPC implementation
//! - **Top-up pipeline**: the approve-then-register state machine

pub mod abi;
pub mod address;
pub mod amount;
pub mod contracts;
pub mod error;
pub mod rpc;
pub mod topup;
pub mod wallet;

pub use address::{Address, Bytes32};
pub use error::{ChainError, PipelineError};
pub use rpc::{ChainConfig, JsonRpcWallet};
pub use topup::{PipelineStage, PipelineState, RegisterArgs, TopupParams, TopupPipeline, TopupRecord};
pub use wallet::{TransactionRequest, TxReceipt, WalletClient};
