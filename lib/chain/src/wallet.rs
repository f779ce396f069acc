//! Wallet client seam.

use crate::address::{Address, to_hex};
use crate::error::ChainError;
use async_trait::async_trait;
use rootcause::Report;
use serde::Serialize;

/// A transaction to sign and submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sending account.
    pub from: Address,
    /// Called contract.
    pub to: Address,
    /// Calldata.
    pub data: Vec<u8>,
    /// Wei sent along.
    pub value: u128,
}

impl TransactionRequest {
    /// Creates a contract call sending no value.
    #[must_use]
    pub fn call(from: Address, to: Address, data: Vec<u8>) -> Self {
        Self {
            from,
            to,
            data,
            value: 0,
        }
    }

    /// Sets the wei sent along.
    #[must_use]
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Returns the JSON-RPC form of the transaction.
    #[must_use]
    pub fn to_rpc(&self) -> RpcTransaction {
        RpcTransaction {
            from: self.from.to_string(),
            to: self.to.to_string(),
            data: to_hex(&self.data),
            value: (self.value > 0).then(|| format!("{:#x}", self.value)),
        }
    }
}

/// Transaction object of `eth_sendTransaction` and `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcTransaction {
    from: String,
    to: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Block the transaction was mined in.
    pub block_number: Option<u64>,
}

/// Access to the user's wallet and chain state.
///
/// A client is handed to each save and lives only as long as that save.
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Asks the wallet for access to the user's accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the user refuses or the wallet is unreachable.
    async fn request_accounts(&self) -> Result<Vec<Address>, Report<ChainError>>;

    /// Reads an ERC-20 balance.
    async fn token_balance(&self, token: &Address, owner: &Address) -> Result<u128, Report<ChainError>>;

    /// Reads the deposit pool's LP token exchange rate.
    async fn exchange_rate(&self, pool: &Address) -> Result<u128, Report<ChainError>>;

    /// Signs and submits a transaction, returning once it is mined.
    ///
    /// # Errors
    ///
    /// Returns an error if submission fails or the mined transaction reverted.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxReceipt, Report<ChainError>>;
}
