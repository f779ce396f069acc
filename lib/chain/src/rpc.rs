//! [`WalletClient`] over Ethereum JSON-RPC.
//!
//! Talks to a node or wallet endpoint that manages the user's accounts
//! (`eth_requestAccounts`, `eth_sendTransaction`). Transactions are followed
//! by polling `eth_getTransactionReceipt` until mined; there is no timeout.

use crate::abi;
use crate::address::{Address, to_hex};
use crate::error::ChainError;
use crate::wallet::{TransactionRequest, TxReceipt, WalletClient};
use async_trait::async_trait;
use rootcause::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Chain endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Interval between transaction receipt polls, in milliseconds.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: JsonValue,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: JsonValue,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn parse_quantity(value: &str) -> Option<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).ok()
}

fn check_status(method: &str, status: reqwest::StatusCode) -> Result<(), Report<ChainError>> {
    if status.is_success() {
        return Ok(());
    }
    Err(ChainError::Transport {
        method: method.to_string(),
        reason: format!("HTTP status {status}"),
    }
    .into())
}

/// Unwraps a JSON-RPC response body into its typed result.
fn decode_response<T: DeserializeOwned>(method: &str, body: RpcResponse) -> Result<T, Report<ChainError>> {
    if let Some(error) = body.error {
        return Err(ChainError::Rpc {
            method: method.to_string(),
            code: error.code,
            message: error.message,
        }
        .into());
    }
    serde_json::from_value(body.result).map_err(|e| {
        ChainError::InvalidResponse {
            method: method.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Turns a mined receipt into a [`TxReceipt`], failing on reverts.
fn receipt_outcome(receipt: RpcReceipt) -> Result<TxReceipt, Report<ChainError>> {
    if receipt.status.as_deref() == Some("0x0") {
        return Err(ChainError::TransactionReverted {
            hash: receipt.transaction_hash,
        }
        .into());
    }
    Ok(TxReceipt {
        block_number: receipt.block_number.as_deref().and_then(parse_quantity),
        transaction_hash: receipt.transaction_hash,
    })
}

/// Wallet reached through a JSON-RPC endpoint.
#[derive(Debug)]
pub struct JsonRpcWallet {
    http: reqwest::Client,
    rpc_url: String,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    /// Creates a wallet client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ChainConfig) -> Result<Self, Report<ChainError>> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChainError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: JsonValue,
    ) -> Result<T, Report<ChainError>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let transport = |reason: String| ChainError::Transport {
            method: method.to_string(),
            reason,
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;
        check_status(method, response.status())?;

        let body: RpcResponse = response.json().await.map_err(|e| ChainError::InvalidResponse {
            method: method.to_string(),
            reason: e.to_string(),
        })?;
        decode_response(method, body)
    }

    async fn view(&self, to: &Address, data: &[u8]) -> Result<u128, Report<ChainError>> {
        let result: String = self
            .call(
                "eth_call",
                json!([{"to": to.to_string(), "data": to_hex(data)}, "latest"]),
            )
            .await?;
        abi::decode_uint(&result)
    }
}

#[async_trait]
impl WalletClient for JsonRpcWallet {
    #[instrument(skip(self))]
    async fn request_accounts(&self) -> Result<Vec<Address>, Report<ChainError>> {
        let accounts: Vec<String> = self.call("eth_requestAccounts", json!([])).await?;
        accounts
            .iter()
            .map(|account| Address::parse(account))
            .collect()
    }

    #[instrument(skip(self), fields(token = %token, owner = %owner))]
    async fn token_balance(&self, token: &Address, owner: &Address) -> Result<u128, Report<ChainError>> {
        self.view(token, &abi::balance_of(owner)).await
    }

    #[instrument(skip(self), fields(pool = %pool))]
    async fn exchange_rate(&self, pool: &Address) -> Result<u128, Report<ChainError>> {
        self.view(pool, &abi::exchange_rate()).await
    }

    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxReceipt, Report<ChainError>> {
        let hash: String = self
            .call("eth_sendTransaction", json!([request.to_rpc()]))
            .await?;
        info!(tx_hash = %hash, "transaction submitted");

        loop {
            let receipt: Option<RpcReceipt> = self
                .call("eth_getTransactionReceipt", json!([hash]))
                .await?;
            let Some(receipt) = receipt else {
                debug!(tx_hash = %hash, "transaction pending");
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            let receipt = receipt_outcome(receipt)?;
            info!(tx_hash = %receipt.transaction_hash, block_number = ?receipt.block_number, "transaction mined");
            return Ok(receipt);
        }
    }
}
