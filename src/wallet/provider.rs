//! Wallet provider adapter
//!
//! The wallet (and the node behind it) is a black box reached only through a
//! JSON-RPC shaped request/response interface. Vendor-specific numeric error
//! codes are mapped to named error kinds here, at the adapter boundary, so
//! nothing downstream matches on numbers.

use crate::error::{StakingError, StakingResult};

use async_trait::async_trait;
use ethers::types::Address;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Wallet already has an account request open
pub const CODE_REQUEST_PENDING: i64 = -32002;
/// User declined the prompt
pub const CODE_USER_REJECTED: i64 = 4001;
/// Wallet does not know the requested chain
pub const CODE_UNRECOGNIZED_CHAIN: i64 = 4902;

/// Raw error from the wallet provider
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Vendor error code, when the provider supplied one
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Map a provider error to the named error taxonomy.
///
/// Unrecognized codes are not swallowed; they propagate unchanged.
pub fn map_wallet_error(err: ProviderError) -> StakingError {
    match err.code {
        Some(CODE_REQUEST_PENDING) => StakingError::AccountPending,
        Some(CODE_USER_REJECTED) => StakingError::UserRejected,
        Some(CODE_UNRECOGNIZED_CHAIN) => StakingError::UnrecognizedNetwork,
        _ => StakingError::Provider(err),
    }
}

/// Request/response interface to the wallet provider
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a wallet RPC request; may trigger provider-owned UI prompts
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Currently selected account, without prompting
    async fn selected_address(&self) -> Option<Address>;

    /// Active chain id, without prompting
    async fn chain_id(&self) -> Option<u64>;
}

/// HTTP JSON-RPC implementation talking to a wallet bridge endpoint
pub struct HttpWalletProvider {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpWalletProvider {
    pub fn new(endpoint: &str) -> StakingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StakingError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("wallet request {} (id {})", method, id);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("wallet unreachable: {}", e)))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("malformed wallet response: {}", e)))?;

        parse_rpc_response(payload)
    }

    async fn selected_address(&self) -> Option<Address> {
        // eth_accounts reads the selection without prompting
        match self.request("eth_accounts", json!([])).await {
            Ok(Value::Array(accounts)) => accounts
                .first()
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<Address>().ok()),
            Ok(_) => None,
            Err(e) => {
                warn!("eth_accounts failed: {}", e);
                None
            }
        }
    }

    async fn chain_id(&self) -> Option<u64> {
        match self.request("eth_chainId", json!([])).await {
            Ok(Value::String(hex_id)) => parse_hex_u64(&hex_id),
            Ok(_) => None,
            Err(e) => {
                warn!("eth_chainId failed: {}", e);
                None
            }
        }
    }
}

/// Split a JSON-RPC envelope into result or provider error
fn parse_rpc_response(payload: Value) -> Result<Value, ProviderError> {
    if let Some(err) = payload.get("error") {
        return Err(ProviderError {
            code: err.get("code").and_then(Value::as_i64),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string(),
        });
    }

    Ok(payload.get("result").cloned().unwrap_or(Value::Null))
}

/// Parse a 0x-prefixed hex quantity
pub fn parse_hex_u64(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok()
}
