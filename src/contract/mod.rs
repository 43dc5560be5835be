//! Contract proxies
//!
//! Typed handles over the wallet provider's request interface. Reads go
//! through `eth_call` and decode against the static ABIs; writes are encoded
//! here but always dispatched by the transaction submitter.

pub mod abi;

use crate::error::{StakingError, StakingResult};
use crate::wallet::provider::{map_wallet_error, ProviderError, WalletProvider};

use ethers::abi::{Detokenize, Tokenize};
use ethers::contract::BaseContract;
use ethers::types::{Address, Bytes, U256};
use serde_json::json;
use std::sync::Arc;

/// A read/write contract proxy bound to one address and ABI
#[derive(Clone)]
pub struct ContractHandle {
    address: Address,
    abi: BaseContract,
    provider: Arc<dyn WalletProvider>,
}

impl ContractHandle {
    pub fn new(address: Address, abi: BaseContract, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            address,
            abi,
            provider,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &BaseContract {
        &self.abi
    }

    /// Encode a call payload against this handle's ABI
    pub fn encode<T: Tokenize>(&self, function: &str, args: T) -> StakingResult<Bytes> {
        self.abi.encode(function, args).map_err(|e| StakingError::Encoding {
            function: function.to_string(),
            message: e.to_string(),
        })
    }

    /// View-only query through `eth_call`; no side effects
    pub async fn call<T: Tokenize, D: Detokenize>(
        &self,
        function: &str,
        args: T,
    ) -> StakingResult<D> {
        let data = self.encode(function, args)?;
        let params = json!([
            {
                "to": format!("{:?}", self.address),
                "data": format!("0x{}", hex::encode(data.as_ref())),
            },
            "latest",
        ]);

        let raw = self
            .provider
            .request("eth_call", params)
            .await
            .map_err(map_wallet_error)?;

        let hex_out = raw.as_str().ok_or_else(|| {
            StakingError::Provider(ProviderError::transport(format!(
                "eth_call {} returned no data",
                function
            )))
        })?;

        let bytes = hex::decode(hex_out.trim_start_matches("0x")).map_err(|e| {
            StakingError::Provider(ProviderError::transport(format!(
                "eth_call {} returned invalid hex: {}",
                function, e
            )))
        })?;

        self.abi.decode_output(function, bytes).map_err(|e| {
            StakingError::Provider(ProviderError::transport(format!(
                "eth_call {} output did not decode: {}",
                function, e
            )))
        })
    }
}

/// Proxy for the staking contract
#[derive(Clone)]
pub struct StakingHandle {
    inner: ContractHandle,
}

impl StakingHandle {
    pub fn new(address: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            inner: ContractHandle::new(address, abi::STAKING_ABI.clone(), provider),
        }
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }

    pub fn handle(&self) -> &ContractHandle {
        &self.inner
    }

    /// Address of the NFT collection this contract stakes
    pub async fn nft_token(&self) -> StakingResult<Address> {
        self.inner.call("nftToken", ()).await
    }

    /// Owned, stakable tokens as parallel (URIs, ids) sequences
    pub async fn token_uris(&self, owner: Address) -> StakingResult<(Vec<String>, Vec<U256>)> {
        self.inner.call("tokenURIs", owner).await
    }

    /// Already-staked tokens as parallel (URIs, ids) sequences
    pub async fn get_staked(&self, owner: Address) -> StakingResult<(Vec<String>, Vec<U256>)> {
        self.inner.call("getStaked", owner).await
    }

    pub async fn user_can_claim(&self) -> StakingResult<bool> {
        self.inner.call("userCanClaim", ()).await
    }

    pub async fn current_stake_earned(&self, token_id: U256) -> StakingResult<U256> {
        self.inner.call("getCurrentStakeEarned", token_id).await
    }

    pub async fn current_total_stake_earned(&self, owner: Address) -> StakingResult<U256> {
        self.inner.call("getCurrentTotalStakeEarned", owner).await
    }
}

/// Proxy for the token collection's approval surface
#[derive(Clone)]
pub struct CollectionHandle {
    inner: ContractHandle,
}

impl CollectionHandle {
    pub fn new(address: Address, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            inner: ContractHandle::new(address, abi::COLLECTION_ABI.clone(), provider),
        }
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }

    pub fn handle(&self) -> &ContractHandle {
        &self.inner
    }

    pub async fn is_approved_for_all(
        &self,
        owner: Address,
        operator: Address,
    ) -> StakingResult<bool> {
        self.inner.call("isApprovedForAll", (owner, operator)).await
    }
}
