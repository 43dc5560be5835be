//! Wallet session establishment and verification
//!
//! A session only exists after the full chain of checks passed: provider
//! present, network switched and verified, account granted, both contract
//! handles built. It is replaced wholesale on reconnect, never patched.

use crate::config::Settings;
use crate::contract::{CollectionHandle, StakingHandle};
use crate::error::{StakingError, StakingResult};
use crate::status::{StatusChannel, StatusEvent};
use crate::store::PreferenceStore;
use crate::wallet::provider::{map_wallet_error, ProviderError, WalletProvider};

use ethers::types::Address;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for a connection attempt
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Skip prompting when no account is selected and the user previously
    /// declined the prompt
    pub suppress_prompt_if_previously_declined: bool,
}

impl ConnectOptions {
    /// First, user-initiated connect: always allowed to prompt
    pub fn prompting() -> Self {
        Self {
            suppress_prompt_if_previously_declined: false,
        }
    }

    /// Background re-verification: never re-prompt a user who declined
    pub fn suppressed() -> Self {
        Self {
            suppress_prompt_if_previously_declined: true,
        }
    }
}

/// A verified wallet session
///
/// Invariant: the staking and collection handles are constructed together;
/// a session never exists with only one of them.
#[derive(Clone)]
pub struct Session {
    pub address: Address,
    pub chain_id: u64,
    pub staking: StakingHandle,
    pub collection: CollectionHandle,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("staking", &self.staking.address())
            .field("collection", &self.collection.address())
            .finish()
    }
}

/// Connection manager for the single configured network
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    settings: Settings,
    store: Arc<PreferenceStore>,
    status: StatusChannel,
}

impl SessionManager {
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        settings: Settings,
        store: Arc<PreferenceStore>,
        status: StatusChannel,
    ) -> Self {
        Self {
            provider,
            settings,
            store,
            status,
        }
    }

    /// The wallet provider, if one exists in this environment
    pub fn provider(&self) -> StakingResult<Arc<dyn WalletProvider>> {
        self.provider.clone().ok_or(StakingError::ProviderMissing)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Establish a verified session.
    ///
    /// Returns `Ok(None)` when prompting was suppressed after a previous
    /// decline. Wallet and network failures are surfaced as blocking alerts
    /// and returned; unrecognized provider errors propagate unchanged.
    pub async fn connect(&self, options: ConnectOptions) -> StakingResult<Option<Session>> {
        let result = self.establish(options).await;

        if let Err(e) = &result {
            if let Some(text) = e.alert_text(&self.settings.network.name) {
                self.status.emit(StatusEvent::Alert { message: text });
            }
        }

        result
    }

    /// Re-verify the connection before a transaction, without re-prompting
    /// a user who previously declined
    pub async fn verify(&self) -> StakingResult<Option<Session>> {
        self.connect(ConnectOptions::suppressed()).await
    }

    async fn establish(&self, options: ConnectOptions) -> StakingResult<Option<Session>> {
        let provider = self.provider()?;

        if provider.selected_address().await.is_none()
            && options.suppress_prompt_if_previously_declined
            && self.store.prompt_declined()
        {
            debug!("No account selected and prompt previously declined; not prompting");
            return Ok(None);
        }

        // The switch prompt comes first so the account prompt already shows
        // the right network
        provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": self.settings.chain_id_hex() }]),
            )
            .await
            .map_err(|e| self.map_prompt_error(e))?;

        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|e| self.map_prompt_error(e))?;
        let address = parse_first_account(&accounts)?;

        // The switch request succeeding is not enough; verify what the wallet
        // actually landed on
        let active = provider.chain_id().await.unwrap_or(0);
        if active != self.settings.network.chain_id {
            return Err(StakingError::NetworkMismatch {
                expected: self.settings.network.chain_id,
                actual: active,
            });
        }

        let staking_address = self
            .settings
            .staking_address()
            .map_err(|e| StakingError::Config(e.to_string()))?;
        let staking = StakingHandle::new(staking_address, provider.clone());

        let collection_address = staking.nft_token().await?;
        let collection = CollectionHandle::new(collection_address, provider.clone());

        info!(
            "Wallet session established: {:?} on chain {} (staking {:?}, collection {:?})",
            address, active, staking_address, collection_address
        );

        Ok(Some(Session {
            address,
            chain_id: active,
            staking,
            collection,
        }))
    }

    /// Map a prompt-phase provider error, recording a decline when the user
    /// rejected the prompt
    fn map_prompt_error(&self, err: ProviderError) -> StakingError {
        let mapped = map_wallet_error(err);
        if matches!(mapped, StakingError::UserRejected) {
            if let Err(e) = self.store.record_declined(true) {
                warn!("Failed to persist declined-prompt flag: {}", e);
            }
        }
        mapped
    }
}

fn parse_first_account(accounts: &Value) -> StakingResult<Address> {
    accounts
        .as_array()
        .and_then(|list| list.first())
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<Address>().ok())
        .ok_or_else(|| {
            StakingError::Provider(ProviderError::transport("wallet returned no accounts"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::sample_settings;
    use crate::wallet::provider::testing::ScriptedProvider;
    use crate::wallet::provider::CODE_USER_REJECTED;
    use ethers::abi::Token;

    const CHAIN: u64 = 4;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn encoded_address(address: Address) -> Value {
        Value::String(format!(
            "0x{}",
            hex::encode(ethers::abi::encode(&[Token::Address(address)]))
        ))
    }

    struct Fixture {
        manager: SessionManager,
        provider: Arc<ScriptedProvider>,
        store: Arc<PreferenceStore>,
        status: StatusChannel,
        _dir: tempfile::TempDir,
    }

    fn fixture(provider: Option<ScriptedProvider>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")));
        let status = StatusChannel::new(32);
        let provider = provider.map(Arc::new);
        let manager = SessionManager::new(
            provider.clone().map(|p| p as Arc<dyn WalletProvider>),
            sample_settings(CHAIN),
            store.clone(),
            status.clone(),
        );
        Fixture {
            manager,
            provider: provider.unwrap_or_default(),
            store,
            status,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn missing_provider_fails_without_prompting() {
        let fx = fixture(None);
        let mut rx = fx.status.subscribe();

        let err = fx.manager.connect(ConnectOptions::prompting()).await.unwrap_err();
        assert!(matches!(err, StakingError::ProviderMissing));

        // The failure is alerted, but no wallet prompt was ever issued
        assert!(matches!(rx.recv().await.unwrap(), StatusEvent::Alert { .. }));
    }

    #[tokio::test]
    async fn suppressed_connect_after_decline_returns_none() {
        let fx = fixture(Some(ScriptedProvider::new()));
        fx.store.record_declined(true).unwrap();

        let session = fx.manager.connect(ConnectOptions::suppressed()).await.unwrap();
        assert!(session.is_none());
        assert!(fx.provider.calls().is_empty(), "no wallet request may be issued");
    }

    #[tokio::test]
    async fn chain_mismatch_after_switch_fails() {
        let user = addr(0xAA);
        let provider = ScriptedProvider::new()
            .with_selected(user)
            .with_chain(1)
            .expect("wallet_switchEthereumChain", Ok(Value::Null))
            .expect("eth_requestAccounts", Ok(json!([format!("{:?}", user)])));
        let fx = fixture(Some(provider));

        let err = fx.manager.connect(ConnectOptions::prompting()).await.unwrap_err();
        assert!(matches!(
            err,
            StakingError::NetworkMismatch { expected: CHAIN, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn rejection_records_the_declined_flag() {
        let provider = ScriptedProvider::new().with_chain(CHAIN).expect(
            "wallet_switchEthereumChain",
            Err(ProviderError {
                code: Some(CODE_USER_REJECTED),
                message: "User rejected the request.".into(),
            }),
        );
        let fx = fixture(Some(provider));

        let err = fx.manager.connect(ConnectOptions::prompting()).await.unwrap_err();
        assert!(matches!(err, StakingError::UserRejected));
        assert!(fx.store.prompt_declined());
    }

    #[tokio::test]
    async fn unrecognized_provider_errors_propagate() {
        let provider = ScriptedProvider::new().with_chain(CHAIN).expect(
            "wallet_switchEthereumChain",
            Err(ProviderError {
                code: Some(-32603),
                message: "internal".into(),
            }),
        );
        let fx = fixture(Some(provider));

        match fx.manager.connect(ConnectOptions::prompting()).await.unwrap_err() {
            StakingError::Provider(inner) => assert_eq!(inner.code, Some(-32603)),
            other => panic!("expected passthrough, got {:?}", other),
        }
        assert!(!fx.store.prompt_declined());
    }

    #[tokio::test]
    async fn successful_connect_builds_both_handles() {
        let user = addr(0xAA);
        let collection = addr(0xC0);
        let provider = ScriptedProvider::new()
            .with_selected(user)
            .with_chain(CHAIN)
            .expect("wallet_switchEthereumChain", Ok(Value::Null))
            .expect("eth_requestAccounts", Ok(json!([format!("{:?}", user)])))
            .expect("eth_call", Ok(encoded_address(collection)));
        let fx = fixture(Some(provider));

        let session = fx
            .manager
            .connect(ConnectOptions::prompting())
            .await
            .unwrap()
            .expect("session");

        assert_eq!(session.address, user);
        assert_eq!(session.chain_id, CHAIN);
        assert_eq!(
            session.staking.address(),
            fx.manager.settings().staking_address().unwrap()
        );
        assert_eq!(session.collection.address(), collection);
    }
}
