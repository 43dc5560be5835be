//! Transaction submitter
//!
//! Encodes a contract call, dispatches it through the wallet as a zero-value
//! transaction, and waits for inclusion. Lifecycle is surfaced through the
//! status channel as the modal the front-end renders. No retries: a failure
//! leaves the modal open and the user re-triggers the action.

use crate::error::{StakingError, StakingResult};
use crate::status::{StatusChannel, StatusEvent};
use crate::tx::pending::PendingTransaction;
use crate::wallet::provider::{map_wallet_error, WalletProvider};
use crate::wallet::session::{Session, SessionManager};

use ethers::abi::Tokenize;
use ethers::contract::BaseContract;
use ethers::types::{Address, H256};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const WALLET_FAILURE_TEXT: &str = "Error with wallet connection. Please refresh and try again.";
const TX_FAILURE_TEXT: &str = "Error with transaction. Please refresh and try again!";

pub struct TransactionSubmitter {
    sessions: Arc<SessionManager>,
    status: StatusChannel,
    explorer_tx_url: String,
    receipt_poll: Duration,
}

impl TransactionSubmitter {
    pub fn new(sessions: Arc<SessionManager>, status: StatusChannel) -> Self {
        let settings = sessions.settings();
        let explorer_tx_url = settings.network.explorer_tx_url.clone();
        let receipt_poll = Duration::from_millis(settings.client.receipt_poll_ms);
        Self {
            sessions,
            status,
            explorer_tx_url,
            receipt_poll,
        }
    }

    /// Submit `function_name(args)` as a zero-value transaction to `target`.
    ///
    /// Returns true only after on-chain confirmation. Every failure mode ends
    /// up as inline modal text and `false`; the caller decides whether to
    /// re-trigger.
    pub async fn submit<T: Tokenize + Send>(
        &self,
        args: T,
        function_name: &str,
        abi: &BaseContract,
        target: Address,
    ) -> bool {
        self.status.emit(StatusEvent::ModalOpened);

        // The wallet may have changed underneath us since connect
        let session = match self.sessions.verify().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                error!("Session re-verification suppressed; cannot submit {}", function_name);
                self.fail_modal(WALLET_FAILURE_TEXT);
                return false;
            }
            Err(e) => {
                error!("Session re-verification failed: {}", e);
                self.fail_modal(WALLET_FAILURE_TEXT);
                return false;
            }
        };

        match self.drive(&session, args, function_name, abi, target).await {
            Ok(()) => true,
            Err(e) => {
                error!("{} submission failed: {}", function_name, e);
                self.fail_modal(TX_FAILURE_TEXT);
                false
            }
        }
    }

    async fn drive<T: Tokenize + Send>(
        &self,
        session: &Session,
        args: T,
        function_name: &str,
        abi: &BaseContract,
        target: Address,
    ) -> StakingResult<()> {
        let payload = abi.encode(function_name, args).map_err(|e| StakingError::Encoding {
            function: function_name.to_string(),
            message: e.to_string(),
        })?;

        let mut pending = PendingTransaction::build(function_name, payload.clone(), target);
        debug!(
            "Built {} ({}, {} bytes calldata, {})",
            pending.function_name,
            pending.id,
            pending.payload.len(),
            pending.status.as_str()
        );

        let provider = self.sessions.provider()?;
        let raw_hash = provider
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": format!("{:?}", session.address),
                    "to": format!("{:?}", target),
                    "value": "0x0",
                    "data": format!("0x{}", hex::encode(payload.as_ref())),
                }]),
            )
            .await
            .map_err(map_wallet_error)?;

        let hash: H256 = raw_hash
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StakingError::Submission("wallet returned no transaction hash".into()))?;
        pending.mark_submitted(hash);

        let explorer_url = format!("{}{:?}", self.explorer_tx_url, hash);
        info!("Transaction submitted ({}): {:?} -> {:?}", pending.id, hash, pending.target);
        self.status.emit(StatusEvent::TransactionSubmitted { hash, explorer_url });

        // Wait for inclusion. There is no timeout; the user can only wait
        // or refresh.
        if self.await_inclusion(&provider, hash).await? {
            pending.mark_confirmed();
            let elapsed = chrono::Utc::now().signed_duration_since(pending.created_at);
            info!(
                "Transaction confirmed in {}ms: {:?}",
                elapsed.num_milliseconds(),
                hash
            );
            self.status.emit(StatusEvent::TransactionConfirmed { hash });
            self.status.emit(StatusEvent::ModalClosed);
            Ok(())
        } else {
            pending.mark_failed();
            Err(StakingError::Submission(format!("transaction {:?} reverted", hash)))
        }
    }

    /// Poll for the transaction receipt; true when included successfully,
    /// false when included but reverted
    async fn await_inclusion(
        &self,
        provider: &Arc<dyn WalletProvider>,
        hash: H256,
    ) -> StakingResult<bool> {
        loop {
            let receipt = provider
                .request("eth_getTransactionReceipt", json!([format!("{:?}", hash)]))
                .await
                .map_err(map_wallet_error)?;

            if !receipt.is_null() {
                let reverted = receipt.get("status").and_then(Value::as_str) == Some("0x0");
                return Ok(!reverted);
            }

            tokio::time::sleep(self.receipt_poll).await;
        }
    }

    fn fail_modal(&self, message: &str) {
        self.status.emit(StatusEvent::TransactionFailed {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::sample_settings;
    use crate::contract::abi::COLLECTION_ABI;
    use crate::store::PreferenceStore;
    use crate::wallet::provider::testing::ScriptedProvider;
    use ethers::abi::Token;
    use tokio::sync::broadcast::error::TryRecvError;

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

    /// Script the verification prefix every submit performs
    fn verified(provider: ScriptedProvider, user: Address, collection: Address) -> ScriptedProvider {
        provider
            .with_selected(user)
            .with_chain(CHAIN)
            .expect("wallet_switchEthereumChain", Ok(Value::Null))
            .expect("eth_requestAccounts", Ok(json!([format!("{:?}", user)])))
            .expect("eth_call", Ok(encoded_address(collection)))
    }

    struct Fixture {
        submitter: TransactionSubmitter,
        provider: Arc<ScriptedProvider>,
        status: StatusChannel,
        _dir: tempfile::TempDir,
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")));
        let status = StatusChannel::new(64);
        let provider = Arc::new(provider);
        let sessions = Arc::new(SessionManager::new(
            Some(provider.clone() as Arc<dyn WalletProvider>),
            sample_settings(CHAIN),
            store,
            status.clone(),
        ));
        let submitter = TransactionSubmitter::new(sessions, status.clone());
        Fixture {
            submitter,
            provider,
            status,
            _dir: dir,
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }

    #[tokio::test]
    async fn approval_submission_shows_hash_and_confirms() {
        let user = addr(0xAA);
        let collection = addr(0xC0);
        let operator = addr(0x11);
        let hash = H256::from([0xFE; 32]);

        let provider = verified(ScriptedProvider::new(), user, collection)
            .expect("eth_sendTransaction", Ok(json!(format!("{:?}", hash))))
            .expect("eth_getTransactionReceipt", Ok(Value::Null))
            .expect("eth_getTransactionReceipt", Ok(json!({ "status": "0x1" })));
        let fx = fixture(provider);
        let mut rx = fx.status.subscribe();

        let confirmed = fx
            .submitter
            .submit((operator, true), "setApprovalForAll", &COLLECTION_ABI, collection)
            .await;
        assert!(confirmed);

        let events = drain(&mut rx);
        assert!(matches!(events[0], StatusEvent::ModalOpened));
        match &events[1] {
            StatusEvent::TransactionSubmitted { hash: seen, explorer_url } => {
                assert_eq!(*seen, hash);
                assert!(explorer_url.starts_with("https://rinkeby.etherscan.io/tx/0x"));
                assert!(explorer_url.ends_with(&format!("{:?}", hash)[2..]));
            }
            other => panic!("expected submitted event, got {:?}", other),
        }
        assert!(matches!(events[2], StatusEvent::TransactionConfirmed { .. }));
        assert!(matches!(events[3], StatusEvent::ModalClosed));
    }

    #[tokio::test]
    async fn reverted_transaction_fails_and_leaves_modal_open() {
        let user = addr(0xAA);
        let collection = addr(0xC0);
        let hash = H256::from([0x01; 32]);

        let provider = verified(ScriptedProvider::new(), user, collection)
            .expect("eth_sendTransaction", Ok(json!(format!("{:?}", hash))))
            .expect("eth_getTransactionReceipt", Ok(json!({ "status": "0x0" })));
        let fx = fixture(provider);
        let mut rx = fx.status.subscribe();

        let confirmed = fx
            .submitter
            .submit((addr(0x11), true), "setApprovalForAll", &COLLECTION_ABI, collection)
            .await;
        assert!(!confirmed);

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, StatusEvent::TransactionFailed { .. })));
        assert!(!events.iter().any(|e| matches!(e, StatusEvent::ModalClosed)));
    }

    #[tokio::test]
    async fn encoding_failure_never_reaches_the_wallet() {
        let user = addr(0xAA);
        let collection = addr(0xC0);

        let provider = verified(ScriptedProvider::new(), user, collection);
        let fx = fixture(provider);

        let confirmed = fx
            .submitter
            .submit((), "notAFunction", &COLLECTION_ABI, collection)
            .await;
        assert!(!confirmed);
        assert!(!fx.provider.calls().iter().any(|m| m == "eth_sendTransaction"));
    }

    #[tokio::test]
    async fn failed_verification_fails_the_submission() {
        // Wallet drifted to another chain between connect and submit
        let user = addr(0xAA);
        let provider = ScriptedProvider::new()
            .with_selected(user)
            .with_chain(1)
            .expect("wallet_switchEthereumChain", Ok(Value::Null))
            .expect("eth_requestAccounts", Ok(json!([format!("{:?}", user)])));
        let fx = fixture(provider);
        let mut rx = fx.status.subscribe();

        let confirmed = fx
            .submitter
            .submit((addr(0x11), true), "setApprovalForAll", &COLLECTION_ABI, addr(0xC0))
            .await;
        assert!(!confirmed);
        assert!(!fx.provider.calls().iter().any(|m| m == "eth_sendTransaction"));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, StatusEvent::TransactionFailed { .. })));
    }
}
