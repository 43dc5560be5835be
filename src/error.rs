//! Error types for stakedeck

use crate::wallet::provider::ProviderError;

use thiserror::Error;

/// Main error type for the staking client
#[derive(Error, Debug)]
pub enum StakingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No wallet provider is available")]
    ProviderMissing,

    #[error("Wallet is on chain {actual}, expected chain {expected}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("Wallet already has a pending account request")]
    AccountPending,

    #[error("User rejected the wallet prompt")]
    UserRejected,

    #[error("Wallet does not recognize the requested network")]
    UnrecognizedNetwork,

    #[error("Failed to encode {function}: {message}")]
    Encoding { function: String, message: String },

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Contract returned mismatched parallel arrays: {0}")]
    InvariantViolation(String),

    #[error("Token metadata error: {0}")]
    Metadata(String),

    #[error("Preference store error: {0}")]
    Store(String),

    /// Provider errors with no recognized vendor code propagate unchanged.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl StakingError {
    /// Check if the error is resolved by user action at the wallet
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            StakingError::ProviderMissing
                | StakingError::NetworkMismatch { .. }
                | StakingError::AccountPending
                | StakingError::UserRejected
                | StakingError::UnrecognizedNetwork
        )
    }

    /// Blocking alert text for wallet and network failures.
    ///
    /// Returns `None` for errors that are surfaced elsewhere (inline in the
    /// transaction modal, or propagated to the caller).
    pub fn alert_text(&self, network_name: &str) -> Option<String> {
        match self {
            StakingError::ProviderMissing => {
                Some("Please install a wallet to interact with this feature".to_string())
            }
            StakingError::NetworkMismatch { .. } => {
                Some(format!("Please switch your wallet network to {}", network_name))
            }
            StakingError::AccountPending => {
                Some("Please open your wallet and select an account".to_string())
            }
            StakingError::UserRejected => Some("Please connect with your wallet".to_string()),
            StakingError::UnrecognizedNetwork => {
                Some("Unrecognized network, please check your wallet and try again".to_string())
            }
            _ => None,
        }
    }
}

/// Result type for staking client operations
pub type StakingResult<T> = Result<T, StakingError>;
