//! Tracked transaction lifecycle

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Building,
    Submitted,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Building => "building",
            TxStatus::Submitted => "submitted",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
        }
    }
}

/// One user-initiated contract call, tracked from encoding to its terminal
/// state. Never persisted.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub id: Uuid,
    pub function_name: String,
    pub payload: Bytes,
    pub target: Address,
    pub hash: Option<H256>,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn build(function_name: &str, payload: Bytes, target: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            function_name: function_name.to_string(),
            payload,
            target,
            hash: None,
            status: TxStatus::Building,
            created_at: Utc::now(),
        }
    }

    pub fn mark_submitted(&mut self, hash: H256) {
        self.hash = Some(hash);
        self.status = TxStatus::Submitted;
    }

    pub fn mark_confirmed(&mut self) {
        self.status = TxStatus::Confirmed;
    }

    pub fn mark_failed(&mut self) {
        self.status = TxStatus::Failed;
    }
}
