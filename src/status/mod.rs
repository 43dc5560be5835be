//! UI status channel
//!
//! The core never renders anything. It emits status events on a broadcast
//! channel and the front-end subscribes: modal lifecycle for transactions,
//! blocking alerts for wallet failures, and control enable/disable changes.

use ethers::types::H256;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// User-facing controls the core enables and disables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Connect,
    Approve,
    Stake,
    Unstake,
    Claim,
}

impl Control {
    pub fn label(&self) -> &'static str {
        match self {
            Control::Connect => "connect",
            Control::Approve => "approve",
            Control::Stake => "stake",
            Control::Unstake => "unstake",
            Control::Claim => "claim",
        }
    }
}

/// Events surfaced to the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatusEvent {
    /// Transaction modal opened in its building state
    ModalOpened,

    /// Transaction accepted by the wallet; hash and explorer link available
    TransactionSubmitted { hash: H256, explorer_url: String },

    /// Transaction included on chain
    TransactionConfirmed { hash: H256 },

    /// Inline modal failure; the modal stays open for manual dismissal
    TransactionFailed { message: String },

    /// Modal closed automatically after success
    ModalClosed,

    /// Blocking alert for wallet and network failures
    Alert { message: String },

    /// A control was enabled or disabled
    ControlChanged { control: Control, enabled: bool },
}

impl StatusEvent {
    /// Get event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            StatusEvent::ModalOpened => "modal_opened",
            StatusEvent::TransactionSubmitted { .. } => "transaction_submitted",
            StatusEvent::TransactionConfirmed { .. } => "transaction_confirmed",
            StatusEvent::TransactionFailed { .. } => "transaction_failed",
            StatusEvent::ModalClosed => "modal_closed",
            StatusEvent::Alert { .. } => "alert",
            StatusEvent::ControlChanged { .. } => "control_changed",
        }
    }
}

/// Broadcast channel the rendering layer subscribes to
#[derive(Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; a missing subscriber is not an error
    pub fn emit(&self, event: StatusEvent) {
        tracing::debug!("status event: {}", event.name());
        let _ = self.tx.send(event);
    }
}
