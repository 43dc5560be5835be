//! User actions over an established session
//!
//! Each action disables its triggering control for its whole duration (the
//! only concurrency guard), routes the contract call through the transaction
//! submitter, and commits tile placement only after confirmation.

pub mod approval;
pub mod rewards;

use crate::status::{Control, StatusChannel, StatusEvent};
use crate::tokens::{Placement, TokenLedger};
use crate::tx::TransactionSubmitter;
use crate::wallet::session::Session;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Enabled state per control, surfaced to the front-end as status events
pub struct ControlRegistry {
    states: DashMap<Control, bool>,
    status: StatusChannel,
}

impl ControlRegistry {
    pub fn new(status: StatusChannel) -> Self {
        Self {
            states: DashMap::new(),
            status,
        }
    }

    /// Disable a control for the duration of an action. False when it is
    /// already disabled: an action is in flight or the control is gated off.
    pub fn try_disable(&self, control: Control) -> bool {
        {
            let mut entry = self.states.entry(control).or_insert(true);
            if !*entry {
                return false;
            }
            *entry = false;
        }
        self.status.emit(StatusEvent::ControlChanged {
            control,
            enabled: false,
        });
        true
    }

    pub fn set_enabled(&self, control: Control, enabled: bool) {
        self.states.insert(control, enabled);
        self.status.emit(StatusEvent::ControlChanged { control, enabled });
    }

    pub fn enable(&self, control: Control) {
        self.set_enabled(control, true);
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.states.get(&control).map(|v| *v).unwrap_or(true)
    }
}

/// Action handlers; rendering subscribes to their outcomes, never the reverse
pub struct Actions {
    submitter: Arc<TransactionSubmitter>,
    ledger: Arc<TokenLedger>,
    controls: ControlRegistry,
}

impl Actions {
    pub fn new(
        submitter: Arc<TransactionSubmitter>,
        ledger: Arc<TokenLedger>,
        status: StatusChannel,
    ) -> Self {
        Self {
            submitter,
            ledger,
            controls: ControlRegistry::new(status),
        }
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    /// Stake every tile toggled towards staked, as one batched call
    pub async fn stake_selected(&self, session: &Session) -> bool {
        if !self.controls.try_disable(Control::Stake) {
            warn!("Stake control is disabled; ignoring");
            return false;
        }
        let result = self.move_batch(session, Placement::Staked).await;
        self.controls.enable(Control::Stake);
        result
    }

    /// Unstake every tile toggled towards stakable, as one batched call
    pub async fn unstake_selected(&self, session: &Session) -> bool {
        if !self.controls.try_disable(Control::Unstake) {
            warn!("Unstake control is disabled; ignoring");
            return false;
        }
        let result = self.move_batch(session, Placement::Stakable).await;
        self.controls.enable(Control::Unstake);
        result
    }

    async fn move_batch(&self, session: &Session, to: Placement) -> bool {
        let (ids, function) = match to {
            Placement::Staked => (self.ledger.pending_stake().await, "stakeNFT"),
            Placement::Stakable => (self.ledger.pending_unstake().await, "unStakeNFT"),
        };

        if ids.is_empty() {
            info!("No tiles toggled for {}", function);
            return false;
        }

        let confirmed = self
            .submitter
            .submit(
                ids.clone(),
                function,
                session.staking.handle().abi(),
                session.staking.address(),
            )
            .await;

        if confirmed {
            self.ledger.commit(&ids, to).await;
            info!("{} confirmed for {} tokens", function, ids.len());
        }
        confirmed
    }

    /// Claim rewards for each staked tile toggled out.
    ///
    /// claimRewards takes one token id, so the toggled set is submitted
    /// sequentially; each confirmed claim moves that token's tile. Stops at
    /// the first failure, leaving the rest untouched for a manual re-trigger.
    pub async fn claim_selected(&self, session: &Session) -> bool {
        if !self.controls.try_disable(Control::Claim) {
            warn!("Claim control is disabled; ignoring");
            return false;
        }
        let result = self.claim_inner(session).await;
        self.controls.enable(Control::Claim);
        result
    }

    async fn claim_inner(&self, session: &Session) -> bool {
        match session.staking.user_can_claim().await {
            Ok(true) => {}
            Ok(false) => {
                info!("User cannot claim yet");
                return false;
            }
            Err(e) => {
                warn!("Claim eligibility check failed: {}", e);
                return false;
            }
        }

        let ids = self.ledger.pending_unstake().await;
        if ids.is_empty() {
            info!("No tiles toggled for claimRewards");
            return false;
        }

        for id in ids {
            let confirmed = self
                .submitter
                .submit(
                    id,
                    "claimRewards",
                    session.staking.handle().abi(),
                    session.staking.address(),
                )
                .await;

            if !confirmed {
                return false;
            }
            self.ledger.commit(&[id], Placement::Stakable).await;
            info!("claimRewards confirmed for token {}", id);
        }

        true
    }
}
