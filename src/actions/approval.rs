//! Operator approval gate
//!
//! Staking moves tokens, so the staking contract must be an approved operator
//! over the user's collection before any stake call can succeed.

use super::Actions;
use crate::error::StakingResult;
use crate::status::Control;
use crate::wallet::session::Session;

use tracing::{debug, info};

impl Actions {
    /// Ensure the staking contract is approved for the user's collection.
    ///
    /// True iff approval already existed or the approval transaction
    /// confirmed. The approve control is disabled while the transaction is in
    /// flight and re-enabled regardless of outcome.
    pub async fn ensure_approved(&self, session: &Session) -> StakingResult<bool> {
        let operator = session.staking.address();
        let already = session
            .collection
            .is_approved_for_all(session.address, operator)
            .await?;

        if already {
            debug!("Collection already approved for {:?}", operator);
            return Ok(true);
        }

        if !self.controls.try_disable(Control::Approve) {
            return Ok(false);
        }

        info!("Requesting collection approval for {:?}", operator);
        let approved = self
            .submitter
            .submit(
                (operator, true),
                "setApprovalForAll",
                session.collection.handle().abi(),
                session.collection.address(),
            )
            .await;

        self.controls.enable(Control::Approve);
        Ok(approved)
    }
}
