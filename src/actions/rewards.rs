//! Reward queries
//!
//! View-only: claim eligibility and earned amounts. The claim transaction
//! itself lives with the other actions.

use crate::error::StakingResult;
use crate::wallet::session::Session;

use ethers::types::U256;

/// Reward state for the connected address
#[derive(Debug, Clone)]
pub struct RewardsSummary {
    pub can_claim: bool,
    pub total_earned: U256,
    pub total_earned_display: String,
}

/// Fetch claim eligibility and total earned for the connected address
pub async fn fetch_summary(session: &Session) -> StakingResult<RewardsSummary> {
    let can_claim = session.staking.user_can_claim().await?;
    let total_earned = session
        .staking
        .current_total_stake_earned(session.address)
        .await?;

    Ok(RewardsSummary {
        can_claim,
        total_earned,
        total_earned_display: format_reward(total_earned),
    })
}

/// Earned amount for one staked token
pub async fn earned_for_token(session: &Session, token_id: U256) -> StakingResult<U256> {
    session.staking.current_stake_earned(token_id).await
}

/// Render a raw reward amount with 18-decimal unit scaling
pub fn format_reward(amount: U256) -> String {
    ethers::utils::format_units(amount, 18).unwrap_or_else(|_| amount.to_string())
}
