//! Local tile state
//!
//! Tiles are click-toggled between stakable and staked intent before any
//! transaction exists. Actual placement moves only when a matching batched
//! call confirms, and then for the whole batch at once.

use super::{Listings, Placement, TokenRef};

use ethers::types::U256;
use tokio::sync::RwLock;
use tracing::debug;

/// One rendered token tile
#[derive(Debug, Clone)]
pub struct Tile {
    pub token: TokenRef,
    /// Where the user wants this token; differs from placement once toggled
    pub intent: Placement,
}

/// In-memory tile collection for the connected address
#[derive(Default)]
pub struct TokenLedger {
    tiles: RwLock<Vec<Tile>>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all tiles from a fresh listing; intents reset to placements
    pub async fn load(&self, listings: &Listings) {
        let tiles = listings
            .stakable
            .iter()
            .chain(listings.staked.iter())
            .map(|token| Tile {
                token: token.clone(),
                intent: token.placement,
            })
            .collect();
        *self.tiles.write().await = tiles;
    }

    /// Flip a tile's intent; false when the token is unknown
    pub async fn toggle(&self, token_id: U256) -> bool {
        let mut tiles = self.tiles.write().await;
        match tiles.iter_mut().find(|t| t.token.token_id == token_id) {
            Some(tile) => {
                tile.intent = tile.intent.flipped();
                debug!("Tile {} toggled to {}", token_id, tile.intent.label());
                true
            }
            None => false,
        }
    }

    /// Stakable tokens the user toggled towards staked
    pub async fn pending_stake(&self) -> Vec<U256> {
        self.pending(Placement::Stakable).await
    }

    /// Staked tokens the user toggled towards stakable
    pub async fn pending_unstake(&self) -> Vec<U256> {
        self.pending(Placement::Staked).await
    }

    async fn pending(&self, from: Placement) -> Vec<U256> {
        self.tiles
            .read()
            .await
            .iter()
            .filter(|t| t.token.placement == from && t.intent == from.flipped())
            .map(|t| t.token.token_id)
            .collect()
    }

    /// Commit a confirmed batch: every listed token moves placement together,
    /// under one lock, so a batch never half-moves
    pub async fn commit(&self, token_ids: &[U256], placement: Placement) {
        let mut tiles = self.tiles.write().await;
        for tile in tiles.iter_mut() {
            if token_ids.contains(&tile.token.token_id) {
                tile.token.placement = placement;
                tile.intent = placement;
            }
        }
        debug!("Committed {} tiles to {}", token_ids.len(), placement.label());
    }

    /// (stakable, staked) tile counts by placement
    pub async fn counts(&self) -> (usize, usize) {
        let tiles = self.tiles.read().await;
        let staked = tiles
            .iter()
            .filter(|t| t.token.placement == Placement::Staked)
            .count();
        (tiles.len() - staked, staked)
    }

    pub async fn snapshot(&self) -> Vec<Tile> {
        self.tiles.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings(stakable: &[u64], staked: &[u64]) -> Listings {
        let token = |id: &u64, placement| TokenRef {
            token_id: U256::from(*id),
            metadata_uri: format!("ipfs://token/{}", id),
            placement,
        };
        Listings {
            stakable: stakable.iter().map(|id| token(id, Placement::Stakable)).collect(),
            staked: staked.iter().map(|id| token(id, Placement::Staked)).collect(),
        }
    }

    #[tokio::test]
    async fn toggling_marks_tokens_for_staking() {
        let ledger = TokenLedger::new();
        ledger.load(&listings(&[1, 2, 3], &[])).await;

        assert!(ledger.toggle(U256::from(1u64)).await);
        assert!(ledger.toggle(U256::from(2u64)).await);

        assert_eq!(
            ledger.pending_stake().await,
            vec![U256::from(1u64), U256::from(2u64)]
        );
        assert!(ledger.pending_unstake().await.is_empty());
    }

    #[tokio::test]
    async fn toggling_back_clears_the_intent() {
        let ledger = TokenLedger::new();
        ledger.load(&listings(&[1], &[])).await;

        ledger.toggle(U256::from(1u64)).await;
        ledger.toggle(U256::from(1u64)).await;

        assert!(ledger.pending_stake().await.is_empty());
    }

    #[tokio::test]
    async fn toggling_never_moves_placement() {
        let ledger = TokenLedger::new();
        ledger.load(&listings(&[1], &[2])).await;

        ledger.toggle(U256::from(1u64)).await;
        ledger.toggle(U256::from(2u64)).await;

        // Intent changed, containers did not
        assert_eq!(ledger.counts().await, (1, 1));
    }

    #[tokio::test]
    async fn commit_moves_the_whole_batch_together() {
        let ledger = TokenLedger::new();
        ledger.load(&listings(&[1, 2, 3], &[])).await;

        let batch = [U256::from(1u64), U256::from(2u64)];
        ledger.commit(&batch, Placement::Staked).await;

        assert_eq!(ledger.counts().await, (1, 2));
        // Committed tiles are no longer pending anything
        assert!(ledger.pending_stake().await.is_empty());
        assert!(ledger.pending_unstake().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_token_toggle_is_rejected() {
        let ledger = TokenLedger::new();
        ledger.load(&listings(&[1], &[])).await;
        assert!(!ledger.toggle(U256::from(99u64)).await);
    }
}
