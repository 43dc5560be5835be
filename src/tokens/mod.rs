//! Token listings and placement
//!
//! Listing queries return parallel (URIs, ids) sequences that are zipped
//! positionally; a length mismatch is a contract-level invariant violation
//! and fails loudly instead of truncating.

pub mod ledger;
pub mod metadata;

pub use ledger::{Tile, TokenLedger};
pub use metadata::MetadataClient;

use crate::error::{StakingError, StakingResult};
use crate::wallet::session::Session;

use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Which container a token tile lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Stakable,
    Staked,
}

impl Placement {
    pub fn flipped(&self) -> Self {
        match self {
            Placement::Stakable => Placement::Staked,
            Placement::Staked => Placement::Stakable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Placement::Stakable => "stakable",
            Placement::Staked => "staked",
        }
    }
}

/// One token as returned by a listing query
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRef {
    pub token_id: U256,
    pub metadata_uri: String,
    pub placement: Placement,
}

/// Both listings for the connected address
#[derive(Debug, Clone, Default)]
pub struct Listings {
    pub stakable: Vec<TokenRef>,
    pub staked: Vec<TokenRef>,
}

/// Zip the parallel sequences of a listing response; URI at index i belongs
/// to id at index i
pub fn zip_listing(
    uris: Vec<String>,
    ids: Vec<U256>,
    placement: Placement,
) -> StakingResult<Vec<TokenRef>> {
    if uris.len() != ids.len() {
        return Err(StakingError::InvariantViolation(format!(
            "{} listing returned {} URIs but {} token ids",
            placement.label(),
            uris.len(),
            ids.len()
        )));
    }

    Ok(uris
        .into_iter()
        .zip(ids)
        .map(|(metadata_uri, token_id)| TokenRef {
            token_id,
            metadata_uri,
            placement,
        })
        .collect())
}

/// Query both listings for the connected address
pub async fn refresh_listings(session: &Session) -> StakingResult<Listings> {
    let (uris, ids) = session.staking.token_uris(session.address).await?;
    let stakable = zip_listing(uris, ids, Placement::Stakable)?;

    let (uris, ids) = session.staking.get_staked(session.address).await?;
    let staked = zip_listing(uris, ids, Placement::Staked)?;

    tracing::debug!(
        "Listings refreshed: {} stakable, {} staked",
        stakable.len(),
        staked.len()
    );

    Ok(Listings { stakable, staked })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_pairs_positionally() {
        let tokens = zip_listing(
            vec!["ipfs://a".into(), "ipfs://b".into()],
            vec![U256::from(5u64), U256::from(9u64)],
            Placement::Stakable,
        )
        .unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_id, U256::from(5u64));
        assert_eq!(tokens[0].metadata_uri, "ipfs://a");
        assert_eq!(tokens[1].token_id, U256::from(9u64));
        assert_eq!(tokens[1].metadata_uri, "ipfs://b");
    }

    #[test]
    fn mismatched_lengths_fail_loudly() {
        let err = zip_listing(
            vec!["ipfs://a".into()],
            vec![U256::from(1u64), U256::from(2u64)],
            Placement::Staked,
        )
        .unwrap_err();

        match err {
            StakingError::InvariantViolation(message) => {
                assert!(message.contains("1 URIs"));
                assert!(message.contains("2 token ids"));
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn empty_listing_zips_to_nothing() {
        let tokens = zip_listing(Vec::new(), Vec::new(), Placement::Stakable).unwrap();
        assert!(tokens.is_empty());
    }
}
