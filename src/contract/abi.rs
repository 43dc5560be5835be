//! Contract ABI surfaces
//!
//! Human-readable ABIs parsed once at startup. The collection ABI is the
//! minimal approval surface only; everything else about the collection is the
//! staking contract's business.

use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use lazy_static::lazy_static;

lazy_static! {
    /// Staking contract surface
    pub static ref STAKING_ABI: BaseContract = BaseContract::from(
        parse_abi(&[
            "function nftToken() view returns (address)",
            "function getStaked(address targetAddress) view returns (string[], uint256[])",
            "function stakeNFT(uint256[] tokenIds) returns (bool)",
            "function tokenURIs(address targetAddress) view returns (string[], uint256[])",
            "function unStakeNFT(uint256[] tokenIds) returns (bool)",
            "function claimRewards(uint256 tokenId)",
            "function userCanClaim() view returns (bool)",
            "function getCurrentStakeEarned(uint256 tokenId) view returns (uint256)",
            "function getCurrentTotalStakeEarned(address targetAddress) view returns (uint256)",
        ])
        .unwrap()
    );

    /// Token collection surface: approval check and approval set
    pub static ref COLLECTION_ABI: BaseContract = BaseContract::from(
        parse_abi(&[
            "function isApprovedForAll(address owner, address operator) view returns (bool)",
            "function setApprovalForAll(address operator, bool approved)",
        ])
        .unwrap()
    );
}
