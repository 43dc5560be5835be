//! Configuration management for stakedeck
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub client: ClientConfig,
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub wallet: WalletConfig,
    pub metadata: MetadataConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Interval between transaction receipt polls
    pub receipt_poll_ms: u64,
    /// Capacity of the status broadcast channel
    pub status_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// The single supported chain; connect fails on anything else
    pub chain_id: u64,
    pub name: String,
    /// Block explorer transaction URL prefix, e.g. https://rinkeby.etherscan.io/tx/
    pub explorer_tx_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    /// Staking contract address; the collection address is read from nftToken()
    pub staking_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Wallet bridge endpoint; absent means no provider in the environment
    pub bridge_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// HTTP gateway that ipfs:// URIs are rewritten to
    pub ipfs_gateway: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the declined-prompt flag
    pub preferences_path: String,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("STAKEDECK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.network.chain_id == 0 {
            anyhow::bail!("network.chain_id must be non-zero");
        }

        self.staking_address()
            .with_context(|| "contracts.staking_address is not a valid address")?;

        if self.network.explorer_tx_url.is_empty() {
            anyhow::bail!("network.explorer_tx_url must be set");
        }

        if self.metadata.ipfs_gateway.is_empty() {
            anyhow::bail!("metadata.ipfs_gateway must be set");
        }

        if let Some(url) = &self.wallet.bridge_url {
            if url.is_empty() {
                anyhow::bail!("wallet.bridge_url must not be empty when present");
            }
        }

        Ok(())
    }

    /// Parsed staking contract address
    pub fn staking_address(&self) -> Result<Address> {
        self.contracts
            .staking_address
            .parse::<Address>()
            .map_err(|e| anyhow::anyhow!("invalid staking address: {}", e))
    }

    /// Target chain id in the 0x-prefixed hex form wallet methods expect
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.network.chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
pub mod testing {
    //! Settings fixture for unit tests

    use super::Settings;

    pub fn sample_settings(chain_id: u64) -> Settings {
        let raw = format!(
            r#"
            [client]
            receipt_poll_ms = 1
            status_buffer = 64

            [network]
            chain_id = {}
            name = "Rinkeby"
            explorer_tx_url = "https://rinkeby.etherscan.io/tx/"

            [contracts]
            staking_address = "0xBD1150f87EBA437f4917c64548F8fBd742CCE3ec"

            [wallet]
            bridge_url = "http://127.0.0.1:8575"

            [metadata]
            ipfs_gateway = "https://ipfs.io/ipfs/"

            [storage]
            preferences_path = "stakedeck-prefs.json"
            "#,
            chain_id
        );
        toml::from_str(&raw).unwrap()
    }
}
