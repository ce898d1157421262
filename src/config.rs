use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::ethereum::{
    class::ContractClass,
    options::{timeout_from_millis, TxOptions},
    utils,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    /// Artifact network id to use. Detected from the node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Artifact file replacing the embedded DAO artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub synchronization: SynchronizationConfig,
}

/// Class-level invocation defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub from: Option<String>,
    pub gas: Option<u64>,
    /// Wei, decimal or `0x` hex.
    pub gas_price: Option<String>,
    /// Wei, decimal or `0x` hex.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynchronizationConfig {
    /// 0 waits forever.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    240_000
}

impl Default for SynchronizationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            network: None,
            artifact: None,
            defaults: DefaultsConfig::default(),
            synchronization: SynchronizationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    fn apply_env_vars(&mut self) {
        self.apply_overrides(std::env::var("DAO_RPC_URL").ok(), std::env::var("DAO_FROM").ok());
    }

    fn apply_overrides(&mut self, rpc_url: Option<String>, from: Option<String>) {
        if let Some(rpc_url) = rpc_url.filter(|url| !url.is_empty()) {
            tracing::debug!("Using RPC URL from DAO_RPC_URL");
            self.rpc_url = rpc_url;
        }
        if let Some(from) = from.filter(|from| !from.is_empty()) {
            tracing::debug!("Using sender account from DAO_FROM");
            self.defaults.from = Some(from);
        }
    }

    /// Defaults as transaction options, quantities hex encoded.
    pub fn tx_defaults(&self) -> Result<TxOptions> {
        let mut options = TxOptions::new();
        if let Some(from) = &self.defaults.from {
            utils::validate_address(from)
                .map_err(|e| anyhow!("Invalid default 'from' account: {}", e))?;
            options = options.with("from", from.as_str());
        }
        if let Some(gas) = self.defaults.gas {
            options = options.with("gas", format!("0x{:x}", gas));
        }
        if let Some(gas_price) = &self.defaults.gas_price {
            options = options.with("gasPrice", utils::to_quantity(gas_price)?);
        }
        if let Some(value) = &self.defaults.value {
            options = options.with("value", utils::to_quantity(value)?);
        }
        Ok(options)
    }

    pub fn synchronization_timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.synchronization.timeout_ms)
    }

    /// Push defaults, synchronization settings and an explicit network onto
    /// `class`.
    pub fn apply_to(&self, class: &ContractClass) -> Result<()> {
        class.defaults(&self.tx_defaults()?);
        class.set_synchronization_timeout(self.synchronization_timeout());

        if let Some(network) = &self.network {
            utils::validate_network(network, &class.networks())?;
            class.set_network(network);
        }
        Ok(())
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("dao-contract").join("config.toml"))
    }

    pub fn generate_sample() -> String {
        let sample_config = r#"# DAO contract client configuration

# JSON-RPC endpoint of the node
rpc_url = "http://127.0.0.1:8545"

# Artifact network id ("default", "live", or a numeric id).
# Detected with net_version when omitted.
# network = "default"

# Artifact JSON replacing the embedded DAO artifact
# artifact = "build/contracts/DAO.json"

# Options merged into every call, transaction and deployment
[defaults]
# from = "0x0000000000000000000000000000000000000000"
# gas = 4000000
# gas_price = "20000000000"  # wei
# value = "0"

[synchronization]
timeout_ms = 240000        # 0 waits forever

# Environment variables that can be used:
# DAO_RPC_URL - overrides rpc_url
# DAO_FROM - overrides defaults.from
"#;
        sample_config.to_string()
    }
}
