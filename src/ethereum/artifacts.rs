use alloy::{json_abi::JsonAbi, primitives::Address};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tokio::fs;

use super::options::TxOptions;
use crate::error::Result;

/// Network id the class is bootstrapped with.
pub const DEFAULT_NETWORK: &str = "default";

/// Lookup keys tried, in order, when the node reports the main chain.
const MAIN_CHAIN_ALIASES: [&str; 3] = ["1", "live", "default"];

/// Per-network artifact record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    #[serde(default)]
    pub abi: JsonAbi,
    #[serde(default)]
    pub binary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlinked_binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl NetworkEntry {
    /// Bytecode before library linking; falls back to `binary` when the
    /// artifact has no separate template.
    pub fn bytecode_template(&self) -> &str {
        match self.unlinked_binary.as_deref() {
            Some(template) if !template.is_empty() => template,
            _ => &self.binary,
        }
    }

    pub fn has_bytecode(&self) -> bool {
        !strip_hex_prefix(&self.binary).is_empty()
    }
}

/// On-disk artifact document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_with: Option<String>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkEntry>,
    #[serde(default, skip_serializing_if = "TxOptions::is_empty")]
    pub defaults: TxOptions,
}

impl Artifact {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read artifact file {:?}: {}", path, e))?;

        Self::from_json(&content)
            .map_err(|e| anyhow!("Failed to parse artifact file {:?}: {}", path, e))
    }
}

/// Immutable description of one contract across all of its networks.
///
/// Shared read-only by every class derived from it.
#[derive(Debug, Clone)]
pub struct ContractDefinition {
    name: String,
    generated_with: Option<String>,
    networks: BTreeMap<String, Arc<NetworkEntry>>,
    defaults: TxOptions,
}

impl ContractDefinition {
    pub fn from_artifact(artifact: Artifact) -> Self {
        let networks = artifact
            .networks
            .into_iter()
            .map(|(id, entry)| (id, Arc::new(entry)))
            .collect();

        Self {
            name: artifact.contract_name,
            generated_with: artifact.generated_with,
            networks,
            defaults: artifact.defaults,
        }
    }

    /// Replace the declared defaults block seeded into every bootstrap.
    pub fn with_defaults(mut self, defaults: TxOptions) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generated_with(&self) -> Option<&str> {
        self.generated_with.as_deref()
    }

    pub fn defaults(&self) -> &TxOptions {
        &self.defaults
    }

    pub fn network(&self, network_id: &str) -> Option<Arc<NetworkEntry>> {
        self.networks.get(network_id).cloned()
    }

    pub fn network_ids(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    /// Registry key for a node-reported network id. The main chain ("1") also
    /// matches entries stored as "live" or "default".
    pub fn lookup(&self, reported_id: &str) -> Option<&str> {
        if reported_id == MAIN_CHAIN_ALIASES[0] {
            return MAIN_CHAIN_ALIASES
                .iter()
                .copied()
                .find(|id| self.networks.contains_key(*id));
        }

        self.networks
            .get_key_value(reported_id)
            .map(|(id, _)| id.as_str())
    }
}

pub(crate) fn strip_hex_prefix(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}
