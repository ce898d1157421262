pub mod artifacts;
pub mod class;
pub mod codec;
pub mod deploy;
pub mod instance;
pub mod options;
pub mod provider;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Transaction receipt, as much of it as the binding looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Pre-byzantium receipts carry no status; treat them as successful.
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| status == U64::from(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub event: Option<String>,
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
    pub decoded: Option<serde_json::Value>,
}

/// A transaction that reached a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub transaction_hash: B256,
    pub receipt: Receipt,
}

/// Result of invoking a provisioned function.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invocation {
    /// Decoded return value(s) of a read call.
    Returned(serde_json::Value),
    /// Receipt of a synchronized transaction.
    Confirmed(TransactionOutcome),
}

/// Summary of the active network entry, for display.
#[derive(Debug, Clone, Serialize)]
pub struct ContractInfo {
    pub contract_name: String,
    pub network_id: Option<String>,
    pub address: Option<String>,
    pub updated_at: Option<u64>,
    pub has_bytecode: bool,
    pub calls: Vec<String>,
    pub transactions: Vec<String>,
    pub events: Vec<String>,
}
