use alloy::primitives::{Address, B256};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::info;

use super::{
    artifacts::strip_hex_prefix,
    class::ContractClass,
    codec,
    instance::ContractInstance,
    options::split_options,
    sync, Receipt,
};
use crate::error::{BindingError, Result};

/// Unlinked library slot, e.g. `__SafeMath______________________________`.
static LIBRARY_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__[^_]+_+").expect("placeholder pattern is valid"));

/// Distinct library names still awaiting linking, sorted.
pub fn unlinked_libraries(bytecode: &str) -> Vec<String> {
    let mut names: Vec<String> = LIBRARY_PLACEHOLDER
        .find_iter(bytecode)
        .map(|m| m.as_str().replace('_', ""))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Address created by a mined creation transaction. Reverted receipts and
/// receipts without a contract address do not settle the deployment.
pub fn created_address(receipt: &Receipt) -> Option<Address> {
    receipt.contract_address.filter(|_| receipt.succeeded())
}

impl ContractClass {
    /// Deploy a new instance. Constructor arguments come first; a trailing
    /// options object is merged over the class defaults.
    pub async fn deploy(&self, args: Vec<Value>) -> Result<ContractInstance> {
        let contract = self.contract_name().to_string();
        let provider = self.require_provider()?;

        let network = self.network();
        if !network.has_bytecode() {
            return Err(BindingError::MissingBytecode { contract });
        }

        let libraries = unlinked_libraries(network.bytecode_template());
        if !libraries.is_empty() {
            return Err(BindingError::UnresolvedLibrary { contract, libraries });
        }

        let (constructor_args, overrides) = split_options(args);
        let options = self.class_defaults().merge(&overrides);
        let timeout = options
            .synchronization_timeout()
            .unwrap_or_else(|| self.synchronization_timeout());

        let mut tx = options.to_request();
        let code = match tx.get("data").and_then(Value::as_str) {
            Some(data) => strip_hex_prefix(data).to_string(),
            None => strip_hex_prefix(&network.binary).to_string(),
        };
        let encoded_args = codec::encode_constructor_args(network.abi.constructor(), &constructor_args)?;
        tx.insert(
            "data".to_string(),
            json!(format!("0x{}{}", code, hex::encode(encoded_args))),
        );

        let transaction_hash = provider.send_transaction(&tx).await?;
        info!("Deploying {} in transaction {}", contract, transaction_hash);

        let receipt = sync::wait_for_receipt(&provider, transaction_hash, timeout).await?;
        let address = created_address(&receipt).ok_or(BindingError::DeploymentFailed { transaction_hash })?;
        info!("{} deployed at {}", contract, address);

        Ok(ContractInstance::new(self.clone(), address, Some(transaction_hash)))
    }
}
