use alloy::{json_abi::JsonAbi, primitives::Address};
use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use tracing::{debug, info};

use super::{
    artifacts::{ContractDefinition, NetworkEntry, DEFAULT_NETWORK},
    instance::ContractInstance,
    options::{TxOptions, DEFAULT_SYNCHRONIZATION_TIMEOUT},
    provider::Provider,
    utils, ContractInfo,
};
use crate::error::{BindingError, Result};

/// Mutable per-class configuration.
#[derive(Debug, Clone)]
struct ClassState {
    network: Arc<NetworkEntry>,
    /// `None` until resolved against the node (or set explicitly).
    network_id: Option<String>,
    defaults: TxOptions,
    provider: Option<Provider>,
    /// `None` waits forever.
    synchronization_timeout: Option<Duration>,
}

/// A contract class bound to one active network entry.
///
/// Cloning the handle shares the class: network switches and default changes
/// are seen by every clone and every instance created from it. Use
/// [`ContractClass::derive`] for an independently configured class.
#[derive(Debug, Clone)]
pub struct ContractClass {
    definition: Arc<ContractDefinition>,
    state: Arc<RwLock<ClassState>>,
}

impl ContractClass {
    pub fn new(definition: ContractDefinition) -> Self {
        Self::bootstrap(Arc::new(definition), Some(DEFAULT_SYNCHRONIZATION_TIMEOUT))
    }

    /// Fresh state: no transport, declared defaults, "default" network data
    /// loaded but the network id left unresolved so the first network-aware
    /// operation detects it.
    fn bootstrap(definition: Arc<ContractDefinition>, synchronization_timeout: Option<Duration>) -> Self {
        let state = ClassState {
            network: Arc::default(),
            network_id: None,
            defaults: definition.defaults().clone(),
            provider: None,
            synchronization_timeout,
        };
        let class = Self {
            definition,
            state: Arc::new(RwLock::new(state)),
        };

        class.set_network(DEFAULT_NETWORK);
        class.write().network_id = None;
        class
    }

    /// A new class over the same definition with its own state.
    ///
    /// The class-level synchronization timeout is copied by value; the clone is then re-bootstrapped, so it starts
    /// without a transport and with the declared defaults.
    pub fn derive(&self) -> Self {
        let timeout = self.read().synchronization_timeout;
        Self::bootstrap(self.definition.clone(), timeout)
    }

    /// Derived class pinned to `network_id`.
    pub fn for_network(&self, network_id: &str) -> Self {
        let class = self.derive();
        class.set_network(network_id);
        class
    }

    fn read(&self) -> RwLockReadGuard<'_, ClassState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClassState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn definition(&self) -> &ContractDefinition {
        &self.definition
    }

    pub fn contract_name(&self) -> &str {
        self.definition.name()
    }

    pub fn generated_with(&self) -> Option<&str> {
        self.definition.generated_with()
    }

    pub fn set_provider(&self, provider: Provider) {
        self.write().provider = Some(provider);
    }

    pub fn current_provider(&self) -> Option<Provider> {
        self.read().provider.clone()
    }

    pub(crate) fn require_provider(&self) -> Result<Provider> {
        self.current_provider()
            .ok_or_else(|| BindingError::NoProvider {
                contract: self.contract_name().to_string(),
            })
    }

    /// Merge `additions` into the class defaults and return the result.
    pub fn defaults(&self, additions: &TxOptions) -> TxOptions {
        let mut state = self.write();
        state.defaults.extend(additions);
        state.defaults.clone()
    }

    pub fn class_defaults(&self) -> TxOptions {
        self.read().defaults.clone()
    }

    /// Class-level receipt wait; `None` waits forever.
    pub fn set_synchronization_timeout(&self, timeout: Option<Duration>) {
        self.write().synchronization_timeout = timeout;
    }

    pub fn synchronization_timeout(&self) -> Option<Duration> {
        self.read().synchronization_timeout
    }

    /// Switch to the entry for `network_id`, or to an empty entry when the
    /// registry has none.
    pub fn set_network(&self, network_id: &str) {
        let network = self.definition.network(network_id).unwrap_or_default();
        let mut state = self.write();
        state.network = network;
        state.network_id = Some(network_id.to_string());
    }

    pub fn network_id(&self) -> Option<String> {
        self.read().network_id.clone()
    }

    pub fn networks(&self) -> Vec<String> {
        self.definition.network_ids()
    }

    /// Detect the node's network once and switch to its entry. Later calls
    /// return the memoized id without touching the transport.
    pub async fn resolve_network(&self) -> Result<String> {
        if let Some(network_id) = self.network_id() {
            return Ok(network_id);
        }

        let provider = self.require_provider()?;
        let reported = provider.network_version().await?;
        debug!("{} node reports network id {}", self.contract_name(), reported);

        let network_id = self
            .definition
            .lookup(&reported)
            .ok_or_else(|| BindingError::UnknownNetwork {
                contract: self.contract_name().to_string(),
                network_id: reported.clone(),
            })?
            .to_string();

        // another caller may have resolved while we were waiting
        if let Some(existing) = self.network_id() {
            return Ok(existing);
        }
        self.set_network(&network_id);
        info!("{} using artifacts for network '{}'", self.contract_name(), network_id);
        Ok(network_id)
    }

    pub fn network(&self) -> Arc<NetworkEntry> {
        self.read().network.clone()
    }

    pub fn abi(&self) -> JsonAbi {
        self.network().abi.clone()
    }

    pub fn binary(&self) -> String {
        self.network().binary.clone()
    }

    pub fn unlinked_binary(&self) -> String {
        self.network().bytecode_template().to_string()
    }

    pub fn address(&self) -> Option<Address> {
        self.network().address
    }

    pub fn updated_at(&self) -> Option<u64> {
        self.network().updated_at
    }

    /// Bind to an existing deployment. No network round trip.
    pub fn at(&self, address: &str) -> Result<ContractInstance> {
        let address = utils::validate_address(address).map_err(|_| BindingError::InvalidAddress {
            contract: self.contract_name().to_string(),
            address: address.to_string(),
        })?;

        Ok(ContractInstance::new(self.clone(), address, None))
    }

    /// Instance at the active network entry's recorded address.
    pub fn deployed(&self) -> Result<ContractInstance> {
        let address = self.address().ok_or_else(|| BindingError::NotDeployed {
            contract: self.contract_name().to_string(),
        })?;

        Ok(ContractInstance::new(self.clone(), address, None))
    }

    /// Resolve the network, then [`ContractClass::deployed`].
    pub async fn detect_deployed(&self) -> Result<ContractInstance> {
        self.resolve_network().await?;
        self.deployed()
    }

    pub fn info(&self) -> ContractInfo {
        let network = self.network();
        let mut calls = Vec::new();
        let mut transactions = Vec::new();
        for function in network.abi.functions() {
            if super::instance::MethodKind::of(function) == super::instance::MethodKind::Call {
                calls.push(function.name.clone());
            } else {
                transactions.push(function.name.clone());
            }
        }

        ContractInfo {
            contract_name: self.contract_name().to_string(),
            network_id: self.network_id(),
            address: network.address.map(|a| a.to_string()),
            updated_at: network.updated_at,
            has_bytecode: network.has_bytecode(),
            calls,
            transactions,
            events: network.abi.events().map(|e| e.name.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::testing::{token_definition, MockTransport, TOKEN_ADDRESS};
    use serde_json::json;

    fn token() -> ContractClass {
        ContractClass::new(token_definition())
    }

    #[test]
    fn test_bootstrap_loads_default_data_unresolved() {
        let class = token();

        assert_eq!(class.network_id(), None);
        assert_eq!(class.binary(), "6060604052");
        assert_eq!(class.updated_at(), Some(1467656954050));
        assert!(class.address().is_none());
        assert!(class.current_provider().is_none());
    }

    #[test]
    fn test_set_network_reads_entry() {
        let class = token();
        for id in class.networks() {
            class.set_network(&id);
            let entry = class.definition().network(&id).unwrap();
            assert_eq!(class.network_id().as_deref(), Some(id.as_str()));
            assert_eq!(class.binary(), entry.binary);
            assert_eq!(class.address(), entry.address);
            assert_eq!(class.abi(), entry.abi);
            assert_eq!(class.unlinked_binary(), entry.bytecode_template());
        }
    }

    #[test]
    fn test_set_unknown_network_is_empty() {
        let class = token();
        class.set_network("999");

        assert_eq!(class.network_id().as_deref(), Some("999"));
        assert!(class.binary().is_empty());
        assert!(class.unlinked_binary().is_empty());
        assert!(class.address().is_none());
        assert!(class.updated_at().is_none());
        assert_eq!(class.abi().functions().count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_network_is_memoized() {
        let class = token();
        let mock = MockTransport::new();
        mock.push("net_version", json!("3"));
        class.set_provider(Provider::new(mock.clone()));

        assert_eq!(class.resolve_network().await.unwrap(), "3");
        assert_eq!(class.resolve_network().await.unwrap(), "3");
        assert_eq!(mock.count("net_version"), 1);
        assert!(class.address().is_some());
    }

    #[tokio::test]
    async fn test_resolve_main_chain_aliases() {
        let class = token();
        let mock = MockTransport::new();
        mock.push("net_version", json!("1"));
        class.set_provider(Provider::new(mock.clone()));

        assert_eq!(class.resolve_network().await.unwrap(), "live");
    }

    #[tokio::test]
    async fn test_resolve_unknown_network() {
        let class = token();
        let mock = MockTransport::new();
        mock.push("net_version", json!("5777"));
        class.set_provider(Provider::new(mock.clone()));

        let err = class.resolve_network().await.unwrap_err();
        assert!(matches!(err, BindingError::UnknownNetwork { ref network_id, .. } if network_id == "5777"));
        assert_eq!(class.network_id(), None);
    }

    #[tokio::test]
    async fn test_explicit_network_skips_detection() {
        let class = token().for_network("3");
        let mock = MockTransport::new();
        class.set_provider(Provider::new(mock.clone()));

        assert_eq!(class.resolve_network().await.unwrap(), "3");
        assert_eq!(mock.count("net_version"), 0);
    }

    #[tokio::test]
    async fn test_resolve_requires_provider() {
        let err = token().resolve_network().await.unwrap_err();
        assert!(matches!(err, BindingError::NoProvider { .. }));
    }

    #[test]
    fn test_derived_defaults_are_independent() {
        let base = token();
        base.defaults(&TxOptions::new().with("from", "0xbase"));

        let derived = base.derive();
        assert!(derived.class_defaults().get("from").is_none());

        derived.defaults(&TxOptions::new().with("gas", 90_000));
        assert!(base.class_defaults().get("gas").is_none());

        base.defaults(&TxOptions::new().with("value", "0x1"));
        assert!(derived.class_defaults().get("value").is_none());
    }

    #[test]
    fn test_derived_network_is_independent() {
        let base = token();
        let derived = base.for_network("3");

        assert_eq!(derived.network_id().as_deref(), Some("3"));
        assert_eq!(base.network_id(), None);

        base.set_network("live");
        assert_eq!(derived.network_id().as_deref(), Some("3"));
        assert!(derived.address().is_some());
    }

    #[test]
    fn test_derive_copies_class_settings_but_not_provider() {
        let base = token();
        base.set_synchronization_timeout(Some(Duration::from_secs(5)));
        base.set_provider(Provider::new(MockTransport::new()));

        let derived = base.derive();
        assert_eq!(derived.synchronization_timeout(), Some(Duration::from_secs(5)));
        assert!(derived.current_provider().is_none());
    }

    #[test]
    fn test_declared_defaults_seed_bootstrap() {
        let definition =
            token_definition().with_defaults(TxOptions::new().with("gas", 4_000_000));
        let class = ContractClass::new(definition);

        assert_eq!(class.class_defaults().get("gas"), Some(&json!(4_000_000)));
        assert_eq!(class.derive().class_defaults().get("gas"), Some(&json!(4_000_000)));
    }

    #[test]
    fn test_defaults_merge_is_additive() {
        let class = token();
        class.defaults(&TxOptions::new().with("from", "0xaa").with("gas", 1));
        let merged = class.defaults(&TxOptions::new().with("gas", 2));

        assert_eq!(merged.get("from"), Some(&json!("0xaa")));
        assert_eq!(merged.get("gas"), Some(&json!(2)));
    }

    #[test]
    fn test_at_validates_address_length() {
        let class = token();
        let mock = MockTransport::new();
        class.set_provider(Provider::new(mock.clone()));

        let short = format!("0x{}", "a".repeat(39));
        let long = format!("0x{}", "a".repeat(41));
        for address in [short.as_str(), long.as_str(), "", "0xnothex00000000000000000000000000000000000"] {
            let err = class.at(address).unwrap_err();
            assert!(matches!(err, BindingError::InvalidAddress { .. }), "{address}");
        }

        let instance = class.at(TOKEN_ADDRESS).unwrap();
        assert_eq!(instance.address(), TOKEN_ADDRESS.parse::<Address>().unwrap());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_deployed_requires_address() {
        let class = token();
        let err = class.deployed().unwrap_err();
        assert!(matches!(err, BindingError::NotDeployed { .. }));
        assert!(err.to_string().contains("Token not deployed"));

        class.set_network("3");
        let instance = class.deployed().unwrap();
        assert_eq!(instance.address(), TOKEN_ADDRESS.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn test_detect_deployed() {
        let class = token();
        let mock = MockTransport::new();
        mock.push("net_version", json!("3"));
        class.set_provider(Provider::new(mock.clone()));

        let instance = class.detect_deployed().await.unwrap();
        assert_eq!(instance.address(), TOKEN_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_info_classifies_functions() {
        let info = token().info();
        assert_eq!(info.contract_name, "Token");
        assert!(info.calls.contains(&"balanceOf".to_string()));
        assert!(info.transactions.contains(&"transfer".to_string()));
        assert_eq!(info.events, vec!["Transfer".to_string()]);
    }
}
