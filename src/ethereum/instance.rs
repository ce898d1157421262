//! Method provisioning for bound contract instances.
//!
//! The interface description is walked once per instance into a name →
//! [`Handler`] map. Callers reach handlers through [`FunctionHandle`] and
//! [`EventHandle`] rather than looking up ABI entries themselves.

use alloy::{
    json_abi::{Event, Function, JsonAbi, StateMutability},
    primitives::{Address, B256},
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

use super::{
    class::ContractClass,
    codec,
    options::{split_options, TxOptions},
    provider::Provider,
    sync, EventInfo, Invocation, Log, TransactionOutcome,
};
use crate::error::{BindingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Read-only; answered by `eth_call`.
    Call,
    /// State-mutating; submitted and synchronized.
    Transaction,
}

impl MethodKind {
    pub fn of(function: &Function) -> Self {
        match function.state_mutability {
            StateMutability::View | StateMutability::Pure => MethodKind::Call,
            StateMutability::NonPayable | StateMutability::Payable => MethodKind::Transaction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionedFunction {
    pub kind: MethodKind,
    pub function: Function,
}

#[derive(Debug, Clone)]
pub enum Handler {
    /// All overloads sharing one name.
    Function(Vec<ProvisionedFunction>),
    Event(Event),
}

/// Build the handler map for an interface. Functions shadow events of the
/// same name.
pub fn provision(abi: &JsonAbi) -> BTreeMap<String, Handler> {
    let mut handlers = BTreeMap::new();

    for (name, overloads) in &abi.functions {
        let provisioned = overloads
            .iter()
            .map(|function| ProvisionedFunction {
                kind: MethodKind::of(function),
                function: function.clone(),
            })
            .collect();
        handlers.insert(name.clone(), Handler::Function(provisioned));
    }

    for (name, events) in &abi.events {
        if let Some(event) = events.first() {
            handlers
                .entry(name.clone())
                .or_insert_with(|| Handler::Event(event.clone()));
        }
    }

    handlers
}

/// A JSON-RPC request as it would be sent, without sending it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

/// A contract bound to a concrete address.
///
/// Instances read the transport handle and defaults from their class at call
/// time, so reconfiguring the class affects calls already bound to it.
#[derive(Debug, Clone)]
pub struct ContractInstance {
    class: ContractClass,
    address: Address,
    transaction_hash: Option<B256>,
    handlers: Arc<BTreeMap<String, Handler>>,
}

impl ContractInstance {
    pub(crate) fn new(class: ContractClass, address: Address, transaction_hash: Option<B256>) -> Self {
        let handlers = Arc::new(provision(&class.network().abi));
        Self {
            class,
            address,
            transaction_hash,
            handlers,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Creation transaction, for instances returned by deploy.
    pub fn transaction_hash(&self) -> Option<B256> {
        self.transaction_hash
    }

    pub fn class(&self) -> &ContractClass {
        &self.class
    }

    pub fn handlers(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.handlers.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    fn unknown_member(&self, name: &str) -> BindingError {
        BindingError::UnknownMember {
            contract: self.class.contract_name().to_string(),
            name: name.to_string(),
        }
    }

    pub fn function<'a>(&'a self, name: &'a str) -> Result<FunctionHandle<'a>> {
        match self.handlers.get(name) {
            Some(Handler::Function(overloads)) => Ok(FunctionHandle {
                instance: self,
                name,
                overloads,
            }),
            _ => Err(self.unknown_member(name)),
        }
    }

    pub fn event<'a>(&'a self, name: &str) -> Result<EventHandle<'a>> {
        match self.handlers.get(name) {
            Some(Handler::Event(event)) => Ok(EventHandle {
                instance: self,
                event,
            }),
            _ => Err(self.unknown_member(name)),
        }
    }

    /// Invoke `name` the way its ABI entry prescribes: calls return decoded
    /// values, transactions return once their receipt is in.
    pub async fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Invocation> {
        self.function(name)?.invoke(args).await
    }

    /// All logs emitted by this address, decoded where an event matches.
    pub async fn all_events(&self, from_block: Option<u64>, to_block: Option<u64>) -> Result<Vec<EventInfo>> {
        let provider = self.class.require_provider()?;
        let logs = provider
            .get_logs(log_filter(self.address, None, from_block, to_block))
            .await?;

        let events: BTreeMap<B256, &Event> = self
            .handlers
            .values()
            .filter_map(|handler| match handler {
                Handler::Event(event) if !event.anonymous => Some((event.selector(), event)),
                _ => None,
            })
            .collect();

        Ok(logs
            .iter()
            .map(|log| {
                let event = log.topics.first().and_then(|topic| events.get(topic));
                event_info(event.copied(), log)
            })
            .collect())
    }
}

/// A provisioned function. Overloads are told apart by argument count.
#[derive(Debug, Clone, Copy)]
pub struct FunctionHandle<'a> {
    instance: &'a ContractInstance,
    name: &'a str,
    overloads: &'a [ProvisionedFunction],
}

/// Calldata plus the merged options for one invocation.
struct Prepared<'a> {
    function: &'a ProvisionedFunction,
    options: TxOptions,
    tx: Map<String, Value>,
}

impl<'a> FunctionHandle<'a> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// Kind of the overload taking `argc` positional arguments.
    pub fn kind(&self, argc: usize) -> Result<MethodKind> {
        Ok(self.select(argc)?.kind)
    }

    pub fn overloads(&self) -> &[ProvisionedFunction] {
        self.overloads
    }

    fn select(&self, argc: usize) -> Result<&'a ProvisionedFunction> {
        if let [only] = self.overloads {
            return Ok(only);
        }
        self.overloads
            .iter()
            .find(|overload| overload.function.inputs.len() == argc)
            .ok_or_else(|| {
                BindingError::Abi(format!(
                    "No overload of '{}' takes {} arguments",
                    self.name, argc
                ))
            })
    }

    fn build(&self, args: Vec<Value>, base: &TxOptions) -> Result<Prepared<'a>> {
        let (params, overrides) = split_options(args);
        let function = self.select(params.len())?;
        let calldata = codec::encode_function_call(&function.function, &params)?;

        let options = base.merge(&overrides);
        let mut tx = options.to_request();
        tx.insert("to".to_string(), json!(self.instance.address));
        tx.insert("data".to_string(), json!(format!("0x{}", hex::encode(&calldata))));

        Ok(Prepared { function, options, tx })
    }

    fn prepare(&self, args: Vec<Value>) -> Result<Prepared<'a>> {
        self.build(args, &self.instance.class.class_defaults())
    }

    /// Dispatch on the kind of the overload the arguments select.
    pub async fn invoke(&self, args: Vec<Value>) -> Result<Invocation> {
        let provider = self.instance.class.require_provider()?;
        let prepared = self.prepare(args)?;

        match prepared.function.kind {
            MethodKind::Call => Ok(Invocation::Returned(self.run_call(&provider, prepared).await?)),
            MethodKind::Transaction => Ok(Invocation::Confirmed(
                self.run_transaction(&provider, prepared).await?,
            )),
        }
    }

    /// Read-only invocation regardless of the function's kind.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let provider = self.instance.class.require_provider()?;
        let prepared = self.prepare(args)?;
        self.run_call(&provider, prepared).await
    }

    async fn run_call(&self, provider: &Provider, prepared: Prepared<'a>) -> Result<Value> {
        let output = provider.call(&prepared.tx).await?;
        codec::decode_function_result(&prepared.function.function, &output)
    }

    /// Submit without waiting for a receipt.
    pub async fn send_transaction(&self, args: Vec<Value>) -> Result<B256> {
        let provider = self.instance.class.require_provider()?;
        let prepared = self.prepare(args)?;
        self.submit(&provider, &prepared).await
    }

    async fn submit(&self, provider: &Provider, prepared: &Prepared<'a>) -> Result<B256> {
        let transaction_hash = provider.send_transaction(&prepared.tx).await?;
        info!(
            "{}.{} submitted transaction {}",
            self.instance.class.contract_name(),
            self.name,
            transaction_hash
        );
        Ok(transaction_hash)
    }

    /// Submit and poll until the receipt arrives.
    pub async fn transact(&self, args: Vec<Value>) -> Result<TransactionOutcome> {
        let provider = self.instance.class.require_provider()?;
        let prepared = self.prepare(args)?;
        self.run_transaction(&provider, prepared).await
    }

    async fn run_transaction(&self, provider: &Provider, prepared: Prepared<'a>) -> Result<TransactionOutcome> {
        let timeout = prepared
            .options
            .synchronization_timeout()
            .unwrap_or_else(|| self.instance.class.synchronization_timeout());

        let transaction_hash = self.submit(provider, &prepared).await?;
        let receipt = sync::wait_for_receipt(provider, transaction_hash, timeout).await?;
        if !receipt.succeeded() {
            warn!(
                "{}.{} transaction {} reverted",
                self.instance.class.contract_name(),
                self.name,
                transaction_hash
            );
        }
        Ok(TransactionOutcome {
            transaction_hash,
            receipt,
        })
    }

    pub async fn estimate_gas(&self, args: Vec<Value>) -> Result<u64> {
        let provider = self.instance.class.require_provider()?;
        let prepared = self.prepare(args)?;

        provider.estimate_gas(&prepared.tx).await
    }

    /// The request this invocation would send. Only caller-supplied options
    /// are included; class defaults are not merged in.
    pub fn request(&self, args: Vec<Value>) -> Result<RpcRequest> {
        let prepared = self.build(args, &TxOptions::default())?;
        let request = match prepared.function.kind {
            MethodKind::Call => RpcRequest {
                method: "eth_call".to_string(),
                params: json!([prepared.tx, "latest"]),
            },
            MethodKind::Transaction => RpcRequest {
                method: "eth_sendTransaction".to_string(),
                params: json!([prepared.tx]),
            },
        };
        Ok(request)
    }
}

/// A provisioned event; a thin pass-through to the transport's log queries.
#[derive(Debug, Clone, Copy)]
pub struct EventHandle<'a> {
    instance: &'a ContractInstance,
    event: &'a Event,
}

impl EventHandle<'_> {
    pub fn event(&self) -> &Event {
        self.event
    }

    fn topic(&self) -> Option<B256> {
        (!self.event.anonymous).then(|| self.event.selector())
    }

    pub async fn get_logs(&self, from_block: Option<u64>, to_block: Option<u64>) -> Result<Vec<EventInfo>> {
        let provider = self.instance.class.require_provider()?;
        let filter = log_filter(self.instance.address, self.topic(), from_block, to_block);

        let logs = provider.get_logs(filter).await?;
        Ok(logs.iter().map(|log| event_info(Some(self.event), log)).collect())
    }

    /// Install a node-side filter for this event; poll it with
    /// [`EventHandle::changes`].
    pub async fn watch(&self, from_block: Option<u64>) -> Result<String> {
        let provider = self.instance.class.require_provider()?;
        let mut filter = log_filter(self.instance.address, self.topic(), from_block, None);
        if from_block.is_none() {
            filter["fromBlock"] = json!("latest");
        }

        let filter_id = provider.new_filter(filter).await?;
        debug!("Watching {} with filter {}", self.event.name, filter_id);
        Ok(filter_id)
    }

    pub async fn changes(&self, filter_id: &str) -> Result<Vec<EventInfo>> {
        let provider = self.instance.class.require_provider()?;
        let logs = provider.filter_changes(filter_id).await?;
        Ok(logs.iter().map(|log| event_info(Some(self.event), log)).collect())
    }
}

fn block_tag(block: Option<u64>, default: &str) -> Value {
    match block {
        Some(number) => json!(format!("0x{:x}", number)),
        None => json!(default),
    }
}

fn log_filter(address: Address, topic: Option<B256>, from_block: Option<u64>, to_block: Option<u64>) -> Value {
    let mut filter = json!({
        "address": address,
        "fromBlock": block_tag(from_block, "0x0"),
        "toBlock": block_tag(to_block, "latest"),
    });
    if let Some(topic) = topic {
        filter["topics"] = json!([topic]);
    }
    filter
}

fn event_info(event: Option<&Event>, log: &Log) -> EventInfo {
    let decoded = event.and_then(|event| match codec::decode_event(event, log) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Leaving {} log undecoded: {}", event.name, e);
            None
        }
    });

    EventInfo {
        event: event.map(|event| event.name.clone()),
        address: format!("0x{:x}", log.address),
        topics: log.topics.iter().map(|t| format!("0x{:x}", t)).collect(),
        data: format!("0x{}", hex::encode(&log.data)),
        block_number: log.block_number.map(|b| b.to::<u64>()).unwrap_or_default(),
        transaction_hash: format!("0x{:x}", log.transaction_hash.unwrap_or_default()),
        log_index: log.log_index.map(|i| i.to::<u64>()).unwrap_or_default(),
        decoded,
    }
}
