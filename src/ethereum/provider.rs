use alloy::{
    primitives::{Bytes, B256, U64},
    providers::{Provider as _, ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::{fmt, sync::Arc};

use super::{Log, Receipt};
use crate::error::{BindingError, Result, TransportError};

/// Raw JSON-RPC boundary. The binding never performs network I/O itself; it
/// composes calls against this trait.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError>;
}

/// JSON-RPC over HTTP through an alloy root provider.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    provider: RootProvider<Http<Client>>,
}

impl HttpTransport {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| TransportError::new(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError> {
        self.provider
            .raw_request::<Value, Value>(method.to_owned().into(), params)
            .await
            .map_err(TransportError::from)
    }
}

/// Cloneable handle over a transport exposing the handful of operations the
/// binding needs.
#[derive(Clone)]
pub struct Provider {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("transport", &self.transport)
            .finish()
    }
}

impl Provider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http(rpc_url: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(rpc_url)?)))
    }

    /// Send a request and hand back the raw result.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        tracing::trace!("-> {} {}", method, params);
        let result = self.transport.request(method, params).await?;
        Ok(result)
    }

    async fn send_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let value = self.send(method, params).await?;
        decode_response(method, value)
    }

    /// `net_version`; nodes answer with either a string or a number.
    pub async fn network_version(&self) -> Result<String> {
        match self.send("net_version", json!([])).await? {
            Value::String(id) => Ok(id),
            Value::Number(id) => Ok(id.to_string()),
            other => Err(TransportError::new(format!(
                "Invalid response for net_version: {}",
                other
            ))
            .into()),
        }
    }

    pub async fn call(&self, tx: &Map<String, Value>) -> Result<Bytes> {
        self.send_as("eth_call", json!([tx, "latest"])).await
    }

    pub async fn send_transaction(&self, tx: &Map<String, Value>) -> Result<B256> {
        self.send_as("eth_sendTransaction", json!([tx])).await
    }

    pub async fn estimate_gas(&self, tx: &Map<String, Value>) -> Result<u64> {
        let gas: U64 = self.send_as("eth_estimateGas", json!([tx])).await?;
        Ok(gas.to::<u64>())
    }

    /// `Ok(None)` while the transaction is still pending.
    pub async fn transaction_receipt(&self, transaction_hash: B256) -> Result<Option<Receipt>> {
        self.send_as("eth_getTransactionReceipt", json!([transaction_hash]))
            .await
    }

    pub async fn get_logs(&self, filter: Value) -> Result<Vec<Log>> {
        self.send_as("eth_getLogs", json!([filter])).await
    }

    /// Install a log filter and return its id.
    pub async fn new_filter(&self, filter: Value) -> Result<String> {
        self.send_as("eth_newFilter", json!([filter])).await
    }

    pub async fn filter_changes(&self, filter_id: &str) -> Result<Vec<Log>> {
        self.send_as("eth_getFilterChanges", json!([filter_id]))
            .await
    }
}

fn decode_response<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        BindingError::Transport(TransportError::new(format!(
            "Invalid response for {}: {}",
            method, e
        )))
    })
}
