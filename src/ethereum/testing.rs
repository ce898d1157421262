//! Scripted in-memory transport and fixtures for unit tests.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use super::{
    artifacts::{Artifact, ContractDefinition},
    provider::Transport,
};
use crate::error::TransportError;

type Response = Result<Value, TransportError>;

/// Replays queued responses per JSON-RPC method and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<Response>>>,
    fallbacks: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, method: &str, response: Value) {
        self.enqueue(method, Ok(response));
    }

    pub fn push_err(&self, method: &str, error: TransportError) {
        self.enqueue(method, Err(error));
    }

    /// Answer used once the queue for `method` is empty.
    pub fn fallback(&self, method: &str, response: Value) {
        self.fallbacks
            .lock()
            .unwrap()
            .insert(method.to_string(), response);
    }

    fn enqueue(&self, method: &str, response: Response) {
        self.queued
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Params of the most recent request for `method`.
    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response;
        }

        self.fallbacks
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("no scripted response for {}", method)))
    }
}

pub fn receipt_json(transaction_hash: B256, contract_address: Option<Address>) -> Value {
    json!({
        "transactionHash": transaction_hash,
        "blockNumber": "0x10",
        "contractAddress": contract_address,
        "gasUsed": "0x5208",
        "status": "0x1",
        "logs": []
    })
}

pub const TOKEN_ADDRESS: &str = "0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e";

/// Small token contract with a constant call, a transaction, an event and a
/// constructor, deployed on network "3" only.
pub fn token_artifact() -> Artifact {
    serde_json::from_value(json!({
        "contract_name": "Token",
        "generated_with": "3.0.3",
        "networks": {
            "default": {
                "abi": token_abi(),
                "binary": "6060604052",
                "updated_at": 1467656954050u64
            },
            "3": {
                "abi": token_abi(),
                "binary": "0x6060604052",
                "address": TOKEN_ADDRESS,
                "updated_at": 1467656954051u64
            },
            "live": {
                "abi": token_abi(),
                "binary": "0x6060604052",
                "unlinked_binary": "0x6060__SafeMath______________________________60"
            }
        }
    }))
    .unwrap()
}

pub fn token_definition() -> ContractDefinition {
    ContractDefinition::from_artifact(token_artifact())
}

fn token_abi() -> Value {
    json!([
        {
            "constant": true,
            "inputs": [{"name": "_owner", "type": "address"}],
            "name": "balanceOf",
            "outputs": [{"name": "balance", "type": "uint256"}],
            "type": "function"
        },
        {
            "constant": false,
            "inputs": [
                {"name": "_to", "type": "address"},
                {"name": "_amount", "type": "uint256"}
            ],
            "name": "transfer",
            "outputs": [{"name": "success", "type": "bool"}],
            "type": "function"
        },
        {
            "constant": true,
            "inputs": [],
            "name": "totalSupply",
            "outputs": [{"name": "", "type": "uint256"}],
            "type": "function"
        },
        {
            "inputs": [{"name": "_supply", "type": "uint256"}],
            "type": "constructor"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "name": "_from", "type": "address"},
                {"indexed": true, "name": "_to", "type": "address"},
                {"indexed": false, "name": "_amount", "type": "uint256"}
            ],
            "name": "Transfer",
            "type": "event"
        }
    ])
}
