use alloy::primitives::B256;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the contract binding.
///
/// Every public operation returns one of these to its immediate caller;
/// nothing is logged and swallowed.
#[derive(Error, Debug)]
pub enum BindingError {
    #[error("{contract} error: Please call set_provider() first.")]
    NoProvider { contract: String },

    #[error("{contract} error: contract binary not set. Can't deploy new instance.")]
    MissingBytecode { contract: String },

    #[error(
        "{} contains unresolved libraries. You must deploy and link the following libraries before you can deploy a new version of {}: {}",
        .contract,
        .contract,
        .libraries.join(", ")
    )]
    UnresolvedLibrary {
        contract: String,
        libraries: Vec<String>,
    },

    #[error("Invalid address passed to {contract}.at(): {address}")]
    InvalidAddress { contract: String, address: String },

    #[error("Cannot find deployed address: {contract} not deployed or address not set.")]
    NotDeployed { contract: String },

    #[error("{contract} error: Can't find artifacts for network id '{network_id}'")]
    UnknownNetwork {
        contract: String,
        network_id: String,
    },

    #[error(
        "Transaction {} wasn't processed in {} seconds!",
        .transaction_hash,
        .timeout.as_secs_f64()
    )]
    TransactionTimeout {
        transaction_hash: B256,
        timeout: Duration,
    },

    #[error("Contract creation transaction {transaction_hash} was mined without a contract address")]
    DeploymentFailed { transaction_hash: B256 },

    #[error("{contract} has no function or event named '{name}'")]
    UnknownMember { contract: String, name: String },

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid artifact: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, BindingError>;

/// Opaque failure reported by the underlying RPC transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// JSON-RPC error code, when the node answered with an error object.
    pub code: Option<i64>,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl From<alloy::transports::TransportError> for TransportError {
    fn from(err: alloy::transports::TransportError) -> Self {
        match &err {
            alloy::transports::RpcError::ErrorResp(payload) => {
                Self::with_code(payload.code, payload.message.to_string())
            }
            _ => Self::new(err.to_string()),
        }
    }
}
