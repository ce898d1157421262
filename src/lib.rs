//! Client binding for the DAO contract over a JSON-RPC node.
//!
//! ```no_run
//! # async fn run() -> dao_contract::Result<()> {
//! use dao_contract::{dao, Provider};
//!
//! let class = dao::dao()?;
//! class.set_provider(Provider::http("http://127.0.0.1:8545")?);
//!
//! let instance = class.at("0xbb9bc244d798123fde783fcc1c72d3bb8c189413")?;
//! let proposals = instance.invoke("numberOfProposals", vec![]).await?;
//! # let _ = proposals;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dao;
pub mod error;
pub mod ethereum;

pub use error::{BindingError, Result, TransportError};
pub use ethereum::{
    artifacts::{Artifact, ContractDefinition, NetworkEntry},
    class::ContractClass,
    instance::{ContractInstance, EventHandle, FunctionHandle, MethodKind},
    options::TxOptions,
    provider::{HttpTransport, Provider, Transport},
    Invocation, Receipt, TransactionOutcome,
};
