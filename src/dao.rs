//! Binding for the DAO contract.

use crate::{
    error::Result,
    ethereum::{
        artifacts::{Artifact, ContractDefinition},
        class::ContractClass,
    },
};

pub const CONTRACT_NAME: &str = "DAO";

const ARTIFACT: &str = include_str!("../artifacts/DAO.json");

/// The embedded DAO artifact.
pub fn artifact() -> Result<Artifact> {
    Artifact::from_json(ARTIFACT)
}

pub fn definition() -> Result<ContractDefinition> {
    Ok(ContractDefinition::from_artifact(artifact()?))
}

/// A freshly bootstrapped DAO class with no transport attached.
pub fn dao() -> Result<ContractClass> {
    Ok(ContractClass::new(definition()?))
}
