//! Linked pair deployment
//!
//! AccessKey goes to L1 first; its aliased address becomes the Vault's only
//! authorized unlocker on L2. The steps are strictly sequential because the
//! Vault constructor needs the AccessKey address.

use alloy::primitives::{Address, Bytes};
use std::sync::Arc;
use tracing::info;

use crate::alias::apply_l1_to_l2_alias;
use crate::artifact::ContractArtifact;
use crate::client::{ChainClient, ChainError};
use crate::error::UnlockError;
use crate::evm::contracts::encode_vault_constructor;
use crate::types::{Domain, LinkedPair, UnlockPhase};

/// Deploys AccessKey/Vault pairs
pub struct Deployer {
    l1: Arc<dyn ChainClient>,
    l2: Arc<dyn ChainClient>,
    access_key: ContractArtifact,
    vault: ContractArtifact,
}

impl Deployer {
    pub fn new(
        l1: Arc<dyn ChainClient>,
        l2: Arc<dyn ChainClient>,
        access_key: ContractArtifact,
        vault: ContractArtifact,
    ) -> Self {
        Self {
            l1,
            l2,
            access_key,
            vault,
        }
    }

    /// Deploy AccessKey on L1, then a Vault on L2 bound to its alias.
    ///
    /// A failure at either step discards the whole pair; nothing is reused.
    pub async fn deploy_linked_pair(&self) -> Result<LinkedPair, UnlockError> {
        let access_key = self.deploy_access_key().await?;
        let unlocker = apply_l1_to_l2_alias(access_key);
        info!(access_key = %access_key, unlocker = %unlocker, "Computed aliased unlocker");

        let vault = self.deploy_vault(unlocker).await?;

        Ok(LinkedPair {
            access_key,
            vault,
            unlocker,
        })
    }

    /// Deploy AccessKey on L1 (no constructor arguments)
    pub async fn deploy_access_key(&self) -> Result<Address, UnlockError> {
        let address = self
            .l1
            .deploy_contract(&self.access_key, Bytes::new())
            .await
            .map_err(|e| deployment_error(&self.access_key, e))?;

        info!(domain = %Domain::L1, address = %address, "AccessKey deployed");
        Ok(address)
    }

    /// Deploy a Vault on L2 that only `unlocker` may unlock.
    ///
    /// `deploy_linked_pair` always passes the AccessKey alias here; any other
    /// address yields a Vault no relayed message can open.
    pub async fn deploy_vault(&self, unlocker: Address) -> Result<Address, UnlockError> {
        let address = self
            .l2
            .deploy_contract(&self.vault, encode_vault_constructor(unlocker))
            .await
            .map_err(|e| deployment_error(&self.vault, e))?;

        info!(domain = %Domain::L2, address = %address, unlocker = %unlocker, "Vault deployed");
        Ok(address)
    }
}

fn deployment_error(artifact: &ContractArtifact, err: ChainError) -> UnlockError {
    match err {
        ChainError::Unavailable { .. } => UnlockError::rpc(UnlockPhase::Idle, &err),
        ChainError::Rejected { domain, reason } => UnlockError::DeploymentFailed {
            contract: artifact.contract_name.clone(),
            domain,
            reason,
        },
        ChainError::InclusionTimeout { domain, .. } => UnlockError::DeploymentFailed {
            contract: artifact.contract_name.clone(),
            domain,
            reason: err.to_string(),
        },
    }
}
