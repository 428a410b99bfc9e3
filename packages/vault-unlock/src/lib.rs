//! Vault-Unlock: L1 -> L2 Cross-Domain Unlock Orchestration
//!
//! Drives an AccessKey contract on L1 to authorize and finance a priority
//! message that unlocks a Vault contract on L2, then confirms completion by
//! polling the Vault (there is no push notification across domains).
//!
//! - **Alias** - L1 principal to L2 counterpart address transform
//! - **Client** - `ChainClient` seam over each domain's JSON-RPC
//! - **Fee** - base cost quote from the live bridge oracle
//! - **Deployer** - AccessKey on L1, Vault on L2 bound to the aliased AccessKey
//! - **Orchestrator** - quote, dispatch, bounded completion polling
//! - **Testing** - in-memory two-domain simulator (feature `testing`)
//!
//! ## Usage
//!
//! ```ignore
//! let deployer = Deployer::new(l1.clone(), l2.clone(), access_key_art, vault_art);
//! let pair = deployer.deploy_linked_pair().await?;
//!
//! let orchestrator = UnlockOrchestrator::discover(l1, l2, &pair).await?;
//! let receipt = orchestrator
//!     .unlock(&GasBudget::default(), &CancelToken::new())
//!     .await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `testing` - Enable the simulated L1/L2 pair used by the integration tests

pub mod alias;
pub mod artifact;
pub mod client;
pub mod config;
pub mod deployer;
pub mod discovery;
pub mod error;
pub mod evm;
pub mod fee;
pub mod orchestrator;
pub mod policy;
pub mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use alias::{apply_l1_to_l2_alias, undo_l1_to_l2_alias, L1_TO_L2_ALIAS_OFFSET};
pub use artifact::ContractArtifact;
pub use client::{ChainClient, ChainError, InclusionReceipt, TxRequest};
pub use deployer::Deployer;
pub use error::UnlockError;
pub use evm::{EvmChainClient, EvmClientConfig};
pub use fee::FeeEstimator;
pub use orchestrator::UnlockOrchestrator;
pub use policy::{CancelToken, PollPolicy};
pub use types::{
    AliasedAddress, BaseCost, CrossDomainMessage, Domain, FeeQuote, GasBudget, LinkedPair,
    Principal, UnlockAttempt, UnlockPhase, UnlockReceipt, VaultState,
};
