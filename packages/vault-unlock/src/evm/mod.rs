//! EVM Chain Support Module
//!
//! Both ledgers speak Ethereum JSON-RPC, so one client type serves L1 and L2.
//!
//! ## Submodules
//!
//! - `client` - alloy-backed `ChainClient` with signer
//! - `contracts` - AccessKey / Vault / Bridgehub ABI via the sol! macro

pub mod client;
pub mod contracts;

// Re-export commonly used items
pub use client::{EvmChainClient, EvmClientConfig};
pub use contracts::{AccessKey, IBridgehub, Vault};
