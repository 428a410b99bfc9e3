//! Chain Client Seam
//!
//! The only way the unlock flow touches a ledger. One client per domain; the
//! orchestrator and deployer hold them as `Arc<dyn ChainClient>` so the real
//! alloy-backed client and the in-memory simulator are interchangeable.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::artifact::ContractArtifact;
use crate::types::Domain;

/// Failure reported by a chain client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Transport-level failure: node unreachable, timeout, malformed response
    #[error("{domain} RPC unavailable: {reason}")]
    Unavailable { domain: Domain, reason: String },

    /// The node answered with an error (revert, validation failure)
    #[error("{domain} rejected request: {reason}")]
    Rejected { domain: Domain, reason: String },

    /// No receipt appeared within the inclusion bound
    #[error("{domain} transaction {tx_hash} not included after {timeout:?}")]
    InclusionTimeout {
        domain: Domain,
        tx_hash: TxHash,
        timeout: Duration,
    },
}

impl ChainError {
    /// Domain the failure came from
    pub fn domain(&self) -> Domain {
        match self {
            ChainError::Unavailable { domain, .. }
            | ChainError::Rejected { domain, .. }
            | ChainError::InclusionTimeout { domain, .. } => *domain,
        }
    }

    /// True for transport failures that say nothing about the request itself
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Unavailable { .. })
    }
}

/// Transaction to sign and broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Pin the gas price instead of letting the client fill it
    pub gas_price: Option<u128>,
}

impl TxRequest {
    /// A zero-value call
    pub fn call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            value: U256::ZERO,
            gas_price: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// Receipt of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// False when the transaction was included but reverted
    pub success: bool,
    /// Set for contract creations
    pub contract_address: Option<Address>,
}

/// RPC facade over one ledger
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Domain this client talks to
    fn domain(&self) -> Domain;

    /// Address transactions are signed with
    fn signer_address(&self) -> Address;

    /// Chain ID reported by the node
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Current gas price in wei
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Sign and broadcast; returns once the node accepted the transaction
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ChainError>;

    /// Block until the transaction has a receipt
    async fn wait_for_inclusion(&self, tx_hash: TxHash) -> Result<InclusionReceipt, ChainError>;

    /// Read-only call at the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Deploy `artifact` with ABI-encoded constructor arguments and wait for
    /// the creation receipt
    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Bytes,
    ) -> Result<Address, ChainError>;

    /// Address of the bridge contract, as advertised by the node
    async fn bridgehub_address(&self) -> Result<Address, ChainError>;
}
