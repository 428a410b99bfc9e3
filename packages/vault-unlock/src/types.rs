//! Common types for the cross-domain unlock flow
//!
//! Shared by the deployer, fee estimator and orchestrator. Nothing here is
//! persisted; an `UnlockAttempt` lives only as long as the process polling it.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use crate::alias::apply_l1_to_l2_alias;

// ============================================================================
// Domains and Principals
// ============================================================================

/// One of the two ledgers taking part in the unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Settlement ledger; pays for and authorizes the message
    L1,
    /// Execution ledger; hosts the Vault
    L2,
}

impl Domain {
    /// Get the domain as a short label
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::L1 => "L1",
            Domain::L2 => "L2",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 20-byte address qualified by the domain it lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub domain: Domain,
    pub address: Address,
}

impl Principal {
    /// An address on L1
    pub fn l1(address: Address) -> Self {
        Self {
            domain: Domain::L1,
            address,
        }
    }

    /// An address on L2
    pub fn l2(address: Address) -> Self {
        Self {
            domain: Domain::L2,
            address,
        }
    }

    /// The L2 identity that acts for this principal in relayed messages.
    ///
    /// Only L1 principals have an alias; L2 addresses are never translated.
    pub fn alias(&self) -> Option<AliasedAddress> {
        match self.domain {
            Domain::L1 => Some(AliasedAddress(apply_l1_to_l2_alias(self.address))),
            Domain::L2 => None,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.address)
    }
}

/// L2 address derived from an L1 principal by the alias offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasedAddress(pub(crate) Address);

impl AliasedAddress {
    /// The raw L2 address
    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<AliasedAddress> for Address {
    fn from(aliased: AliasedAddress) -> Self {
        aliased.0
    }
}

impl fmt::Display for AliasedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Fee Types
// ============================================================================

/// Caller-chosen upper bounds on the L2 side of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasBudget {
    /// L2 execution gas limit
    pub gas_limit: u64,
    /// L2 gas-per-pubdata-byte limit
    pub pubdata_byte_limit: u64,
}

impl GasBudget {
    pub fn new(gas_limit: u64, pubdata_byte_limit: u64) -> Self {
        Self {
            gas_limit,
            pubdata_byte_limit,
        }
    }

    /// True when both limits are zero
    pub fn is_zero(&self) -> bool {
        self.gas_limit == 0 && self.pubdata_byte_limit == 0
    }
}

impl Default for GasBudget {
    fn default() -> Self {
        Self {
            gas_limit: 350_000,
            pubdata_byte_limit: 800,
        }
    }
}

/// L1-denominated payment that funds the message on L2.
///
/// Only produced by [`crate::fee::FeeEstimator`]; valid for the gas price it
/// was quoted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseCost(pub U256);

impl BaseCost {
    pub fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for BaseCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Result of the fee phase: everything the submission needs to pay exactly
/// what was quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    /// Destination chain id passed to the bridge
    pub domain_id: u64,
    /// L1 gas price the quote was computed at
    pub gas_price: u128,
    pub budget: GasBudget,
    pub base_cost: BaseCost,
}

// ============================================================================
// Messages and Attempts
// ============================================================================

/// The L2 call carried by the L1 dispatch.
///
/// Built once per attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossDomainMessage {
    /// L2 contract the relay will call
    pub target: Address,
    /// ABI-encoded call data for `target`
    pub payload: Bytes,
    pub budget: GasBudget,
    /// Value attached to the L1 dispatch
    pub value: BaseCost,
}

/// In-flight unlock attempt
#[derive(Debug, Clone)]
pub struct UnlockAttempt {
    pub submitted_tx_hash: TxHash,
    /// L1 block the dispatch was included in
    pub l1_block: Option<u64>,
    /// Value the dispatch paid
    pub base_cost: BaseCost,
    /// When the current polling run is expected to finish, from the
    /// policy's budget. Informational: a run stops on its attempt count,
    /// so slow reads can carry it past this instant.
    pub deadline: Instant,
    /// Status reads across every polling run of this attempt
    pub poll_count: u32,
}

/// Observable Vault state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultState {
    Locked,
    Unlocked,
}

impl From<bool> for VaultState {
    fn from(unlocked: bool) -> Self {
        if unlocked {
            VaultState::Unlocked
        } else {
            VaultState::Locked
        }
    }
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::Locked => f.write_str("locked"),
            VaultState::Unlocked => f.write_str("unlocked"),
        }
    }
}

/// Unlock state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlockPhase {
    Idle,
    FeeComputed,
    Submitted,
    Unlocked,
    TimedOut,
}

impl UnlockPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockPhase::Idle => "idle",
            UnlockPhase::FeeComputed => "fee_computed",
            UnlockPhase::Submitted => "submitted",
            UnlockPhase::Unlocked => "unlocked",
            UnlockPhase::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for UnlockPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AccessKey/Vault pair with the unlocker binding the Vault was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedPair {
    pub access_key: Address,
    pub vault: Address,
    pub unlocker: Address,
}

impl LinkedPair {
    /// Whether the Vault's unlocker is the alias of this AccessKey
    pub fn is_correctly_bound(&self) -> bool {
        apply_l1_to_l2_alias(self.access_key) == self.unlocker
    }
}

/// Successful completion of an unlock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockReceipt {
    pub submitted_tx_hash: TxHash,
    pub l1_block: Option<u64>,
    /// Status reads it took to observe the unlock (1-based)
    pub polls: u32,
    pub base_cost: BaseCost,
}
