//! Simulated L1/L2 Pair
//!
//! A deterministic, in-memory model of the two ledgers and the bridge between
//! them, behind the same [`ChainClient`] seam as the real RPC client:
//!
//! - L1 hosts the bridge fee oracle and any number of AccessKey contracts
//! - L2 hosts Vault contracts and advertises the bridge address
//! - A relay carries accepted dispatches to L2 after a configurable number of
//!   L2 reads, calling the target with the aliased AccessKey as sender
//!
//! Contracts are recognised by marker bytecode, so deployments must use
//! [`SimNetwork::access_key_artifact`] and [`SimNetwork::vault_artifact`].
//!
//! ## Usage
//!
//! ```ignore
//! let sim = SimNetwork::new(SimConfig::default());
//! let deployer = Deployer::new(
//!     sim.l1_client(),
//!     sim.l2_client(),
//!     sim.access_key_artifact(),
//!     sim.vault_artifact(),
//! );
//! let pair = deployer.deploy_linked_pair().await?;
//! ```

use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::alias::apply_l1_to_l2_alias;
use crate::artifact::ContractArtifact;
use crate::client::{ChainClient, ChainError, InclusionReceipt, TxRequest};
use crate::evm::contracts::{AccessKey, IBridgehub, Vault};
use crate::types::Domain;

/// Address the simulated bridge lives at on L1
pub const SIM_BRIDGEHUB: Address = address!("00000000000000000000000000000000000b71d6");

/// Anvil account #0
pub const SIM_L1_SIGNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Anvil account #1
pub const SIM_L2_SIGNER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// Weight of one unit of pubdata limit relative to one unit of gas limit in
/// the simulated oracle
pub const SIM_PUBDATA_WEIGHT: u64 = 64;

const ACCESS_KEY_CODE: &[u8] = b"sim:AccessKey";
const VAULT_CODE: &[u8] = b"sim:Vault";

/// Simulated network parameters
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub l1_chain_id: u64,
    pub l2_chain_id: u64,
    /// Initial L1 gas price in wei
    pub l1_gas_price: u128,
    /// Initial L2 gas price in wei
    pub l2_gas_price: u128,
    pub l1_signer: Address,
    pub l2_signer: Address,
    /// L2 reads between an accepted dispatch and its delivery
    pub relay_delay: u64,
    /// Smallest L2 gas limit the bridge accepts
    pub min_l2_gas_limit: u64,
    /// Smallest pubdata-per-byte limit the bridge accepts
    pub min_pubdata_byte_limit: u64,
    /// Whether L2 answers bridge discovery with a real address
    pub advertise_bridgehub: bool,
    /// Mine reverting transactions with a failed status instead of rejecting
    /// them at submission
    pub include_reverts: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            l1_chain_id: 9,
            l2_chain_id: 270,
            l1_gas_price: 1_000_000_000,
            l2_gas_price: 250_000_000,
            l1_signer: SIM_L1_SIGNER,
            l2_signer: SIM_L2_SIGNER,
            relay_delay: 3,
            min_l2_gas_limit: 100_000,
            min_pubdata_byte_limit: 800,
            advertise_bridgehub: true,
            include_reverts: false,
        }
    }
}

/// Fee oracle behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleMode {
    Normal,
    /// Every quote reverts
    Revert,
    /// Every quote answers zero
    Zero,
}

/// A transaction mined on a simulated domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub tx_hash: TxHash,
    /// `None` for contract creations
    pub to: Option<Address>,
    pub value: U256,
    pub gas_price: u128,
    pub block_number: u64,
    pub success: bool,
}

/// A relayed message the target refused to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub target: Address,
    pub sender: Address,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
enum Contract {
    AccessKey,
    Vault { unlocker: Address, unlocked: bool },
}

#[derive(Debug)]
struct Ledger {
    chain_id: u64,
    gas_price: u128,
    signer: Address,
    nonce: u64,
    block: u64,
    offline: bool,
    stall_inclusion: bool,
    contracts: HashMap<Address, Contract>,
    receipts: HashMap<TxHash, InclusionReceipt>,
    transactions: Vec<SentTransaction>,
}

impl Ledger {
    fn new(chain_id: u64, gas_price: u128, signer: Address) -> Self {
        Self {
            chain_id,
            gas_price,
            signer,
            nonce: 0,
            block: 0,
            offline: false,
            stall_inclusion: false,
            contracts: HashMap::new(),
            receipts: HashMap::new(),
            transactions: Vec::new(),
        }
    }

    fn next_tx_hash(&mut self) -> TxHash {
        let mut seed = Vec::with_capacity(24);
        seed.extend_from_slice(&self.chain_id.to_be_bytes());
        seed.extend_from_slice(self.signer.as_slice());
        seed.extend_from_slice(&self.nonce.to_be_bytes());
        let hash = keccak256(seed);
        self.nonce += 1;
        hash
    }

    fn mine(
        &mut self,
        tx_hash: TxHash,
        to: Option<Address>,
        value: U256,
        gas_price: u128,
        success: bool,
        contract_address: Option<Address>,
    ) {
        self.block += 1;
        self.transactions.push(SentTransaction {
            tx_hash,
            to,
            value,
            gas_price,
            block_number: self.block,
            success,
        });
        self.receipts.insert(
            tx_hash,
            InclusionReceipt {
                tx_hash,
                block_number: Some(self.block),
                success,
                contract_address,
            },
        );
    }
}

#[derive(Debug)]
struct PendingMessage {
    sender: Address,
    target: Address,
    payload: Bytes,
    deliver_at: u64,
}

#[derive(Debug)]
struct State {
    config: SimConfig,
    l1: Ledger,
    l2: Ledger,
    oracle: OracleMode,
    relay_halted: bool,
    l2_reads: u64,
    pending: Vec<PendingMessage>,
    failed_deliveries: Vec<FailedDelivery>,
}

impl State {
    fn ledger(&self, domain: Domain) -> &Ledger {
        match domain {
            Domain::L1 => &self.l1,
            Domain::L2 => &self.l2,
        }
    }

    fn ledger_mut(&mut self, domain: Domain) -> &mut Ledger {
        match domain {
            Domain::L1 => &mut self.l1,
            Domain::L2 => &mut self.l2,
        }
    }

    fn ensure_online(&self, domain: Domain) -> Result<(), ChainError> {
        if self.ledger(domain).offline {
            return Err(ChainError::Unavailable {
                domain,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    /// `l2TransactionBaseCost` as the simulated bridge prices it
    fn base_cost(
        &self,
        chain_id: U256,
        gas_price: U256,
        gas_limit: U256,
        pubdata_byte_limit: U256,
    ) -> Result<U256, String> {
        match self.oracle {
            OracleMode::Revert => Err("execution reverted: oracle paused".to_string()),
            OracleMode::Zero => Ok(U256::ZERO),
            OracleMode::Normal => {
                if chain_id != U256::from(self.config.l2_chain_id) {
                    return Err(format!("execution reverted: unknown chain {}", chain_id));
                }
                Ok(gas_price
                    * (gas_limit + pubdata_byte_limit * U256::from(SIM_PUBDATA_WEIGHT)))
            }
        }
    }

    /// Validate an `unlockVaultOnL2` dispatch the way AccessKey and the
    /// bridge would, and queue it for the relay
    fn dispatch(
        &mut self,
        access_key: Address,
        data: &[u8],
        value: U256,
        gas_price: u128,
    ) -> Result<(), String> {
        let call = AccessKey::unlockVaultOnL2Call::abi_decode(data, true)
            .map_err(|e| format!("execution reverted: bad calldata ({})", e))?;

        if call.bridgehub != SIM_BRIDGEHUB {
            return Err("execution reverted: unknown bridge".to_string());
        }
        if value != call.baseCost {
            return Err("execution reverted: msg.value must equal baseCost".to_string());
        }
        if call.l2GasLimit < U256::from(self.config.min_l2_gas_limit) {
            return Err("execution reverted: L2 gas limit too low".to_string());
        }
        if call.l2GasPerPubdataByteLimit < U256::from(self.config.min_pubdata_byte_limit) {
            return Err("execution reverted: pubdata byte limit too low".to_string());
        }

        let required = self.base_cost(
            call.chainId,
            U256::from(gas_price),
            call.l2GasLimit,
            call.l2GasPerPubdataByteLimit,
        )?;
        if value < required {
            return Err(format!(
                "execution reverted: base cost {} exceeds value {}",
                required, value
            ));
        }

        self.pending.push(PendingMessage {
            sender: apply_l1_to_l2_alias(access_key),
            target: call.l2Contract,
            payload: call.data,
            deliver_at: self.l2_reads + self.config.relay_delay,
        });
        Ok(())
    }

    /// Deliver every message whose delay has elapsed
    fn relay(&mut self) {
        if self.relay_halted {
            return;
        }

        let reads = self.l2_reads;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|m| m.deliver_at <= reads);
        self.pending = waiting;

        for message in due {
            if let Err(reason) = self.execute_on_l2(&message) {
                self.failed_deliveries.push(FailedDelivery {
                    target: message.target,
                    sender: message.sender,
                    reason,
                });
            }
        }
    }

    fn execute_on_l2(&mut self, message: &PendingMessage) -> Result<(), String> {
        if message.payload.as_ref() != Vault::unlockCall::SELECTOR.as_slice() {
            return Err("unknown entry point".to_string());
        }
        match self.l2.contracts.get_mut(&message.target) {
            Some(Contract::Vault { unlocker, unlocked }) => {
                if *unlocker != message.sender {
                    return Err("caller is not the unlocker".to_string());
                }
                *unlocked = true;
                Ok(())
            }
            _ => Err("target is not a vault".to_string()),
        }
    }
}

/// Shared handle on the simulated pair
#[derive(Clone)]
pub struct SimNetwork {
    state: Arc<Mutex<State>>,
}

impl SimNetwork {
    pub fn new(config: SimConfig) -> Self {
        let state = State {
            l1: Ledger::new(config.l1_chain_id, config.l1_gas_price, config.l1_signer),
            l2: Ledger::new(config.l2_chain_id, config.l2_gas_price, config.l2_signer),
            config,
            oracle: OracleMode::Normal,
            relay_halted: false,
            l2_reads: 0,
            pending: Vec::new(),
            failed_deliveries: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn l1_client(&self) -> Arc<dyn ChainClient> {
        Arc::new(SimChainClient {
            domain: Domain::L1,
            network: self.clone(),
        })
    }

    pub fn l2_client(&self) -> Arc<dyn ChainClient> {
        Arc::new(SimChainClient {
            domain: Domain::L2,
            network: self.clone(),
        })
    }

    pub fn access_key_artifact(&self) -> ContractArtifact {
        ContractArtifact::new("AccessKey", Bytes::from_static(ACCESS_KEY_CODE))
    }

    pub fn vault_artifact(&self) -> ContractArtifact {
        ContractArtifact::new("Vault", Bytes::from_static(VAULT_CODE))
    }

    pub fn bridgehub(&self) -> Address {
        SIM_BRIDGEHUB
    }

    // ------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------

    pub fn set_gas_price(&self, domain: Domain, gas_price: u128) {
        self.lock().ledger_mut(domain).gas_price = gas_price;
    }

    /// Make every RPC on `domain` fail at the transport level
    pub fn set_offline(&self, domain: Domain, offline: bool) {
        self.lock().ledger_mut(domain).offline = offline;
    }

    pub fn set_oracle_mode(&self, mode: OracleMode) {
        self.lock().oracle = mode;
    }

    /// Accept transactions on `domain` without ever mining them
    pub fn stall_inclusion(&self, domain: Domain, stalled: bool) {
        self.lock().ledger_mut(domain).stall_inclusion = stalled;
    }

    /// Stop delivering queued messages
    pub fn halt_relay(&self) {
        self.lock().relay_halted = true;
    }

    pub fn resume_relay(&self) {
        self.lock().relay_halted = false;
    }

    // ------------------------------------------------------------------
    // Inspectors
    // ------------------------------------------------------------------

    pub fn l1_transactions(&self) -> Vec<SentTransaction> {
        self.lock().l1.transactions.clone()
    }

    pub fn l2_transactions(&self) -> Vec<SentTransaction> {
        self.lock().l2.transactions.clone()
    }

    /// Read-only calls served by L2
    pub fn l2_reads(&self) -> u64 {
        self.lock().l2_reads
    }

    pub fn pending_messages(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn failed_deliveries(&self) -> Vec<FailedDelivery> {
        self.lock().failed_deliveries.clone()
    }

    /// Unlocker a Vault was constructed with
    pub fn vault_unlocker(&self, vault: Address) -> Option<Address> {
        match self.lock().l2.contracts.get(&vault) {
            Some(Contract::Vault { unlocker, .. }) => Some(*unlocker),
            _ => None,
        }
    }

    /// Vault state without counting as an L2 read or advancing the relay
    pub fn peek_vault_unlocked(&self, vault: Address) -> Option<bool> {
        match self.lock().l2.contracts.get(&vault) {
            Some(Contract::Vault { unlocked, .. }) => Some(*unlocked),
            _ => None,
        }
    }
}

/// One domain of a [`SimNetwork`]
pub struct SimChainClient {
    domain: Domain,
    network: SimNetwork,
}

#[async_trait]
impl ChainClient for SimChainClient {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn signer_address(&self) -> Address {
        self.network.lock().ledger(self.domain).signer
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let state = self.network.lock();
        state.ensure_online(self.domain)?;
        Ok(state.ledger(self.domain).chain_id)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let state = self.network.lock();
        state.ensure_online(self.domain)?;
        Ok(state.ledger(self.domain).gas_price)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ChainError> {
        let mut state = self.network.lock();
        state.ensure_online(self.domain)?;

        let gas_price = tx
            .gas_price
            .unwrap_or_else(|| state.ledger(self.domain).gas_price);

        if state.ledger(self.domain).stall_inclusion {
            return Ok(state.ledger_mut(self.domain).next_tx_hash());
        }

        let is_access_key = self.domain == Domain::L1
            && matches!(state.l1.contracts.get(&tx.to), Some(Contract::AccessKey));

        let outcome = if is_access_key {
            state.dispatch(tx.to, &tx.data, tx.value, gas_price)
        } else {
            Ok(())
        };

        if let Err(reason) = &outcome {
            if !state.config.include_reverts {
                return Err(ChainError::Rejected {
                    domain: self.domain,
                    reason: reason.clone(),
                });
            }
        }

        let ledger = state.ledger_mut(self.domain);
        let tx_hash = ledger.next_tx_hash();
        ledger.mine(
            tx_hash,
            Some(tx.to),
            tx.value,
            gas_price,
            outcome.is_ok(),
            None,
        );
        Ok(tx_hash)
    }

    async fn wait_for_inclusion(&self, tx_hash: TxHash) -> Result<InclusionReceipt, ChainError> {
        let state = self.network.lock();
        state.ensure_online(self.domain)?;
        state
            .ledger(self.domain)
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(ChainError::InclusionTimeout {
                domain: self.domain,
                tx_hash,
                timeout: Duration::ZERO,
            })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let mut state = self.network.lock();
        state.ensure_online(self.domain)?;

        match self.domain {
            Domain::L1 => {
                if to != SIM_BRIDGEHUB {
                    return Ok(Bytes::new());
                }
                let query = IBridgehub::l2TransactionBaseCostCall::abi_decode(&data, true)
                    .map_err(|e| ChainError::Rejected {
                        domain: Domain::L1,
                        reason: format!("execution reverted: bad calldata ({})", e),
                    })?;
                let cost = state
                    .base_cost(
                        query.chainId,
                        query.gasPrice,
                        query.l2GasLimit,
                        query.l2GasPerPubdataByteLimit,
                    )
                    .map_err(|reason| ChainError::Rejected {
                        domain: Domain::L1,
                        reason,
                    })?;
                Ok(Bytes::from(cost.abi_encode()))
            }
            Domain::L2 => {
                state.l2_reads += 1;
                state.relay();

                let is_status_query =
                    data.as_ref() == Vault::isVaultUnlockedCall::SELECTOR.as_slice();
                match state.l2.contracts.get(&to) {
                    Some(Contract::Vault { unlocked, .. }) if is_status_query => {
                        Ok(Bytes::from(unlocked.abi_encode()))
                    }
                    _ => Ok(Bytes::new()),
                }
            }
        }
    }

    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Bytes,
    ) -> Result<Address, ChainError> {
        let mut state = self.network.lock();
        state.ensure_online(self.domain)?;

        let contract = match (self.domain, artifact.bytecode.as_ref()) {
            (Domain::L1, ACCESS_KEY_CODE) => Some(Contract::AccessKey),
            (Domain::L2, VAULT_CODE) => Address::abi_decode(&constructor_args, true)
                .ok()
                .map(|unlocker| Contract::Vault {
                    unlocker,
                    unlocked: false,
                }),
            _ => None,
        };

        let ledger = state.ledger_mut(self.domain);
        let address = ledger.signer.create(ledger.nonce);
        let tx_hash = ledger.next_tx_hash();
        let gas_price = ledger.gas_price;

        if ledger.stall_inclusion {
            return Err(ChainError::InclusionTimeout {
                domain: self.domain,
                tx_hash,
                timeout: Duration::ZERO,
            });
        }

        match contract {
            Some(contract) => {
                ledger.contracts.insert(address, contract);
                ledger.mine(tx_hash, None, U256::ZERO, gas_price, true, Some(address));
                Ok(address)
            }
            None => {
                ledger.mine(tx_hash, None, U256::ZERO, gas_price, false, None);
                Err(ChainError::Rejected {
                    domain: self.domain,
                    reason: format!("{} creation {} reverted", artifact.contract_name, tx_hash),
                })
            }
        }
    }

    async fn bridgehub_address(&self) -> Result<Address, ChainError> {
        let state = self.network.lock();
        state.ensure_online(self.domain)?;

        match self.domain {
            Domain::L1 => Err(ChainError::Rejected {
                domain: Domain::L1,
                reason: "method not found".to_string(),
            }),
            Domain::L2 if state.config.advertise_bridgehub => Ok(SIM_BRIDGEHUB),
            Domain::L2 => Ok(Address::ZERO),
        }
    }
}
