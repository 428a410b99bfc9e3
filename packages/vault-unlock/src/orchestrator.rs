//! Unlock Orchestrator
//!
//! Drives one unlock through its phases:
//!
//! ```text
//! Idle --quote--> FeeComputed --submit--> Submitted --await_unlock--> Unlocked
//!                                                 \--------------------> TimedOut
//! ```
//!
//! Each phase is also callable on its own so a caller can inspect the quote,
//! alter the message, or resume polling an attempt that timed out. Nothing is
//! retried automatically: a rejected dispatch stays rejected, and a timed out
//! attempt is reported as pending because the relay may still deliver it.
//!
//! The orchestrator holds no mutable state, so several attempts may run
//! concurrently against the same pair.

use alloy::primitives::{Address, TxHash};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{ChainClient, ChainError, TxRequest};
use crate::discovery::discover_bridgehub;
use crate::error::UnlockError;
use crate::evm::contracts::{
    decode_is_unlocked, encode_dispatch, encode_is_unlocked_query, encode_unlock_payload,
};
use crate::fee::FeeEstimator;
use crate::policy::{CancelToken, PollPolicy};
use crate::types::{
    CrossDomainMessage, Domain, FeeQuote, GasBudget, LinkedPair, UnlockAttempt, UnlockPhase,
    UnlockReceipt, VaultState,
};

/// Coordinates fee quoting, L1 dispatch and L2 completion polling for one
/// AccessKey/Vault pair
pub struct UnlockOrchestrator {
    l1: Arc<dyn ChainClient>,
    l2: Arc<dyn ChainClient>,
    access_key: Address,
    vault: Address,
    fees: FeeEstimator,
    policy: PollPolicy,
}

impl UnlockOrchestrator {
    pub fn new(
        l1: Arc<dyn ChainClient>,
        l2: Arc<dyn ChainClient>,
        pair: &LinkedPair,
        bridgehub: Address,
    ) -> Self {
        if !pair.is_correctly_bound() {
            warn!(
                access_key = %pair.access_key,
                unlocker = %pair.unlocker,
                "Vault unlocker is not the AccessKey alias; relayed unlocks will fail"
            );
        }

        Self {
            l1,
            l2,
            access_key: pair.access_key,
            vault: pair.vault,
            fees: FeeEstimator::new(bridgehub),
            policy: PollPolicy::default(),
        }
    }

    /// Build with the bridge address advertised by the L2 node
    pub async fn discover(
        l1: Arc<dyn ChainClient>,
        l2: Arc<dyn ChainClient>,
        pair: &LinkedPair,
    ) -> Result<Self, UnlockError> {
        let bridgehub = discover_bridgehub(l2.as_ref()).await?;
        Ok(Self::new(l1, l2, pair, bridgehub))
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn bridgehub(&self) -> Address {
        self.fees.bridgehub()
    }

    /// Idle -> FeeComputed.
    ///
    /// Reads the current L1 gas price and the L2 chain id, then asks the
    /// bridge what `budget` costs. Sends no transaction.
    pub async fn quote(&self, budget: &GasBudget) -> Result<FeeQuote, UnlockError> {
        let gas_price = self
            .l1
            .gas_price()
            .await
            .map_err(|e| fee_input_error(&e))?;
        let domain_id = self
            .l2
            .chain_id()
            .await
            .map_err(|e| fee_input_error(&e))?;

        let base_cost = self
            .fees
            .estimate_base_cost(self.l1.as_ref(), domain_id, gas_price, budget)
            .await?;

        info!(
            phase = %UnlockPhase::FeeComputed,
            domain_id,
            gas_price,
            base_cost = %base_cost,
            "Fee computed"
        );

        Ok(FeeQuote {
            domain_id,
            gas_price,
            budget: *budget,
            base_cost,
        })
    }

    /// The `unlock()` call to relay, funded with exactly the quoted cost
    pub fn prepare_message(&self, quote: &FeeQuote) -> CrossDomainMessage {
        CrossDomainMessage {
            target: self.vault,
            payload: encode_unlock_payload(),
            budget: quote.budget,
            value: quote.base_cost,
        }
    }

    /// FeeComputed -> Submitted.
    ///
    /// Sends the dispatch at the gas price the quote was computed at, with
    /// `message.value` attached, and waits for L1 inclusion. The message is
    /// sent as given; a value that does not match the bridge's requirement is
    /// rejected on L1. Once broadcast, a lost L1 connection surfaces as
    /// `InclusionUnknown` carrying the hash, never as a plain RPC failure.
    pub async fn submit(
        &self,
        quote: &FeeQuote,
        message: &CrossDomainMessage,
    ) -> Result<UnlockAttempt, UnlockError> {
        let calldata = encode_dispatch(quote.domain_id, self.bridgehub(), message);
        let tx = TxRequest::call(self.access_key, calldata)
            .with_value(message.value.value())
            .with_gas_price(quote.gas_price);

        let tx_hash = self.l1.send_transaction(tx).await.map_err(|e| match e {
            ChainError::Unavailable { .. } => UnlockError::rpc(UnlockPhase::FeeComputed, &e),
            other => UnlockError::SubmissionRejected {
                tx_hash: None,
                reason: other.to_string(),
            },
        })?;

        let receipt = self
            .l1
            .wait_for_inclusion(tx_hash)
            .await
            .map_err(|e| match e {
                ChainError::Unavailable { reason, .. } => {
                    warn!(
                        phase = %UnlockPhase::Submitted,
                        tx_hash = %tx_hash,
                        error = %reason,
                        "Dispatch broadcast but receipt unavailable; do not resubmit"
                    );
                    UnlockError::InclusionUnknown { tx_hash, reason }
                }
                other => UnlockError::SubmissionRejected {
                    tx_hash: Some(tx_hash),
                    reason: other.to_string(),
                },
            })?;

        if !receipt.success {
            return Err(UnlockError::SubmissionRejected {
                tx_hash: Some(tx_hash),
                reason: "dispatch reverted".to_string(),
            });
        }

        info!(
            phase = %UnlockPhase::Submitted,
            tx_hash = %tx_hash,
            l1_block = ?receipt.block_number,
            value = %message.value,
            "Dispatch included on L1"
        );

        Ok(UnlockAttempt {
            submitted_tx_hash: tx_hash,
            l1_block: receipt.block_number,
            base_cost: message.value,
            deadline: Instant::now() + self.policy.budget(),
            poll_count: 0,
        })
    }

    /// Submitted -> Unlocked | TimedOut.
    ///
    /// Reads the Vault status up to `max_attempts` times (at least once),
    /// `interval` apart, and stops at the first `true`. A failed read uses up
    /// an attempt. Can be called again on the same attempt to start a fresh
    /// polling run, which also moves `attempt.deadline` forward.
    pub async fn await_unlock(
        &self,
        attempt: &mut UnlockAttempt,
        cancel: &CancelToken,
    ) -> Result<UnlockReceipt, UnlockError> {
        let tx_hash = attempt.submitted_tx_hash;
        attempt.deadline = Instant::now() + self.policy.budget();

        let mut polls = 0u32;
        let mut transport_failures = 0u32;
        let mut last_failure: Option<ChainError> = None;

        let max_attempts = self.policy.attempts();
        while polls < max_attempts {
            if cancel.is_cancelled() {
                return Err(self.cancelled(tx_hash, polls));
            }

            polls += 1;
            attempt.poll_count += 1;

            match self.read_vault_state().await {
                Ok(VaultState::Unlocked) => {
                    info!(
                        phase = %UnlockPhase::Unlocked,
                        tx_hash = %tx_hash,
                        polls,
                        "Vault unlocked"
                    );
                    return Ok(UnlockReceipt {
                        submitted_tx_hash: tx_hash,
                        l1_block: attempt.l1_block,
                        polls,
                        base_cost: attempt.base_cost,
                    });
                }
                Ok(VaultState::Locked) => {
                    debug!(tx_hash = %tx_hash, poll = polls, "Vault still locked");
                }
                Err(e) => {
                    warn!(tx_hash = %tx_hash, poll = polls, error = %e, "Vault status read failed");
                    if e.is_transport() {
                        transport_failures += 1;
                    }
                    last_failure = Some(e);
                }
            }

            if polls < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(self.cancelled(tx_hash, polls));
                    }
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        if polls > 0 && transport_failures == polls {
            if let Some(e) = last_failure {
                return Err(UnlockError::rpc(UnlockPhase::Submitted, &e));
            }
        }

        warn!(
            phase = %UnlockPhase::TimedOut,
            tx_hash = %tx_hash,
            polls,
            "Vault not unlocked within polling budget"
        );
        Err(UnlockError::UnlockPending { tx_hash, polls })
    }

    /// Full pipeline with the configured policy
    pub async fn unlock(
        &self,
        budget: &GasBudget,
        cancel: &CancelToken,
    ) -> Result<UnlockReceipt, UnlockError> {
        info!(
            phase = %UnlockPhase::Idle,
            access_key = %self.access_key,
            vault = %self.vault,
            "Starting unlock"
        );

        let quote = self.quote(budget).await?;
        let message = self.prepare_message(&quote);
        let mut attempt = self.submit(&quote, &message).await?;
        self.await_unlock(&mut attempt, cancel).await
    }

    /// Current Vault state. Read-only and safe to call at any time.
    pub async fn vault_state(&self) -> Result<VaultState, ChainError> {
        self.read_vault_state().await
    }

    pub async fn is_unlocked(&self) -> Result<bool, ChainError> {
        Ok(self.vault_state().await? == VaultState::Unlocked)
    }

    async fn read_vault_state(&self) -> Result<VaultState, ChainError> {
        let answer = self
            .l2
            .call(self.vault, encode_is_unlocked_query())
            .await?;
        let unlocked = decode_is_unlocked(&answer).map_err(|e| ChainError::Rejected {
            domain: Domain::L2,
            reason: format!("undecodable vault status: {}", e),
        })?;
        Ok(VaultState::from(unlocked))
    }

    fn cancelled(&self, tx_hash: TxHash, polls: u32) -> UnlockError {
        info!(tx_hash = %tx_hash, polls, "Unlock polling cancelled");
        UnlockError::Cancelled { tx_hash, polls }
    }
}

/// Gas price and chain id feed the quote; a node that rejects these reads
/// leaves no usable fee.
fn fee_input_error(err: &ChainError) -> UnlockError {
    if err.is_transport() {
        UnlockError::rpc(UnlockPhase::Idle, err)
    } else {
        UnlockError::FeeUnavailable {
            reason: err.to_string(),
        }
    }
}
