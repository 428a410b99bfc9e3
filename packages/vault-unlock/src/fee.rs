//! Base cost quoting
//!
//! The L2 execution fee is priced in L1 currency by the bridge itself. We
//! never reproduce its formula; every quote is a live `l2TransactionBaseCost`
//! call through the L1 client.

use alloy::primitives::Address;
use tracing::{debug, info};

use crate::client::{ChainClient, ChainError};
use crate::error::UnlockError;
use crate::evm::contracts::{decode_base_cost, encode_base_cost_query};
use crate::types::{BaseCost, GasBudget, UnlockPhase};

/// Queries the bridge fee oracle
#[derive(Debug, Clone, Copy)]
pub struct FeeEstimator {
    bridgehub: Address,
}

impl FeeEstimator {
    pub fn new(bridgehub: Address) -> Self {
        Self { bridgehub }
    }

    pub fn bridgehub(&self) -> Address {
        self.bridgehub
    }

    /// Quote the L1 payment that funds `budget` on L2 at `gas_price`.
    ///
    /// Same inputs against an unchanged oracle give the same quote.
    pub async fn estimate_base_cost(
        &self,
        l1: &dyn ChainClient,
        domain_id: u64,
        gas_price: u128,
        budget: &GasBudget,
    ) -> Result<BaseCost, UnlockError> {
        let query = encode_base_cost_query(domain_id, gas_price, budget);

        let answer = l1.call(self.bridgehub, query).await.map_err(|e| match e {
            ChainError::Unavailable { .. } => UnlockError::rpc(UnlockPhase::Idle, &e),
            other => UnlockError::FeeUnavailable {
                reason: other.to_string(),
            },
        })?;

        let base_cost = decode_base_cost(&answer).map_err(|e| UnlockError::FeeUnavailable {
            reason: format!("undecodable base cost: {}", e),
        })?;

        if base_cost.is_zero() && !budget.is_zero() {
            return Err(UnlockError::FeeUnavailable {
                reason: format!(
                    "oracle quoted zero for gas limit {} / pubdata limit {}",
                    budget.gas_limit, budget.pubdata_byte_limit
                ),
            });
        }

        debug!(
            bridgehub = %self.bridgehub,
            domain_id,
            gas_price,
            gas_limit = budget.gas_limit,
            pubdata_byte_limit = budget.pubdata_byte_limit,
            "Base cost query answered"
        );
        info!(base_cost = %base_cost, "Computed base cost");

        Ok(base_cost)
    }
}
