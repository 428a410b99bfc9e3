//! AccessKey / Vault / Bridgehub ABI definitions
//!
//! Uses alloy's sol! macro for the call types only; the encode/decode helpers
//! below are pure functions so the same bytes can be fed to any `ChainClient`.

#![allow(clippy::too_many_arguments)]

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

use crate::types::{BaseCost, CrossDomainMessage, GasBudget};

sol! {
    /// L1 access-control contract that finances and dispatches the unlock
    contract AccessKey {
        /// Request an L2 call through the bridge, paying `baseCost` as msg.value
        function unlockVaultOnL2(
            uint256 chainId,
            address bridgehub,
            address l2Contract,
            bytes data,
            uint256 l2GasLimit,
            uint256 l2GasPerPubdataByteLimit,
            uint256 baseCost
        ) external payable returns (bytes32 canonicalTxHash);
    }

    /// L2 resource contract, unlockable only by its constructor-bound unlocker
    contract Vault {
        function unlock() external;

        function isVaultUnlocked() external view returns (bool);
    }

    /// Bridge fee oracle
    interface IBridgehub {
        function l2TransactionBaseCost(
            uint256 chainId,
            uint256 gasPrice,
            uint256 l2GasLimit,
            uint256 l2GasPerPubdataByteLimit
        ) external view returns (uint256);
    }
}

/// Vault constructor arguments: the authorized unlocker
pub fn encode_vault_constructor(unlocker: Address) -> Bytes {
    Bytes::from(unlocker.abi_encode())
}

/// Payload carried to L2: `Vault.unlock()`
pub fn encode_unlock_payload() -> Bytes {
    Bytes::from(Vault::unlockCall {}.abi_encode())
}

/// `Vault.isVaultUnlocked()` query
pub fn encode_is_unlocked_query() -> Bytes {
    Bytes::from(Vault::isVaultUnlockedCall {}.abi_encode())
}

pub fn decode_is_unlocked(data: &[u8]) -> Result<bool, alloy::sol_types::Error> {
    Ok(Vault::isVaultUnlockedCall::abi_decode_returns(data, true)?._0)
}

/// `IBridgehub.l2TransactionBaseCost(..)` query
pub fn encode_base_cost_query(domain_id: u64, gas_price: u128, budget: &GasBudget) -> Bytes {
    Bytes::from(
        IBridgehub::l2TransactionBaseCostCall {
            chainId: U256::from(domain_id),
            gasPrice: U256::from(gas_price),
            l2GasLimit: U256::from(budget.gas_limit),
            l2GasPerPubdataByteLimit: U256::from(budget.pubdata_byte_limit),
        }
        .abi_encode(),
    )
}

pub fn decode_base_cost(data: &[u8]) -> Result<BaseCost, alloy::sol_types::Error> {
    Ok(BaseCost(
        IBridgehub::l2TransactionBaseCostCall::abi_decode_returns(data, true)?._0,
    ))
}

/// `AccessKey.unlockVaultOnL2(..)` calldata for a prepared message
pub fn encode_dispatch(domain_id: u64, bridgehub: Address, message: &CrossDomainMessage) -> Bytes {
    Bytes::from(
        AccessKey::unlockVaultOnL2Call {
            chainId: U256::from(domain_id),
            bridgehub,
            l2Contract: message.target,
            data: message.payload.clone(),
            l2GasLimit: U256::from(message.budget.gas_limit),
            l2GasPerPubdataByteLimit: U256::from(message.budget.pubdata_byte_limit),
            baseCost: message.value.value(),
        }
        .abi_encode(),
    )
}
