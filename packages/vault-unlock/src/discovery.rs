//! Bridge Discovery
//!
//! The L2 node advertises the address of the bridge contract that quotes fees
//! and accepts priority messages on L1. A configured address takes precedence
//! so deployments with a non-standard node can still run.
//!
//! ## Usage
//!
//! ```ignore
//! use vault_unlock::discovery::resolve_bridgehub;
//!
//! let bridgehub = resolve_bridgehub(l2.as_ref(), config.bridgehub_address).await?;
//! ```

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::client::ChainClient;
use crate::error::UnlockError;
use crate::types::UnlockPhase;

/// Ask the node for the bridge address.
///
/// A zero address means the node has no bridge configured and is reported as
/// an unusable fee oracle.
pub async fn discover_bridgehub(client: &dyn ChainClient) -> Result<Address, UnlockError> {
    let bridgehub = client.bridgehub_address().await.map_err(|e| {
        if e.is_transport() {
            UnlockError::rpc(UnlockPhase::Idle, &e)
        } else {
            UnlockError::FeeUnavailable {
                reason: format!("bridge discovery failed: {}", e),
            }
        }
    })?;

    if bridgehub == Address::ZERO {
        return Err(UnlockError::FeeUnavailable {
            reason: format!("{} node reports zero bridge address", client.domain()),
        });
    }

    info!(domain = %client.domain(), bridgehub = %bridgehub, "Discovered bridge");
    Ok(bridgehub)
}

/// Use `configured` when set, otherwise discover it from `client`
pub async fn resolve_bridgehub(
    client: &dyn ChainClient,
    configured: Option<Address>,
) -> Result<Address, UnlockError> {
    match configured {
        Some(address) if address != Address::ZERO => Ok(address),
        Some(_) => {
            warn!("Configured bridge address is zero, falling back to discovery");
            discover_bridgehub(client).await
        }
        None => discover_bridgehub(client).await,
    }
}
