//! Unlock error taxonomy
//!
//! Each phase fails into its own variant so a caller can tell a message that
//! may still land (`UnlockPending`) from one that never will
//! (`SubmissionRejected`). None of these are retried automatically.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::client::ChainError;
use crate::types::{Domain, UnlockPhase};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnlockError {
    /// The bridge fee oracle reverted or returned an unusable quote
    #[error("fee quote unavailable: {reason}")]
    FeeUnavailable { reason: String },

    /// The L1 dispatch reverted or was never included
    #[error("L1 submission rejected{}: {reason}", fmt_tx(.tx_hash))]
    SubmissionRejected {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    /// A contract deployment reverted or produced no address
    #[error("{contract} deployment on {domain} failed: {reason}")]
    DeploymentFailed {
        contract: String,
        domain: Domain,
        reason: String,
    },

    /// Polling budget exhausted without observing the unlock; the message
    /// may still be relayed later
    #[error("unlock still pending after {polls} polls (L1 tx {tx_hash})")]
    UnlockPending { tx_hash: TxHash, polls: u32 },

    /// Transport failure, distinct from a contract-level rejection
    #[error("{domain} RPC unavailable during {phase}: {reason}")]
    RpcUnavailable {
        domain: Domain,
        phase: UnlockPhase,
        reason: String,
    },

    /// The dispatch was broadcast but the L1 node stopped answering before a
    /// receipt was seen; it may already be included and paid for
    #[error("L1 dispatch {tx_hash} broadcast but inclusion unknown: {reason}")]
    InclusionUnknown { tx_hash: TxHash, reason: String },

    /// Polling stopped by the caller
    #[error("unlock polling cancelled after {polls} polls (L1 tx {tx_hash})")]
    Cancelled { tx_hash: TxHash, polls: u32 },
}

fn fmt_tx(tx_hash: &Option<TxHash>) -> String {
    match tx_hash {
        Some(hash) => format!(" (tx {})", hash),
        None => String::new(),
    }
}

impl UnlockError {
    /// Wrap a transport failure with the phase it interrupted
    pub fn rpc(phase: UnlockPhase, err: &ChainError) -> Self {
        UnlockError::RpcUnavailable {
            domain: err.domain(),
            phase,
            reason: err.to_string(),
        }
    }

    /// L1 transaction already broadcast by the failed phase, if any
    pub fn submitted_tx_hash(&self) -> Option<TxHash> {
        match self {
            UnlockError::SubmissionRejected { tx_hash, .. } => *tx_hash,
            UnlockError::InclusionUnknown { tx_hash, .. }
            | UnlockError::UnlockPending { tx_hash, .. }
            | UnlockError::Cancelled { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Whether the underlying message could still complete on its own
    pub fn may_still_complete(&self) -> bool {
        matches!(
            self,
            UnlockError::UnlockPending { .. }
                | UnlockError::Cancelled { .. }
                | UnlockError::InclusionUnknown { .. }
        )
    }
}
