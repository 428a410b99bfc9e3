//! Testing Utilities Module
//!
//! In-memory stand-ins for the two ledgers so the whole unlock flow can be
//! exercised without nodes.
//!
//! ## Submodules
//!
//! - `sim` - Simulated L1/L2 pair with fee oracle, AccessKey, Vault and relay

pub mod sim;

pub use sim::*;
