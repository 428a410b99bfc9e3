//! L1 -> L2 Address Aliasing
//!
//! When an L1 contract sends a priority message, L2 sees the call as coming
//! from `address + OFFSET (mod 2^160)` rather than from the literal L1
//! address. That keeps an L1 contract from impersonating an unrelated L2
//! contract deployed at the same bytes.
//!
//! ```text
//! alias(a)   = (a + 0x1111000000000000000000000000000000001111) mod 2^160
//! unalias(b) = (b - 0x1111000000000000000000000000000000001111) mod 2^160
//! ```

use alloy::primitives::{address, aliases::U160, Address};

/// Offset added to an L1 address to obtain its L2 alias
pub const L1_TO_L2_ALIAS_OFFSET: Address = address!("1111000000000000000000000000000000001111");

fn to_u160(addr: Address) -> U160 {
    U160::from_be_bytes(addr.0 .0)
}

fn from_u160(value: U160) -> Address {
    Address::from(value.to_be_bytes::<20>())
}

/// Map an L1 address to the address it acts as on L2.
///
/// Total over the 160-bit space; the sum wraps at 2^160.
pub fn apply_l1_to_l2_alias(l1_address: Address) -> Address {
    from_u160(to_u160(l1_address).wrapping_add(to_u160(L1_TO_L2_ALIAS_OFFSET)))
}

/// Recover the L1 address behind an aliased L2 sender
pub fn undo_l1_to_l2_alias(l2_address: Address) -> Address {
    from_u160(to_u160(l2_address).wrapping_sub(to_u160(L1_TO_L2_ALIAS_OFFSET)))
}
