//! Per-trade derivation seeds.
//!
//! A seed is a pure function of public, reproducible trade data: both
//! orders' stable ids, the trade nonce, and which leg is being paid. Every
//! executor that replays the same fill derives the same seed, so the same
//! one-time addresses come out.

use alloy_primitives::{B256, keccak256};
use veilmatch_types::{OrderId, constants::STEALTH_SEED_DOMAIN};

/// Which side of a trade a stealth destination pays. Folded into the seed
/// as one byte so the two legs never share an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LegRole {
    Buyer = 0,
    Seller = 1,
}

/// A domain-separated, per-leg derivation seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StealthSeed(pub B256);

impl StealthSeed {
    /// `keccak256(domain || buy_id || sell_id || nonce_be || role)`.
    #[must_use]
    pub fn for_leg(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        trade_nonce: u64,
        role: LegRole,
    ) -> Self {
        let mut preimage = Vec::with_capacity(STEALTH_SEED_DOMAIN.len() + 16 + 16 + 8 + 1);
        preimage.extend_from_slice(STEALTH_SEED_DOMAIN);
        preimage.extend_from_slice(buy_order_id.as_bytes());
        preimage.extend_from_slice(sell_order_id.as_bytes());
        preimage.extend_from_slice(&trade_nonce.to_be_bytes());
        preimage.push(role as u8);
        Self(keccak256(&preimage))
    }

    #[must_use]
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}
