//! Identifiers used throughout veilmatch.
//!
//! Order ids use UUIDv7 for time-ordered lexicographic sorting. Settlement
//! ids are content-derived so every retry of the same logical trade carries
//! the same 32-byte identity on-chain.

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants;

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Globally unique order identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Stable 16-byte form, used as input to content-derived ids.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PairId
// ---------------------------------------------------------------------------

/// A trading pair identifier (e.g. `RWA-USDC`). Base token first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PairId(pub String);

impl PairId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SettlementId
// ---------------------------------------------------------------------------

/// The `orderId: bytes32` carried by Settle / CrossChainSettle reports.
///
/// Derived from both legs' order ids and the trade nonce, never from wall
/// clock or randomness: the same fill always maps to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SettlementId(pub B256);

impl SettlementId {
    /// `sha256(domain || buy_order_id || sell_order_id || trade_nonce_be)`.
    #[must_use]
    pub fn derive(buy_order_id: OrderId, sell_order_id: OrderId, trade_nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::SETTLEMENT_ID_DOMAIN);
        hasher.update(buy_order_id.as_bytes());
        hasher.update(sell_order_id.as_bytes());
        hasher.update(trade_nonce.to_be_bytes());
        Self(B256::from_slice(&hasher.finalize()))
    }

    #[must_use]
    pub fn as_b256(&self) -> B256 {
        self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<B256> for SettlementId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stl:{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
