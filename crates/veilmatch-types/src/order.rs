//! Order types for veilmatch.
//!
//! Orders are simple limit orders. `filled_amount` and `status` are mutated
//! only by the matching engine, under the pair lock; the owner may cancel
//! while the order is PENDING or OPEN.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    OrderId, PairId, Result, SpendingPublicKey, VeilError, constants, quote_amount, to_base_units,
};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
///
/// ```text
///   PENDING ──attach stealth──▶ OPEN ──fully filled──▶ SETTLED
///      │                         │
///      └────────cancel───────────┴──────▶ CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted, but not yet matchable (no stealth destination attached).
    Pending,
    /// Resting in the book and matchable.
    Open,
    /// Fully filled. Terminal.
    Settled,
    /// Cancelled by its owner. Terminal.
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Open)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Open => write!(f, "OPEN"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A submission payload, before the engine assigns id / status / timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub pair_id: PairId,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub owner: Address,
    /// Spending public key under which per-trade stealth addresses are derived.
    pub stealth_meta: Option<SpendingPublicKey>,
}

/// A persisted limit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub pair_id: PairId,
    pub side: OrderSide,
    /// Total base quantity.
    pub amount: Decimal,
    /// Base quantity already matched.
    pub filled_amount: Decimal,
    /// Limit price in quote units per base unit.
    pub price: Decimal,
    /// The depositor's persistent identity. Never used as a payout target.
    pub owner: Address,
    /// The order's stealth destination: the owner's spending public key.
    /// `None` until the client attaches one.
    pub stealth_meta: Option<SpendingPublicKey>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a fresh order from a submission. Status is OPEN when a stealth
    /// destination is already attached, PENDING otherwise.
    #[must_use]
    pub fn from_new(new: NewOrder, now: DateTime<Utc>) -> Self {
        let status = if new.stealth_meta.is_some() {
            OrderStatus::Open
        } else {
            OrderStatus::Pending
        };
        Self {
            id: OrderId::new(),
            pair_id: new.pair_id,
            side: new.side,
            amount: new.amount,
            filled_amount: Decimal::ZERO,
            price: new.price,
            owner: new.owner,
            stealth_meta: new.stealth_meta,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the structural invariants: `amount > 0`, `price > 0`,
    /// `0 <= filled_amount <= amount`, and bounded precision.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(VeilError::InvalidOrder {
                reason: "Amount must be positive".to_string(),
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(VeilError::InvalidOrder {
                reason: "Price must be positive".to_string(),
            });
        }
        if self.filled_amount.is_sign_negative() || self.filled_amount > self.amount {
            return Err(VeilError::InvalidOrder {
                reason: format!(
                    "Filled amount {} outside [0, {}]",
                    self.filled_amount, self.amount
                ),
            });
        }
        if self.amount.normalize().scale() > constants::QTY_PRECISION {
            return Err(VeilError::InvalidOrder {
                reason: format!(
                    "Amount {} exceeds {} decimal places",
                    self.amount,
                    constants::QTY_PRECISION
                ),
            });
        }
        if self.price.normalize().scale() > constants::PRICE_PRECISION {
            return Err(VeilError::InvalidOrder {
                reason: format!(
                    "Price {} exceeds {} decimal places",
                    self.price,
                    constants::PRICE_PRECISION
                ),
            });
        }
        // Every fill of this order is bounded by amount x price, so a full
        // fill that converts cleanly means any partial fill does too.
        to_base_units(self.amount)?;
        to_base_units(quote_amount(self.amount, self.price)?)?;
        Ok(())
    }

    /// Base quantity still to be matched.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled_amount
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining() <= Decimal::ZERO
    }

    /// Whether a resting order at `other_price` on the opposite side crosses
    /// this order (`buy.price >= sell.price`).
    #[must_use]
    pub fn crosses(&self, other_price: Decimal) -> bool {
        match self.side {
            OrderSide::Buy => self.price >= other_price,
            OrderSide::Sell => self.price <= other_price,
        }
    }

    #[must_use]
    pub fn fill_ratio(&self) -> Decimal {
        if self.amount.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_amount / self.amount
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// The secp256k1 generator point, compressed. A valid spending key
    /// (secret scalar 1) for tests that need a real curve point.
    pub const TEST_SPENDING_KEY: [u8; 33] = [
        0x02, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62, 0x95, 0xce, 0x87,
        0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2, 0x81, 0x5b, 0x16,
        0xf8, 0x17, 0x98,
    ];

    pub fn dummy_limit(side: OrderSide, price: Decimal, amount: Decimal) -> Self {
        Self::dummy_limit_for_owner(Address::repeat_byte(0xaa), side, price, amount)
    }

    pub fn dummy_limit_for_owner(
        owner: Address,
        side: OrderSide,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            pair_id: PairId::new("RWA-USDC"),
            side,
            amount,
            filled_amount: Decimal::ZERO,
            price,
            owner,
            stealth_meta: Some(crate::PublicKeyBytes(Self::TEST_SPENDING_KEY)),
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}
