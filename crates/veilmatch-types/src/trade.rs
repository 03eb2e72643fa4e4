//! Trade types produced by the matching engine.
//!
//! A [`TradeMatch`] lives only inside one matching iteration. What outlives
//! it is the [`PendingSettlement`] committed together with the fill: it
//! carries everything needed to (re)submit the Settle report with the same
//! deterministic settlement id.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EphemeralPublicKey, OrderId, PairId, SettlementId};

/// One pairing of a buy and a sell inside a matching iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMatch {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    /// Base quantity exchanged.
    pub trade_amount: Decimal,
    /// Execution price (the resting order's limit price).
    pub trade_price: Decimal,
}

impl std::fmt::Display for TradeMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Match[buy={} sell={}] {} @ {}",
            self.buy_order_id, self.sell_order_id, self.trade_amount, self.trade_price,
        )
    }
}

/// A one-time payout destination for one leg of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthLeg {
    pub stealth_address: Address,
    /// `R = r·G`, published so the recipient can recover the stealth key.
    pub ephemeral_public_key: EphemeralPublicKey,
    /// First byte of the hashed shared secret; lets recipients skip most
    /// announcements without a full point multiplication.
    pub view_tag: u8,
}

/// The both-legs delta applied atomically by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillUpdate {
    pub trade: TradeMatch,
    /// Recorded in the same commit as the fill, so a crash between fill and
    /// submission still leaves a resubmittable record.
    pub settlement: PendingSettlement,
}

/// Settlement progress of a committed fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Fill committed; the report has not been confirmed on-chain yet.
    Pending,
    /// The authority applied the report (or rejected it as already settled).
    Confirmed,
    /// Custody could not cover the report. Not retried until an operator
    /// intervenes.
    Halted,
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Halted => write!(f, "HALTED"),
        }
    }
}

/// A committed fill awaiting (or having completed) on-chain settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSettlement {
    pub settlement_id: SettlementId,
    pub pair_id: PairId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    /// Persistent identity of the buyer. Used for the compliance re-check only.
    pub buyer: Address,
    /// Persistent identity of the seller. Used for the compliance re-check only.
    pub seller: Address,
    pub trade_nonce: u64,
    pub trade_amount: Decimal,
    pub trade_price: Decimal,
    pub quote_amount: Decimal,
    pub stealth_buyer: StealthLeg,
    pub stealth_seller: StealthLeg,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl PendingSettlement {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == SettlementStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PublicKeyBytes;

    fn leg(byte: u8) -> StealthLeg {
        let mut key = [byte; 33];
        key[0] = 0x03;
        StealthLeg {
            stealth_address: Address::repeat_byte(byte),
            ephemeral_public_key: PublicKeyBytes(key),
            view_tag: byte,
        }
    }

    #[test]
    fn trade_match_display() {
        let m = TradeMatch {
            buy_order_id: OrderId::from_bytes([1; 16]),
            sell_order_id: OrderId::from_bytes([2; 16]),
            trade_amount: Decimal::new(60, 0),
            trade_price: Decimal::new(10, 0),
        };
        let s = m.to_string();
        assert!(s.contains("60 @ 10"));
    }

    #[test]
    fn pending_settlement_serde_roundtrip() {
        let buy = OrderId::from_bytes([1; 16]);
        let sell = OrderId::from_bytes([2; 16]);
        let pending = PendingSettlement {
            settlement_id: SettlementId::derive(buy, sell, 0),
            pair_id: PairId::new("RWA-USDC"),
            buy_order_id: buy,
            sell_order_id: sell,
            buyer: Address::repeat_byte(0xb0),
            seller: Address::repeat_byte(0x5e),
            trade_nonce: 0,
            trade_amount: Decimal::new(60, 0),
            trade_price: Decimal::new(10, 0),
            quote_amount: Decimal::new(600, 0),
            stealth_buyer: leg(0x11),
            stealth_seller: leg(0x22),
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&pending).unwrap();
        let back: PendingSettlement = serde_json::from_str(&json).unwrap();
        assert_eq!(pending, back);
        assert!(!back.is_confirmed());
    }
}
