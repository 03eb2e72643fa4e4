//! The order-store seam.
//!
//! The matching engine never touches order rows directly; it reads and
//! writes through [`OrderStore`]. A production deployment backs this with
//! a database using row locks or serializable transactions; tests and
//! single-process setups use [`crate::InMemoryOrderStore`].

use rust_decimal::Decimal;
use veilmatch_types::{
    FillUpdate, Order, OrderId, OrderSide, PairId, PendingSettlement, Result, SettlementId,
    SpendingPublicKey,
};

pub trait OrderStore: Send + Sync {
    /// Persist a new order. OPEN orders become matchable immediately.
    fn insert_order(&self, order: Order) -> Result<()>;

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>>;

    /// Best OPEN order on `side` of `pair_id` crossing `price_bound`,
    /// ordered by (price, created_at).
    fn find_best_crossing_order(
        &self,
        pair_id: &PairId,
        side: OrderSide,
        price_bound: Decimal,
    ) -> Result<Option<Order>>;

    /// Apply both legs of a fill and record its pending settlement, or
    /// change nothing.
    fn update_fill_atomic(&self, update: &FillUpdate) -> Result<()>;

    /// Attach a stealth destination to a PENDING order, making it OPEN.
    fn attach_stealth(&self, order_id: &OrderId, key: SpendingPublicKey) -> Result<Order>;

    /// Move a PENDING or OPEN order to CANCELLED and pull it from the book.
    fn cancel_order(&self, order_id: &OrderId) -> Result<Order>;

    /// Strictly increasing across calls.
    fn next_trade_nonce(&self) -> Result<u64>;

    /// Committed fills still awaiting settlement, oldest first. Confirmed
    /// and halted records are excluded.
    fn pending_settlements(&self) -> Result<Vec<PendingSettlement>>;

    fn get_settlement(&self, settlement_id: &SettlementId) -> Result<Option<PendingSettlement>>;

    /// Idempotent.
    fn mark_settlement_confirmed(&self, settlement_id: &SettlementId) -> Result<()>;

    /// Stop resubmitting a pending settlement. A confirmed record stays
    /// confirmed.
    fn mark_settlement_halted(&self, settlement_id: &SettlementId) -> Result<()>;
}
