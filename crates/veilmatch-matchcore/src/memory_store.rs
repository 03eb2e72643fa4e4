//! In-memory [`OrderStore`] backed by one mutex over all rows.
//!
//! Every trait method runs under the same lock, so `update_fill_atomic`
//! validates both legs and then applies them with no interleaving.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;
use veilmatch_types::{
    FillUpdate, Order, OrderId, OrderSide, OrderStatus, PairId, PendingSettlement, Result,
    SettlementId, SettlementStatus, SpendingPublicKey, VeilError,
};

use crate::orderbook::OrderBook;
use crate::store::OrderStore;

#[derive(Debug, Default)]
struct Inner {
    orders: HashMap<OrderId, Order>,
    books: HashMap<PairId, OrderBook>,
    /// Commit order is preserved so resubmission runs oldest first.
    settlements: Vec<PendingSettlement>,
    settlement_index: HashMap<SettlementId, usize>,
    next_nonce: u64,
}

impl Inner {
    fn book_mut(&mut self, pair_id: &PairId) -> &mut OrderBook {
        self.books
            .entry(pair_id.clone())
            .or_insert_with(|| OrderBook::new(pair_id.clone()))
    }

    fn check_leg(&self, order_id: &OrderId, side: OrderSide, update: &FillUpdate) -> Result<()> {
        let order = self
            .orders
            .get(order_id)
            .ok_or(VeilError::OrderNotFound(*order_id))?;
        let reject = |reason: String| Err(VeilError::MatchingFailed { reason });
        if order.side != side {
            return reject(format!("order {order_id} is not a {side} order"));
        }
        if order.pair_id != update.settlement.pair_id {
            return reject(format!("order {order_id} is not on {}", update.settlement.pair_id));
        }
        if order.status != OrderStatus::Open {
            return reject(format!("order {order_id} is {}", order.status));
        }
        if update.trade.trade_amount > order.remaining() {
            return reject(format!(
                "fill {} exceeds remaining {} of {order_id}",
                update.trade.trade_amount,
                order.remaining()
            ));
        }
        Ok(())
    }

    fn apply_leg(&mut self, order_id: &OrderId, amount: Decimal) -> Result<()> {
        let now = Utc::now();
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or(VeilError::OrderNotFound(*order_id))?;
        order.filled_amount += amount;
        order.updated_at = now;
        if order.is_filled() {
            order.status = OrderStatus::Settled;
            let pair_id = order.pair_id.clone();
            self.book_mut(&pair_id).remove(order_id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: Mutex<Inner>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| VeilError::Internal("order store lock poisoned".to_string()))
    }

    /// Number of matchable orders resting on `pair_id`.
    pub fn resting_count(&self, pair_id: &PairId) -> Result<usize> {
        Ok(self
            .lock()?
            .books
            .get(pair_id)
            .map_or(0, OrderBook::order_count))
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert_order(&self, order: Order) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.orders.contains_key(&order.id) {
            return Err(VeilError::DuplicateOrder(order.id));
        }
        if order.status == OrderStatus::Open && !order.is_filled() {
            inner.book_mut(&order.pair_id).insert(&order)?;
        }
        inner.orders.insert(order.id, order);
        Ok(())
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self.lock()?.orders.get(order_id).cloned())
    }

    fn find_best_crossing_order(
        &self,
        pair_id: &PairId,
        side: OrderSide,
        price_bound: Decimal,
    ) -> Result<Option<Order>> {
        let inner = self.lock()?;
        let best = inner
            .books
            .get(pair_id)
            .and_then(|book| book.best_crossing(side, price_bound));
        Ok(best.and_then(|id| inner.orders.get(&id).cloned()))
    }

    fn update_fill_atomic(&self, update: &FillUpdate) -> Result<()> {
        let mut inner = self.lock()?;
        let trade = &update.trade;
        if trade.trade_amount <= Decimal::ZERO {
            return Err(VeilError::MatchingFailed {
                reason: format!("non-positive fill {}", trade.trade_amount),
            });
        }
        let settlement_id = update.settlement.settlement_id;
        if inner.settlement_index.contains_key(&settlement_id) {
            return Err(VeilError::MatchingFailed {
                reason: format!("settlement {settlement_id} already recorded"),
            });
        }
        inner.check_leg(&trade.buy_order_id, OrderSide::Buy, update)?;
        inner.check_leg(&trade.sell_order_id, OrderSide::Sell, update)?;

        // Both legs validated; nothing below can fail on well-formed state.
        inner.apply_leg(&trade.buy_order_id, trade.trade_amount)?;
        inner.apply_leg(&trade.sell_order_id, trade.trade_amount)?;
        let position = inner.settlements.len();
        inner.settlements.push(update.settlement.clone());
        inner.settlement_index.insert(settlement_id, position);
        debug!(settlement = %settlement_id, "Fill committed");
        Ok(())
    }

    fn attach_stealth(&self, order_id: &OrderId, key: SpendingPublicKey) -> Result<Order> {
        let mut inner = self.lock()?;
        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or(VeilError::OrderNotFound(*order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(VeilError::InvalidOrder {
                reason: format!("order {order_id} is {}, not PENDING", order.status),
            });
        }
        order.stealth_meta = Some(key);
        order.status = OrderStatus::Open;
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        inner.book_mut(&snapshot.pair_id).insert(&snapshot)?;
        Ok(snapshot)
    }

    fn cancel_order(&self, order_id: &OrderId) -> Result<Order> {
        let mut inner = self.lock()?;
        let order = inner
            .orders
            .get_mut(order_id)
            .ok_or(VeilError::OrderNotFound(*order_id))?;
        if !order.status.is_cancellable() {
            return Err(VeilError::OrderNotCancellable {
                status: order.status,
            });
        }
        let was_open = order.status == OrderStatus::Open;
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        if was_open {
            inner.book_mut(&snapshot.pair_id).remove(order_id)?;
        }
        Ok(snapshot)
    }

    fn next_trade_nonce(&self) -> Result<u64> {
        let mut inner = self.lock()?;
        let nonce = inner.next_nonce;
        inner.next_nonce = nonce
            .checked_add(1)
            .ok_or_else(|| VeilError::Internal("trade nonce exhausted".to_string()))?;
        Ok(nonce)
    }

    fn pending_settlements(&self) -> Result<Vec<PendingSettlement>> {
        Ok(self
            .lock()?
            .settlements
            .iter()
            .filter(|s| s.status == SettlementStatus::Pending)
            .cloned()
            .collect())
    }

    fn get_settlement(&self, settlement_id: &SettlementId) -> Result<Option<PendingSettlement>> {
        let inner = self.lock()?;
        Ok(inner
            .settlement_index
            .get(settlement_id)
            .and_then(|&i| inner.settlements.get(i))
            .cloned())
    }

    fn mark_settlement_confirmed(&self, settlement_id: &SettlementId) -> Result<()> {
        let mut inner = self.lock()?;
        let position = *inner.settlement_index.get(settlement_id).ok_or_else(|| {
            VeilError::Internal(format!("unknown settlement {settlement_id}"))
        })?;
        if let Some(record) = inner.settlements.get_mut(position) {
            record.status = SettlementStatus::Confirmed;
        }
        Ok(())
    }

    fn mark_settlement_halted(&self, settlement_id: &SettlementId) -> Result<()> {
        let mut inner = self.lock()?;
        let position = *inner.settlement_index.get(settlement_id).ok_or_else(|| {
            VeilError::Internal(format!("unknown settlement {settlement_id}"))
        })?;
        if let Some(record) = inner
            .settlements
            .get_mut(position)
            .filter(|r| r.status == SettlementStatus::Pending)
        {
            record.status = SettlementStatus::Halted;
        }
        Ok(())
    }
}
