//! Price-time index of the resting OPEN orders of one pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! The book holds positions only. Order rows (amounts, status) live in the
//! store; an auxiliary `HashMap<OrderId, (Side, Price)>` gives O(log N)
//! removal.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use veilmatch_types::{Order, OrderId, OrderSide, PairId, Result, VeilError};

use crate::price_level::{BookEntry, PriceLevel};

#[derive(Debug)]
pub struct OrderBook {
    pub pair: PairId,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    #[must_use]
    pub fn new(pair: PairId) -> Self {
        Self {
            pair,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Add an order at its limit price.
    pub fn insert(&mut self, order: &Order) -> Result<()> {
        if self.index.contains_key(&order.id) {
            return Err(VeilError::DuplicateOrder(order.id));
        }
        self.index.insert(order.id, (order.side, order.price));
        let entry = BookEntry::from(order);
        match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(order.price))
                .or_insert_with(|| PriceLevel::new(order.price))
                .insert(entry),
            OrderSide::Sell => self
                .asks
                .entry(order.price)
                .or_insert_with(|| PriceLevel::new(order.price))
                .insert(entry),
        }
        Ok(())
    }

    /// Remove an order, dropping its level if it empties.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<()> {
        let (side, price) = self
            .index
            .remove(order_id)
            .ok_or(VeilError::OrderNotFound(*order_id))?;
        let removed = match side {
            OrderSide::Buy => remove_from(&mut self.bids, &Reverse(price), order_id),
            OrderSide::Sell => remove_from(&mut self.asks, &price, order_id),
        };
        if removed {
            Ok(())
        } else {
            Err(VeilError::Internal(format!(
                "book index out of sync for order {order_id}"
            )))
        }
    }

    /// Best resting order on `side` that crosses `price_bound`.
    ///
    /// For asks that means the lowest price `<= price_bound`; for bids the
    /// highest price `>= price_bound`. Within a level the earliest created
    /// order wins.
    #[must_use]
    pub fn best_crossing(&self, side: OrderSide, price_bound: Decimal) -> Option<OrderId> {
        let level = match side {
            OrderSide::Sell => self
                .asks
                .values()
                .next()
                .filter(|level| level.price <= price_bound),
            OrderSide::Buy => self
                .bids
                .values()
                .next()
                .filter(|level| level.price >= price_bound),
        }?;
        level.front().map(|e| e.order_id)
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn remove_from<K: Ord>(
    levels: &mut BTreeMap<K, PriceLevel>,
    key: &K,
    order_id: &OrderId,
) -> bool {
    let Some(level) = levels.get_mut(key) else {
        return false;
    };
    let removed = level.remove(order_id);
    if level.is_empty() {
        levels.remove(key);
    }
    removed
}
