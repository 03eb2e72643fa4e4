//! A single price level in the order book.
//!
//! Entries at the same price are kept sorted by order creation time, so
//! the front of the level always has time priority. An order that becomes
//! matchable late (stealth destination attached after submission) still
//! queues by when it was created.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use veilmatch_types::{Order, OrderId};

/// A resting order's position in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for BookEntry {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            created_at: order.created_at,
        }
    }
}

/// All resting orders at one price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Front = earliest created = highest priority.
    pub entries: VecDeque<BookEntry>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            entries: VecDeque::new(),
        }
    }

    /// Insert in creation-time order. Equal timestamps keep arrival order.
    pub fn insert(&mut self, entry: BookEntry) {
        let pos = self
            .entries
            .partition_point(|e| e.created_at <= entry.created_at);
        self.entries.insert(pos, entry);
    }

    #[must_use]
    pub fn front(&self) -> Option<&BookEntry> {
        self.entries.front()
    }

    /// Remove a specific order. Returns `false` if it was not here.
    pub fn remove(&mut self, order_id: &OrderId) -> bool {
        match self.entries.iter().position(|e| e.order_id == *order_id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
