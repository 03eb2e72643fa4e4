//! Price-time priority matching engine.
//!
//! ```text
//! match_order(order_id) -> MatchReport
//! ```
//!
//! One call is a sequential loop for one triggering order, run under the
//! pair lock. Each iteration pairs the order with the best crossing
//! opposite-side order, derives both stealth legs, and commits the fill
//! together with its pending settlement through
//! [`OrderStore::update_fill_atomic`]. Fills execute at the resting
//! order's price.
//!
//! The loop runs until the order is filled or nothing crosses, so the book
//! is never left crossed by a completed run. If either leg has no stealth
//! destination, or the fill cannot be priced, the loop stops without
//! touching that pair of orders and reports the reason in
//! [`MatchReport::aborted`]. Fills committed by earlier iterations stand.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use veilmatch_stealth::{derive_trade_legs, validate_spending_key};
use veilmatch_types::{
    Address, EngineConfig, FillUpdate, NewOrder, Order, OrderId, OrderSide, OrderStatus,
    PendingSettlement, Result, SettlementId, SettlementStatus, SpendingPublicKey, TradeMatch,
    VeilError, quote_amount,
};

use crate::locks::PairLocks;
use crate::store::OrderStore;

/// Outcome of one matching run.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub order_id: OrderId,
    /// Fills committed by this run, in execution order.
    pub fills: Vec<PendingSettlement>,
    /// Set when the loop stopped on an operational error. Non-fatal: the
    /// order stays OPEN and can be matched again later.
    pub aborted: Option<VeilError>,
}

impl MatchReport {
    fn empty(order_id: OrderId) -> Self {
        Self {
            order_id,
            fills: Vec::new(),
            aborted: None,
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// A freshly submitted order and whatever it matched immediately.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub order: Order,
    pub report: MatchReport,
}

enum FillOutcome {
    Committed(PendingSettlement),
    Aborted(VeilError),
}

pub struct MatchingEngine<S> {
    store: Arc<S>,
    locks: PairLocks,
    config: EngineConfig,
}

impl<S: OrderStore> MatchingEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            locks: PairLocks::new(),
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and persist a new order, then match it if it is OPEN.
    pub fn submit(&self, new: NewOrder) -> Result<Submitted> {
        if self.config.pair(&new.pair_id).is_none() {
            return Err(VeilError::UnknownPair(new.pair_id));
        }
        if let Some(key) = &new.stealth_meta {
            validate_spending_key(key)?;
        }
        let order = Order::from_new(new, Utc::now());
        order.validate()?;
        self.store.insert_order(order.clone())?;
        info!(
            order_id = %order.id,
            pair = %order.pair_id,
            side = %order.side,
            amount = %order.amount,
            price = %order.price,
            status = %order.status,
            "Order accepted"
        );

        let report = if order.status == OrderStatus::Open {
            self.match_order(order.id)?
        } else {
            MatchReport::empty(order.id)
        };
        let order = self.store.get_order(&order.id)?.unwrap_or(order);
        Ok(Submitted { order, report })
    }

    /// Attach the owner's spending key to a PENDING order and match it.
    pub fn attach_stealth(
        &self,
        order_id: OrderId,
        caller: Address,
        key: SpendingPublicKey,
    ) -> Result<MatchReport> {
        validate_spending_key(&key)?;
        let order = self.owned_order(order_id, caller)?;
        {
            let lock = self.locks.handle(&order.pair_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| VeilError::Internal("pair lock poisoned".to_string()))?;
            self.store.attach_stealth(&order_id, key)?;
        }
        debug!(order_id = %order_id, "Stealth destination attached");
        self.match_order(order_id)
    }

    /// Cancel an order. Only its owner may, and only while PENDING or OPEN.
    pub fn cancel(&self, order_id: OrderId, caller: Address) -> Result<Order> {
        let order = self.owned_order(order_id, caller)?;
        let lock = self.locks.handle(&order.pair_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| VeilError::Internal("pair lock poisoned".to_string()))?;
        let cancelled = self.store.cancel_order(&order_id)?;
        info!(order_id = %order_id, filled = %cancelled.filled_amount, "Order cancelled");
        Ok(cancelled)
    }

    /// Match `order_id` against the book until it is filled, nothing
    /// crosses, or a leg cannot be paid. A missing or non-OPEN order is a
    /// no-op.
    pub fn match_order(&self, order_id: OrderId) -> Result<MatchReport> {
        let mut report = MatchReport::empty(order_id);
        let Some(order) = self.store.get_order(&order_id)? else {
            return Ok(report);
        };
        if order.status != OrderStatus::Open {
            return Ok(report);
        }

        let lock = self.locks.handle(&order.pair_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| VeilError::Internal("pair lock poisoned".to_string()))?;

        loop {
            // Re-read under the lock: a previous iteration or a concurrent
            // cancel may have changed the row.
            let Some(order) = self.store.get_order(&order_id)? else {
                break;
            };
            if order.status != OrderStatus::Open || order.is_filled() {
                break;
            }
            let Some(candidate) = self.store.find_best_crossing_order(
                &order.pair_id,
                order.side.opposite(),
                order.price,
            )?
            else {
                break;
            };

            match self.fill(&order, &candidate)? {
                FillOutcome::Committed(settlement) => report.fills.push(settlement),
                FillOutcome::Aborted(reason) => {
                    warn!(
                        order_id = %order_id,
                        candidate = %candidate.id,
                        error = %reason,
                        "Match aborted"
                    );
                    report.aborted = Some(reason);
                    break;
                }
            }
        }

        if !report.fills.is_empty() {
            info!(order_id = %order_id, fills = report.fills.len(), "Matching complete");
        }
        Ok(report)
    }

    fn fill(&self, order: &Order, candidate: &Order) -> Result<FillOutcome> {
        let (buy, sell) = match order.side {
            OrderSide::Buy => (order, candidate),
            OrderSide::Sell => (candidate, order),
        };
        let Some(buyer_key) = buy.stealth_meta else {
            return Ok(FillOutcome::Aborted(VeilError::MissingStealthDestination(
                buy.id,
            )));
        };
        let Some(seller_key) = sell.stealth_meta else {
            return Ok(FillOutcome::Aborted(VeilError::MissingStealthDestination(
                sell.id,
            )));
        };

        let trade_amount = order.remaining().min(candidate.remaining());
        let trade_price = candidate.price;
        let quote = match quote_amount(trade_amount, trade_price) {
            Ok(quote) => quote,
            Err(e) => return Ok(FillOutcome::Aborted(e)),
        };
        let trade_nonce = self.store.next_trade_nonce()?;

        let (stealth_buyer, stealth_seller) =
            match derive_trade_legs(buy.id, sell.id, trade_nonce, &buyer_key, &seller_key) {
                Ok(legs) => legs,
                Err(e) => return Ok(FillOutcome::Aborted(e)),
            };

        let settlement = PendingSettlement {
            settlement_id: SettlementId::derive(buy.id, sell.id, trade_nonce),
            pair_id: order.pair_id.clone(),
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            buyer: buy.owner,
            seller: sell.owner,
            trade_nonce,
            trade_amount,
            trade_price,
            quote_amount: quote,
            stealth_buyer,
            stealth_seller,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
        };
        let update = FillUpdate {
            trade: TradeMatch {
                buy_order_id: buy.id,
                sell_order_id: sell.id,
                trade_amount,
                trade_price,
            },
            settlement,
        };
        self.store.update_fill_atomic(&update)?;
        info!(
            settlement = %update.settlement.settlement_id,
            nonce = trade_nonce,
            "{}",
            update.trade
        );
        Ok(FillOutcome::Committed(update.settlement))
    }

    fn owned_order(&self, order_id: OrderId, caller: Address) -> Result<Order> {
        let order = self
            .store
            .get_order(&order_id)?
            .ok_or(VeilError::OrderNotFound(order_id))?;
        if order.owner != caller {
            return Err(VeilError::NotOrderOwner { order_id, caller });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use veilmatch_types::{PairConfig, PairId, PublicKeyBytes};

    use super::*;
    use crate::InMemoryOrderStore;

    fn pair() -> PairId {
        PairId::new("RWA-USDC")
    }

    fn engine() -> MatchingEngine<InMemoryOrderStore> {
        let config = EngineConfig {
            pairs: vec![PairConfig {
                pair_id: pair(),
                base_token: Address::repeat_byte(0xaa),
                quote_token: Address::repeat_byte(0xbb),
            }],
        };
        MatchingEngine::new(Arc::new(InMemoryOrderStore::new()), config)
    }

    fn key() -> SpendingPublicKey {
        PublicKeyBytes(Order::TEST_SPENDING_KEY)
    }

    fn new_order(owner: u8, side: OrderSide, amount: i64, price: i64) -> NewOrder {
        NewOrder {
            pair_id: pair(),
            side,
            amount: Decimal::new(amount, 0),
            price: Decimal::new(price, 0),
            owner: Address::repeat_byte(owner),
            stealth_meta: Some(key()),
        }
    }

    fn order(engine: &MatchingEngine<InMemoryOrderStore>, id: OrderId) -> Order {
        engine.store().get_order(&id).unwrap().unwrap()
    }

    #[test]
    fn partial_fill_scenario() {
        let engine = engine();
        let sell = engine.submit(new_order(1, OrderSide::Sell, 100, 10)).unwrap();
        assert!(sell.report.fills.is_empty());

        let buy = engine.submit(new_order(2, OrderSide::Buy, 60, 12)).unwrap();
        assert_eq!(buy.report.fills.len(), 1);
        let fill = &buy.report.fills[0];
        assert_eq!(fill.trade_amount, Decimal::new(60, 0));
        assert_eq!(fill.trade_price, Decimal::new(10, 0));
        assert_eq!(fill.quote_amount, Decimal::new(600, 0));

        let sell = order(&engine, sell.order.id);
        assert_eq!(sell.status, OrderStatus::Open);
        assert_eq!(sell.remaining(), Decimal::new(40, 0));
        assert_eq!(buy.order.status, OrderStatus::Settled);
    }

    #[test]
    fn earlier_order_at_equal_price_matches_first() {
        let engine = engine();
        let first = engine.submit(new_order(1, OrderSide::Sell, 5, 10)).unwrap();
        let second = engine.submit(new_order(3, OrderSide::Sell, 5, 10)).unwrap();
        let buy = engine.submit(new_order(2, OrderSide::Buy, 5, 10)).unwrap();
        assert_eq!(buy.report.fills.len(), 1);
        assert_eq!(buy.report.fills[0].sell_order_id, first.order.id);
        assert_eq!(order(&engine, second.order.id).filled_amount, Decimal::ZERO);
    }

    #[test]
    fn better_price_matches_before_earlier_time() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Sell, 1, 11)).unwrap();
        let cheaper = engine.submit(new_order(3, OrderSide::Sell, 1, 10)).unwrap();
        let buy = engine.submit(new_order(2, OrderSide::Buy, 1, 12)).unwrap();
        assert_eq!(buy.report.fills[0].sell_order_id, cheaper.order.id);
        assert_eq!(buy.report.fills[0].trade_price, Decimal::new(10, 0));
    }

    #[test]
    fn walks_multiple_levels() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Sell, 100, 10)).unwrap();
        engine.submit(new_order(3, OrderSide::Sell, 100, 11)).unwrap();
        let buy = engine.submit(new_order(2, OrderSide::Buy, 150, 12)).unwrap();
        let amounts: Vec<_> = buy.report.fills.iter().map(|f| f.trade_amount).collect();
        assert_eq!(amounts, vec![Decimal::new(100, 0), Decimal::new(50, 0)]);
        assert_eq!(buy.order.status, OrderStatus::Settled);
        assert_eq!(engine.store().resting_count(&pair()).unwrap(), 1);
    }

    #[test]
    fn sell_taker_hits_highest_bid() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Buy, 1, 9)).unwrap();
        let best = engine.submit(new_order(3, OrderSide::Buy, 1, 11)).unwrap();
        let sell = engine.submit(new_order(2, OrderSide::Sell, 1, 10)).unwrap();
        assert_eq!(sell.report.fills[0].buy_order_id, best.order.id);
        assert_eq!(sell.report.fills[0].trade_price, Decimal::new(11, 0));
    }

    #[test]
    fn no_cross_no_fill() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Sell, 1, 13)).unwrap();
        let buy = engine.submit(new_order(2, OrderSide::Buy, 1, 12)).unwrap();
        assert!(buy.report.fills.is_empty());
        assert_eq!(buy.order.status, OrderStatus::Open);
    }

    #[test]
    fn missing_stealth_destination_aborts_without_mutation() {
        let engine = engine();
        let mut resting =
            Order::dummy_limit(OrderSide::Sell, Decimal::new(10, 0), Decimal::new(100, 0));
        resting.stealth_meta = None;
        engine.store().insert_order(resting.clone()).unwrap();

        let buy = engine.submit(new_order(2, OrderSide::Buy, 60, 12)).unwrap();
        assert!(buy.report.fills.is_empty());
        assert_eq!(
            buy.report.aborted,
            Some(VeilError::MissingStealthDestination(resting.id))
        );
        assert_eq!(order(&engine, resting.id).filled_amount, Decimal::ZERO);
        assert_eq!(buy.order.filled_amount, Decimal::ZERO);
        assert_eq!(buy.order.status, OrderStatus::Open);
        assert!(engine.store().pending_settlements().unwrap().is_empty());
    }

    #[test]
    fn pending_order_matches_once_stealth_attached() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Sell, 10, 10)).unwrap();
        let mut pending = new_order(2, OrderSide::Buy, 10, 10);
        pending.stealth_meta = None;
        let submitted = engine.submit(pending).unwrap();
        assert_eq!(submitted.order.status, OrderStatus::Pending);
        assert!(submitted.report.fills.is_empty());

        let err = engine
            .attach_stealth(submitted.order.id, Address::repeat_byte(9), key())
            .unwrap_err();
        assert!(matches!(err, VeilError::NotOrderOwner { .. }));

        let report = engine
            .attach_stealth(submitted.order.id, Address::repeat_byte(2), key())
            .unwrap();
        assert_eq!(report.fills.len(), 1);
    }

    #[test]
    fn cancel_rules() {
        let engine = engine();
        let sell = engine.submit(new_order(1, OrderSide::Sell, 10, 10)).unwrap();
        let id = sell.order.id;
        assert!(matches!(
            engine.cancel(id, Address::repeat_byte(2)),
            Err(VeilError::NotOrderOwner { .. })
        ));
        let cancelled = engine.cancel(id, Address::repeat_byte(1)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(matches!(
            engine.cancel(id, Address::repeat_byte(1)),
            Err(VeilError::OrderNotCancellable { .. })
        ));
        // A cancelled order no longer matches.
        let buy = engine.submit(new_order(2, OrderSide::Buy, 10, 10)).unwrap();
        assert!(buy.report.fills.is_empty());
    }

    #[test]
    fn rejects_unknown_pair_and_bad_orders() {
        let engine = engine();
        let mut bad_pair = new_order(1, OrderSide::Buy, 1, 1);
        bad_pair.pair_id = PairId::new("DOGE-USDC");
        assert!(matches!(
            engine.submit(bad_pair),
            Err(VeilError::UnknownPair(_))
        ));
        assert!(matches!(
            engine.submit(new_order(1, OrderSide::Buy, 0, 1)),
            Err(VeilError::InvalidOrder { .. })
        ));
        let mut bad_key = new_order(1, OrderSide::Buy, 1, 1);
        let mut off_curve = [0xff; 33];
        off_curve[0] = 0x02;
        bad_key.stealth_meta = Some(PublicKeyBytes(off_curve));
        assert!(matches!(
            engine.submit(bad_key),
            Err(VeilError::InvalidPublicKey { .. })
        ));
    }

    #[test]
    fn settlement_outputs_are_reproducible() {
        let engine = engine();
        engine.submit(new_order(1, OrderSide::Sell, 5, 10)).unwrap();
        let buy = engine.submit(new_order(2, OrderSide::Buy, 5, 10)).unwrap();
        let fill = &buy.report.fills[0];
        assert_eq!(
            fill.settlement_id,
            SettlementId::derive(fill.buy_order_id, fill.sell_order_id, fill.trade_nonce)
        );
        let (b, s) = derive_trade_legs(
            fill.buy_order_id,
            fill.sell_order_id,
            fill.trade_nonce,
            &key(),
            &key(),
        )
        .unwrap();
        assert_eq!(fill.stealth_buyer, b);
        assert_eq!(fill.stealth_seller, s);
        assert_eq!(fill.buyer, Address::repeat_byte(2));
        assert_eq!(fill.seller, Address::repeat_byte(1));
    }

    #[test]
    fn taker_sweeps_every_crossing_order() {
        let engine = engine();
        for i in 0..1_100u16 {
            let owner = u8::try_from(i % 200).unwrap() + 20;
            engine.submit(new_order(owner, OrderSide::Sell, 1, 10)).unwrap();
        }
        let buy = engine.submit(new_order(2, OrderSide::Buy, 1_100, 10)).unwrap();
        assert_eq!(buy.report.fills.len(), 1_100);
        assert!(!buy.report.is_aborted());
        assert_eq!(buy.order.status, OrderStatus::Settled);
        assert_eq!(engine.store().resting_count(&pair()).unwrap(), 0);
    }

    #[test]
    fn unpriceable_order_is_rejected_before_booking() {
        let engine = engine();
        let huge = 1_000_000_000_000_000;
        engine.submit(new_order(1, OrderSide::Sell, huge, 1)).unwrap();
        let err = engine
            .submit(new_order(2, OrderSide::Buy, huge, huge))
            .unwrap_err();
        assert!(matches!(err, VeilError::InvalidAmount { .. }));
        assert!(
            engine
                .store()
                .find_best_crossing_order(&pair(), OrderSide::Buy, Decimal::ONE)
                .unwrap()
                .is_none()
        );
        assert_eq!(engine.store().resting_count(&pair()).unwrap(), 1);
    }

    #[test]
    fn fill_that_overflows_aborts_instead_of_failing() {
        let engine = engine();
        let huge = Decimal::new(1_000_000_000_000_000, 0);
        // Inserted straight into the store, skipping submit-time validation.
        let resting = Order::dummy_limit(OrderSide::Sell, huge, huge);
        engine.store().insert_order(resting.clone()).unwrap();
        let taker =
            Order::dummy_limit_for_owner(Address::repeat_byte(2), OrderSide::Buy, huge, huge);
        engine.store().insert_order(taker.clone()).unwrap();

        let report = engine.match_order(taker.id).unwrap();
        assert!(report.fills.is_empty());
        assert!(matches!(report.aborted, Some(VeilError::InvalidAmount { .. })));
        assert_eq!(order(&engine, resting.id).filled_amount, Decimal::ZERO);
    }

    #[test]
    fn concurrent_takers_never_overfill() {
        let engine = engine();
        let sell = engine.submit(new_order(1, OrderSide::Sell, 50, 10)).unwrap();
        std::thread::scope(|scope| {
            for i in 0..8u8 {
                let engine = &engine;
                scope.spawn(move || {
                    engine
                        .submit(new_order(10 + i, OrderSide::Buy, 10, 10))
                        .unwrap();
                });
            }
        });
        let sell = order(&engine, sell.order.id);
        assert_eq!(sell.filled_amount, Decimal::new(50, 0));
        assert_eq!(sell.status, OrderStatus::Settled);
        let settled: Decimal = engine
            .store()
            .pending_settlements()
            .unwrap()
            .iter()
            .map(|s| s.trade_amount)
            .sum();
        assert_eq!(settled, Decimal::new(50, 0));
    }
}
