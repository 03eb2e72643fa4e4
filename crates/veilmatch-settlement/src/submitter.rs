//! Settlement submission.
//!
//! ```text
//! submit(request)
//!   ├─ compliance re-check (buyer, seller)      NotVerified → nothing sent
//!   ├─ encode Settle{order_id = settlement_id}
//!   ├─ relay under RetryPolicy
//!   │    Ok                 → Settled
//!   │    AlreadySettled     → AlreadySettled (success)
//!   │    balance errors     → mark record halted, alert, return error
//!   │    UnauthorizedSender → fatal, return error
//!   ├─ announce both legs
//!   └─ mark store record confirmed
//! ```
//!
//! Nothing here rolls back a committed fill. A failed submission leaves
//! the record pending for [`SettlementSubmitter::resubmit_pending`], except
//! a balance failure, which halts the record so sweeps stop sending it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};
use veilmatch_matchcore::OrderStore;
use veilmatch_types::{
    Address, EngineConfig, OrderId, PairId, PendingSettlement, Result, SettleReport,
    SettlementId, SettlementReport, StealthLeg, VeilError, to_base_units,
};
use veilmatch_vault::ComplianceGate;

use crate::announcement::{AnnouncementSink, StealthAnnouncement};
use crate::relay::{Relay, RelayReceipt};
use crate::retry::RetryPolicy;

/// Everything needed to drive one trade's Settle path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub settlement_id: SettlementId,
    pub pair_id: PairId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: Address,
    pub seller: Address,
    pub stealth_buyer: StealthLeg,
    pub stealth_seller: StealthLeg,
    pub trade_amount: Decimal,
    pub quote_amount: Decimal,
}

impl From<&PendingSettlement> for SettlementRequest {
    fn from(p: &PendingSettlement) -> Self {
        Self {
            settlement_id: p.settlement_id,
            pair_id: p.pair_id.clone(),
            buy_order_id: p.buy_order_id,
            sell_order_id: p.sell_order_id,
            buyer: p.buyer,
            seller: p.seller,
            stealth_buyer: p.stealth_buyer,
            stealth_seller: p.stealth_seller,
            trade_amount: p.trade_amount,
            quote_amount: p.quote_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The authority applied the report on this submission.
    Settled(RelayReceipt),
    /// An earlier submission already landed.
    AlreadySettled,
}

/// Result of one [`SettlementSubmitter::resubmit_pending`] sweep.
#[derive(Debug, Default)]
pub struct ResubmitSummary {
    pub settled: Vec<SettlementId>,
    pub already_settled: Vec<SettlementId>,
    pub failed: Vec<(SettlementId, VeilError)>,
}

pub struct SettlementSubmitter {
    store: Arc<dyn OrderStore>,
    gate: Arc<dyn ComplianceGate>,
    relay: Arc<dyn Relay>,
    announcements: Arc<dyn AnnouncementSink>,
    engine: EngineConfig,
    retry: RetryPolicy,
}

impl SettlementSubmitter {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gate: Arc<dyn ComplianceGate>,
        relay: Arc<dyn Relay>,
        announcements: Arc<dyn AnnouncementSink>,
        engine: EngineConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            gate,
            relay,
            announcements,
            engine,
            retry,
        }
    }

    /// The exact bytes submitted for `request`. Identical on every call.
    pub fn encode(&self, request: &SettlementRequest) -> Result<Vec<u8>> {
        let pair = self
            .engine
            .pair(&request.pair_id)
            .ok_or_else(|| VeilError::UnknownPair(request.pair_id.clone()))?;
        let report = SettlementReport::Settle(SettleReport {
            order_id: request.settlement_id.as_b256(),
            stealth_buyer: request.stealth_buyer.stealth_address,
            stealth_seller: request.stealth_seller.stealth_address,
            token_a: pair.base_token,
            token_b: pair.quote_token,
            amount_a: to_base_units(request.trade_amount)?,
            amount_b: to_base_units(request.quote_amount)?,
        });
        Ok(report.encode())
    }

    pub async fn submit(&self, request: &SettlementRequest) -> Result<SubmissionOutcome> {
        let id = request.settlement_id;
        for party in [request.buyer, request.seller] {
            if !self.gate.is_verified(party) {
                warn!(settlement = %id, party = %party, "Party not verified; settlement held");
                return Err(VeilError::NotVerified(party));
            }
        }

        let bytes = self.encode(request)?;
        let relay = &self.relay;
        let report = bytes.as_slice();
        let outcome = match self
            .retry
            .run("submit_report", move || relay.submit_report(report))
            .await
        {
            Ok(receipt) => {
                info!(settlement = %id, report_hash = %receipt.report_hash, "Settlement confirmed");
                SubmissionOutcome::Settled(receipt)
            }
            Err(e) if e.is_success_equivalent() => {
                info!(settlement = %id, "Settlement already applied");
                SubmissionOutcome::AlreadySettled
            }
            Err(e) => {
                if e.requires_halt() {
                    error!(settlement = %id, error = %e, halt = true, "Custody cannot cover settlement");
                    if self.store.get_settlement(&id)?.is_some() {
                        self.store.mark_settlement_halted(&id)?;
                    }
                } else if e.is_fatal() {
                    error!(settlement = %id, error = %e, security = true, "Relay not authorized");
                } else {
                    warn!(settlement = %id, error = %e, "Settlement submission failed");
                }
                return Err(e);
            }
        };

        for leg in [request.stealth_buyer, request.stealth_seller] {
            self.announcements
                .publish(StealthAnnouncement {
                    settlement_id: id,
                    leg,
                })
                .await?;
        }

        if self.store.get_settlement(&id)?.is_some() {
            self.store.mark_settlement_confirmed(&id)?;
        }
        Ok(outcome)
    }

    /// Drive every pending settlement in the store again. Per-record
    /// failures are collected; an unauthorized relay stops the sweep.
    /// Halted records are not picked up.
    pub async fn resubmit_pending(&self) -> Result<ResubmitSummary> {
        let mut summary = ResubmitSummary::default();
        for pending in self.store.pending_settlements()? {
            let id = pending.settlement_id;
            match self.submit(&SettlementRequest::from(&pending)).await {
                Ok(SubmissionOutcome::Settled(_)) => summary.settled.push(id),
                Ok(SubmissionOutcome::AlreadySettled) => summary.already_settled.push(id),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => summary.failed.push((id, e)),
            }
        }
        info!(
            settled = summary.settled.len(),
            already_settled = summary.already_settled.len(),
            failed = summary.failed.len(),
            "Resubmission sweep done"
        );
        Ok(summary)
    }
}
