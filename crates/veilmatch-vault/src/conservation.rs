//! Custody conservation invariant.
//!
//! ```text
//! ∀ token: custody(token) == Σ(inflows) - Σ(outflows)
//! ```
//!
//! Inflows are `fund()` deposits; outflows are settlement payouts, claimed
//! withdrawals, and bridged legs. A mismatch means funds moved through a
//! path the authority did not account for.

use std::collections::{BTreeSet, HashMap};

use alloy_primitives::{Address, U256};
use veilmatch_types::{Result, VeilError};

#[derive(Debug, Clone, Default)]
pub struct CustodyJournal {
    inflows: HashMap<Address, U256>,
    outflows: HashMap<Address, U256>,
}

impl CustodyJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inflow(&mut self, token: Address, amount: U256) {
        let total = self.inflows.entry(token).or_default();
        *total = total.saturating_add(amount);
    }

    pub fn record_outflow(&mut self, token: Address, amount: U256) {
        let total = self.outflows.entry(token).or_default();
        *total = total.saturating_add(amount);
    }

    #[must_use]
    pub fn total_inflow(&self, token: Address) -> U256 {
        self.inflows.get(&token).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_outflow(&self, token: Address) -> U256 {
        self.outflows.get(&token).copied().unwrap_or_default()
    }

    /// `None` if outflows exceed inflows, which is already a violation.
    #[must_use]
    pub fn expected_custody(&self, token: Address) -> Option<U256> {
        self.total_inflow(token).checked_sub(self.total_outflow(token))
    }

    pub fn verify(&self, token: Address, actual: U256) -> Result<()> {
        if self.expected_custody(token) != Some(actual) {
            return Err(VeilError::CustodyInvariantViolation {
                reason: format!(
                    "token {token}: custody {actual}, inflows {}, outflows {}",
                    self.total_inflow(token),
                    self.total_outflow(token)
                ),
            });
        }
        Ok(())
    }

    /// Every token that has ever moved through custody, sorted.
    #[must_use]
    pub fn tracked_tokens(&self) -> Vec<Address> {
        let tokens: BTreeSet<Address> = self
            .inflows
            .keys()
            .chain(self.outflows.keys())
            .copied()
            .collect();
        tokens.into_iter().collect()
    }
}
