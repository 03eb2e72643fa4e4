//! The verified-address predicate.
//!
//! The vault consults it inside `fund()`, where it is the final authority
//! for custody entry. The off-chain submission path asks it again for both
//! trade parties before sending a Settle report. Payout itself is not
//! re-gated.

use std::sync::{Arc, Mutex};

use alloy_primitives::Address;

pub trait ComplianceGate: Send + Sync {
    fn is_verified(&self, address: Address) -> bool;
}

impl<G: ComplianceGate + ?Sized> ComplianceGate for Arc<G> {
    fn is_verified(&self, address: Address) -> bool {
        (**self).is_verified(address)
    }
}

/// A gate behind a mutex answers `false` if the lock is poisoned.
impl<G: ComplianceGate> ComplianceGate for Mutex<G> {
    fn is_verified(&self, address: Address) -> bool {
        self.lock().is_ok_and(|gate| gate.is_verified(address))
    }
}
