//! Per-user withdrawal requests.
//!
//! ```text
//!   Requested ──Withdraw report──▶ Claimed (terminal)
//! ```
//!
//! Ids are per-user indices, assigned in request order. Nothing is checked
//! against balances at request time.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use veilmatch_types::{Result, VeilError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: U256,
    pub token: Address,
    pub amount: U256,
    pub claimed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WithdrawalBook {
    requests: HashMap<Address, Vec<WithdrawalRequest>>,
}

impl WithdrawalBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and return its id.
    pub fn request(&mut self, user: Address, token: Address, amount: U256) -> U256 {
        let list = self.requests.entry(user).or_default();
        let id = U256::from(list.len());
        list.push(WithdrawalRequest {
            id,
            token,
            amount,
            claimed: false,
        });
        id
    }

    #[must_use]
    pub fn get(&self, user: Address, id: U256) -> Option<&WithdrawalRequest> {
        let index = usize::try_from(id).ok()?;
        self.requests.get(&user)?.get(index)
    }

    /// The unclaimed request under `id`, or why it cannot be claimed.
    pub fn claimable(&self, user: Address, id: U256) -> Result<&WithdrawalRequest> {
        let request = self.get(user, id).ok_or(VeilError::InvalidWithdrawalId {
            user,
            withdrawal_id: id,
        })?;
        if request.claimed {
            return Err(VeilError::AlreadyClaimed {
                user,
                withdrawal_id: id,
            });
        }
        Ok(request)
    }

    pub fn mark_claimed(&mut self, user: Address, id: U256) -> Result<()> {
        let request = usize::try_from(id)
            .ok()
            .and_then(|index| self.requests.get_mut(&user)?.get_mut(index))
            .ok_or(VeilError::InvalidWithdrawalId {
                user,
                withdrawal_id: id,
            })?;
        request.claimed = true;
        Ok(())
    }

    #[must_use]
    pub fn requests_of(&self, user: Address) -> &[WithdrawalRequest] {
        self.requests.get(&user).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_per_user() {
        let mut book = WithdrawalBook::new();
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let token = Address::repeat_byte(0xaa);
        assert_eq!(book.request(alice, token, U256::from(1u64)), U256::ZERO);
        assert_eq!(book.request(alice, token, U256::from(2u64)), U256::from(1u64));
        assert_eq!(book.request(bob, token, U256::from(3u64)), U256::ZERO);
        assert_eq!(book.requests_of(alice).len(), 2);
    }

    #[test]
    fn claim_lifecycle() {
        let mut book = WithdrawalBook::new();
        let alice = Address::repeat_byte(1);
        let id = book.request(alice, Address::repeat_byte(0xaa), U256::from(5u64));
        assert!(book.claimable(alice, id).is_ok());
        book.mark_claimed(alice, id).unwrap();
        assert!(matches!(
            book.claimable(alice, id),
            Err(VeilError::AlreadyClaimed { .. })
        ));
        assert!(matches!(
            book.claimable(alice, U256::from(7u64)),
            Err(VeilError::InvalidWithdrawalId { .. })
        ));
        assert!(matches!(
            book.claimable(Address::repeat_byte(9), U256::ZERO),
            Err(VeilError::InvalidWithdrawalId { .. })
        ));
    }

    #[test]
    fn huge_id_is_invalid_not_a_panic() {
        let book = WithdrawalBook::new();
        assert!(book.get(Address::ZERO, U256::MAX).is_none());
    }
}
