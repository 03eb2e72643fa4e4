//! Token balances the authority moves custody through.
//!
//! The vault is one account among many; "custody" is simply the vault
//! address's balance of each token.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use veilmatch_types::{Result, VeilError};

/// One token movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

pub trait TokenLedger {
    fn balance_of(&self, token: Address, account: Address) -> U256;

    /// Apply every transfer in order, or none of them.
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<()>;

    fn transfer(&mut self, transfer: Transfer) -> Result<()> {
        self.transfer_batch(&[transfer])
    }
}

/// In-memory [`TokenLedger`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<(Address, Address), U256>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `token` out of thin air for `account`.
    pub fn mint(&mut self, token: Address, account: Address, amount: U256) -> Result<()> {
        let balance = self.balances.entry((token, account)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(VeilError::BalanceOverflow)?;
        Ok(())
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, token: Address, account: Address) -> U256 {
        self.balances
            .get(&(token, account))
            .copied()
            .unwrap_or_default()
    }

    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<()> {
        // Stage every touched balance, apply in order, commit only if all pass.
        let mut staged: HashMap<(Address, Address), U256> = HashMap::new();
        for t in transfers {
            let from_key = (t.token, t.from);
            let available = staged
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(t.token, t.from));
            let debited = available
                .checked_sub(t.amount)
                .ok_or(VeilError::InsufficientBalance {
                    token: t.token,
                    needed: t.amount,
                    available,
                })?;
            staged.insert(from_key, debited);

            let to_key = (t.token, t.to);
            let current = staged
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(t.token, t.to));
            let credited = current
                .checked_add(t.amount)
                .ok_or(VeilError::BalanceOverflow)?;
            staged.insert(to_key, credited);
        }
        self.balances.extend(staged);
        Ok(())
    }
}
