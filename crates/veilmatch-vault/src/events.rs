//! Append-only log of applied state transitions.
//!
//! Rejected calls never emit; every event corresponds to a transition that
//! fully took effect.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Funded {
        user: Address,
        token: Address,
        amount: U256,
    },
    Verified {
        user: Address,
    },
    Settled {
        order_id: B256,
        stealth_buyer: Address,
        stealth_seller: Address,
        token_a: Address,
        amount_a: U256,
        token_b: Address,
        amount_b: U256,
    },
    WithdrawalRequested {
        user: Address,
        withdrawal_id: U256,
        token: Address,
        amount: U256,
    },
    WithdrawalClaimed {
        user: Address,
        withdrawal_id: U256,
        token: Address,
        amount: U256,
    },
    CrossChainDispatched {
        order_id: B256,
        dest_chain_selector: u64,
        message_id: B256,
        fee: U256,
    },
    FeeDeposited {
        from: Address,
        amount: U256,
    },
    ForwarderUpdated {
        previous: Address,
        current: Address,
    },
    OwnershipTransferred {
        previous: Address,
        current: Address,
    },
}
