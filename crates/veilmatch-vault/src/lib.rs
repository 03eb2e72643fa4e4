//! # veilmatch-vault
//!
//! The custody authority for **veilmatch**.
//!
//! [`VaultStateMachine`] holds pooled tokens and applies binary
//! [`SettlementReport`](veilmatch_types::SettlementReport)s from a single
//! trusted forwarder:
//!
//! - **Verify** adds an address to the monotonic verified set
//! - **Settle** pays both trade legs to stealth addresses, exactly once per id
//! - **Withdraw** claims a previously requested withdrawal
//! - **CrossChainSettle** hands the USDC leg to a [`BridgeRouter`] and pays the fee
//!
//! Storage for the verified and settled sets is injected through
//! [`FlagStore`]; token movements go through a [`TokenLedger`].
//! [`CustodyJournal`] tracks inflows and outflows so custody can be checked
//! against them at any point.

pub mod bridge;
pub mod compliance;
pub mod conservation;
pub mod events;
pub mod ledger;
pub mod store;
pub mod vault;
pub mod withdrawal;

pub use bridge::{BridgeMessage, BridgeRouter, CrossChainReceiver, MemoryBridge};
pub use compliance::ComplianceGate;
pub use conservation::CustodyJournal;
pub use events::VaultEvent;
pub use ledger::{MemoryLedger, TokenLedger, Transfer};
pub use store::{FlagStore, MemoryFlagStore};
pub use vault::{ReportOutcome, VaultStateMachine};
pub use withdrawal::{WithdrawalBook, WithdrawalRequest};
