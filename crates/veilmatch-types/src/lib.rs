//! # veilmatch-types
//!
//! Shared types, errors, and configuration for the **veilmatch** confidential
//! settlement workspace.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`PairId`], [`SettlementId`], plus the EVM
//!   primitives [`Address`], [`B256`], [`U256`]
//! - **Order model**: [`Order`], [`NewOrder`], [`OrderSide`], [`OrderStatus`]
//! - **Trade model**: [`TradeMatch`], [`FillUpdate`], [`PendingSettlement`]
//! - **Stealth keys**: [`SpendingPublicKey`]
//! - **Fixed-point amounts**: [`to_base_units`], [`quote_amount`]
//! - **Settlement reports**: [`SettlementReport`] and its canonical binary codec
//! - **Configuration**: [`EngineConfig`], [`PairConfig`], [`RelayConfig`], [`VaultConfig`]
//! - **Errors**: [`VeilError`] with `VM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod keys;
pub mod order;
pub mod report;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use veilmatch_types::{Order, OrderSide, SettlementReport, ...};

pub use amount::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use keys::*;
pub use order::*;
pub use report::*;
pub use trade::*;

pub use alloy_primitives::{Address, B256, U256};

// Constants are accessed via `veilmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
