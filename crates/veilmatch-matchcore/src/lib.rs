//! # veilmatch-matchcore
//!
//! **Price-time priority matching for veilmatch.**
//!
//! MatchCore pairs a triggering order against the resting book of its pair
//! and commits each fill, both legs at once, through an injected
//! [`OrderStore`]. It has:
//!
//! - **Price-time priority**: better price first, then earliest creation
//! - **Both-or-neither fills**: a fill and its pending settlement commit together
//! - **Per-pair serialization**: concurrent match attempts on one pair never interleave
//! - **Deterministic settlement outputs**: ids and stealth legs are pure
//!   functions of the two order ids and the trade nonce

pub mod engine;
pub mod locks;
pub mod memory_store;
pub mod orderbook;
pub mod price_level;
pub mod store;

pub use engine::{MatchReport, MatchingEngine, Submitted};
pub use locks::PairLocks;
pub use memory_store::InMemoryOrderStore;
pub use orderbook::OrderBook;
pub use price_level::{BookEntry, PriceLevel};
pub use store::OrderStore;
