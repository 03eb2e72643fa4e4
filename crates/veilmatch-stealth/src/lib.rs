//! # veilmatch-stealth
//!
//! Deterministic one-time payout destinations on secp256k1, in the style of
//! EIP-5564.
//!
//! Derivation is a pure function of the recipient's spending public key and
//! a seed built from public trade data. It never consults a random source,
//! so independent executors of the same settlement agree on its output and
//! may run it concurrently without coordination.
//!
//! The ephemeral public key `R` and a one-byte view tag are published with
//! every leg. Without `R` the recipient cannot rebuild the stealth key.

mod curve;
pub mod derive;
pub mod recover;
pub mod seed;

pub use derive::{derive_stealth_address, derive_trade_legs, validate_spending_key};
pub use recover::{SpendingSecret, StealthSecret, recover_stealth_key, scan, view_tag_matches};
pub use seed::{LegRole, StealthSeed};
