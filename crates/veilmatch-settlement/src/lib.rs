//! # veilmatch-settlement
//!
//! Drives committed fills to the vault authority.
//!
//! ## Flow
//!
//! For every [`PendingSettlement`](veilmatch_types::PendingSettlement) the
//! matching engine commits, the [`SettlementSubmitter`]:
//! 1. Re-checks the [`ComplianceGate`](veilmatch_vault::ComplianceGate) for both trade parties
//! 2. Encodes a Settle report keyed by the deterministic settlement id
//! 3. Delivers it through a [`Relay`] under a [`RetryPolicy`]
//! 4. Publishes one [`StealthAnnouncement`] per leg
//! 5. Marks the store's record confirmed
//!
//! A failed submission never touches the committed fill. Resubmitting the
//! same record produces the same report bytes; if the first attempt actually
//! landed, the authority answers `AlreadySettled` and the submitter treats
//! that as success.

pub mod announcement;
pub mod relay;
pub mod retry;
pub mod submitter;

pub use announcement::{AnnouncementSink, MemoryAnnouncementBoard, StealthAnnouncement};
pub use relay::{Relay, RelayReceipt, VaultRelay};
pub use retry::RetryPolicy;
pub use submitter::{ResubmitSummary, SettlementRequest, SettlementSubmitter, SubmissionOutcome};
