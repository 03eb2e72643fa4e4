//! Error types for veilmatch.
//!
//! All errors use the `VM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / validation errors
//! - 2xx: Compliance errors
//! - 3xx: Settlement idempotency errors
//! - 4xx: Authority / access errors
//! - 5xx: Custody balance errors
//! - 6xx: Report codec and stealth crypto errors
//! - 7xx: Matching errors
//! - 8xx: Network / relay / bridge errors
//! - 9xx: General / internal errors

use alloy_primitives::{Address, B256, U256};
use thiserror::Error;

use crate::{OrderId, OrderStatus, PairId};

/// Central error enum for all veilmatch operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VeilError {
    // =================================================================
    // Order / Validation Errors (1xx)
    // =================================================================
    /// The requested order was not found in the store.
    #[error("VM_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (bad amount, bad price, etc.).
    #[error("VM_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// An order with this ID already exists.
    #[error("VM_ERR_102: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order cannot be cancelled in its current state.
    #[error("VM_ERR_103: Order cannot be cancelled in state {status}")]
    OrderNotCancellable { status: OrderStatus },

    /// The caller does not own the order.
    #[error("VM_ERR_104: Caller {caller} does not own order {order_id}")]
    NotOrderOwner { order_id: OrderId, caller: Address },

    /// An amount could not be represented in fixed-point base units.
    #[error("VM_ERR_105: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// No configuration exists for this trading pair.
    #[error("VM_ERR_106: Unknown pair: {0}")]
    UnknownPair(PairId),

    // =================================================================
    // Compliance Errors (2xx)
    // =================================================================
    /// The address has not completed verification.
    #[error("VM_ERR_200: Address not verified: {0}")]
    NotVerified(Address),

    // =================================================================
    // Settlement Idempotency Errors (3xx)
    // =================================================================
    /// This settlement id has already been paid out.
    #[error("VM_ERR_300: Already settled: {0}")]
    AlreadySettled(B256),

    /// This withdrawal has already been claimed.
    #[error("VM_ERR_301: Withdrawal {withdrawal_id} of {user} already claimed")]
    AlreadyClaimed { user: Address, withdrawal_id: U256 },

    /// No withdrawal request exists under this id.
    #[error("VM_ERR_302: Invalid withdrawal id {withdrawal_id} for {user}")]
    InvalidWithdrawalId { user: Address, withdrawal_id: U256 },

    // =================================================================
    // Authority / Access Errors (4xx)
    // =================================================================
    /// A report arrived from an address other than the trusted forwarder.
    #[error("VM_ERR_400: Unauthorized report sender: {0}")]
    UnauthorizedSender(Address),

    /// An owner-gated capability was invoked by a non-owner.
    #[error("VM_ERR_401: Caller is not the owner: {0}")]
    NotOwner(Address),

    // =================================================================
    // Custody Balance Errors (5xx)
    // =================================================================
    /// A token transfer exceeded the source balance.
    #[error("VM_ERR_500: Insufficient balance of {token}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        needed: U256,
        available: U256,
    },

    /// The bridging fee exceeds the vault's fee balance.
    #[error("VM_ERR_501: Insufficient fee balance: need {needed}, have {available}")]
    InsufficientFeeBalance { needed: U256, available: U256 },

    /// A balance credit would overflow 256 bits.
    #[error("VM_ERR_502: Balance overflow")]
    BalanceOverflow,

    /// Custody no longer equals inflows minus outflows.
    #[error("VM_ERR_503: Custody invariant violated: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // Codec / Stealth Errors (6xx)
    // =================================================================
    /// The report's first byte is not a known variant tag.
    #[error("VM_ERR_600: Unknown report tag: {0}")]
    UnknownReportTag(u8),

    /// The report bytes do not match the variant's layout.
    #[error("VM_ERR_601: Malformed report: {reason}")]
    MalformedReport { reason: String },

    /// A public key is not a valid secp256k1 point.
    #[error("VM_ERR_602: Invalid public key: {reason}")]
    InvalidPublicKey { reason: String },

    /// A derived scalar was zero or not below the curve order.
    #[error("VM_ERR_603: Degenerate scalar derived from seed")]
    DegenerateScalar,

    /// A stealth announcement does not belong to the scanning key.
    #[error("VM_ERR_604: Stealth address {0} not derivable from this key")]
    StealthMismatch(Address),

    // =================================================================
    // Matching Errors (7xx)
    // =================================================================
    /// A leg of a prospective trade has no stealth destination yet.
    #[error("VM_ERR_700: Order {0} has no stealth destination")]
    MissingStealthDestination(OrderId),

    /// The matching loop could not complete.
    #[error("VM_ERR_701: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    // =================================================================
    // Network / Relay Errors (8xx)
    // =================================================================
    /// Transient transport failure talking to the relay or bridge.
    #[error("VM_ERR_800: Network error: {reason}")]
    Network { reason: String },

    /// A call did not complete within its caller-supplied timeout.
    #[error("VM_ERR_801: Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Bounded retries ran out; carries the last transient failure.
    #[error("VM_ERR_802: Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// The bridge router refused the outbound message.
    #[error("VM_ERR_803: Bridge send failed: {reason}")]
    BridgeSendFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("VM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("VM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("VM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("VM_ERR_903: I/O error: {0}")]
    Io(String),
}

impl VeilError {
    /// Expected on retries of an already-applied report. Callers treat it as
    /// success, not as a bug.
    #[must_use]
    pub fn is_success_equivalent(&self) -> bool {
        matches!(self, Self::AlreadySettled(_) | Self::AlreadyClaimed { .. })
    }

    /// Transient: safe to retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. } | Self::Io(_))
    }

    /// Security-relevant and never retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnauthorizedSender(_) | Self::NotOwner(_))
    }

    /// Signals an upstream accounting defect in the relay: stop attempting
    /// this report and alert.
    #[must_use]
    pub fn requires_halt(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientFeeBalance { .. }
                | Self::CustodyInvariantViolation { .. }
        )
    }

    /// Rejected before any state mutation; fixing the input is the only remedy.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidOrder { .. }
                | Self::InvalidAmount { .. }
                | Self::UnknownPair(_)
                | Self::UnknownReportTag(_)
                | Self::MalformedReport { .. }
                | Self::InvalidPublicKey { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VeilError>;

// Conversion from std::io::Error
impl From<std::io::Error> for VeilError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VeilError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
