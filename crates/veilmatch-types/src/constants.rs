//! System-wide constants for veilmatch.

/// The single fixed-point precision factor: both base amounts and quote
/// amounts are scaled by `10^FIXED_POINT_DECIMALS` into on-chain base units.
pub const FIXED_POINT_DECIMALS: u32 = 18;

/// Maximum fractional digits accepted on an order price.
pub const PRICE_PRECISION: u32 = 8;

/// Maximum fractional digits accepted on an order quantity.
pub const QTY_PRECISION: u32 = 8;

/// Default per-attempt timeout for a report submission (milliseconds).
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 5_000;

/// Default maximum delivery attempts for one report (first try included).
pub const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 5;

/// Default backoff before the first retry (milliseconds).
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;

/// Upper bound on a single backoff sleep (milliseconds).
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// Domain tag for content-derived settlement ids.
pub const SETTLEMENT_ID_DOMAIN: &[u8] = b"veilmatch:settlement_id:v1:";

/// Domain tag for per-leg stealth seeds.
pub const STEALTH_SEED_DOMAIN: &[u8] = b"veilmatch:stealth_seed:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "veilmatch";
