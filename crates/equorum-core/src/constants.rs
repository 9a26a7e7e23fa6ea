//! Protocol constants. All value amounts are in base units (1 UNIT = 10^18 base units).

/// One whole unit of value or of claim tokens, in base units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Decimals reported by every claim-token ledger.
pub const TOKEN_DECIMALS: u8 = 18;

/// Fixed-point scale of the accrual index ("value per token").
///
/// The index grows by `amount * ACCRUAL_SCALE / total_supply` per deposit and
/// rewards are read back as `balance * delta / ACCRUAL_SCALE`. Both divisions
/// floor.
pub const ACCRUAL_SCALE: u128 = 1_000_000_000_000_000_000;

/// Basis-point denominator (10,000 bps = 100%).
pub const BPS_PRECISION: u16 = 10_000;

/// Longest failure reason retained from a rejected transfer or a failed
/// downstream call. Longer reasons are cut at a char boundary.
pub const MAX_FAILURE_REASON_LEN: usize = 256;

/// Work budget the router hands to the ledger on every forwarding call.
pub const ROUTE_CALL_BUDGET: u64 = 100_000;

/// Work units charged by the ledger for one `distribute` call made through
/// the [`RevenueSink`](crate::traits::RevenueSink) seam.
pub const DISTRIBUTE_CALL_COST: u64 = 40_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

// ---------------------------------------------------------------------------
// Default deployment bounds (see `params::SeriesBounds`)
// ---------------------------------------------------------------------------

/// Smallest ledger share a series may be created with (0.01%).
pub const DEFAULT_MIN_SHARE_BPS: u16 = 1;

/// Largest ledger share a series may be created with (50%).
pub const DEFAULT_MAX_SHARE_BPS: u16 = 5_000;

/// Shortest series lifetime: 30 days.
pub const DEFAULT_MIN_MATURITY_SECS: u64 = 30 * SECONDS_PER_DAY;

/// Longest series lifetime: 5 years.
pub const DEFAULT_MAX_MATURITY_SECS: u64 = 5 * 365 * SECONDS_PER_DAY;

/// Smallest claim-token supply: 1,000 tokens.
pub const DEFAULT_MIN_TOTAL_SUPPLY: u128 = 1_000 * UNIT;

/// Largest claim-token supply: 10^12 tokens.
pub const DEFAULT_MAX_TOTAL_SUPPLY: u128 = 1_000_000_000_000 * UNIT;

/// Floor for the per-series minimum distribution.
pub const DEFAULT_MIN_DISTRIBUTION_FLOOR: u128 = 1;
