//! # Protocol Configuration & Constants
//!
//! Every magic number in SWELL lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! The rate defaults define the economics of the pool. Changing them after
//! launch goes through governance, never through a redeploy.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol fingerprint for identification in logs and status endpoints.
pub const PROTOCOL_FINGERPRINT: &str = "ALAS-SWELL-2026";

/// The full version string, assembled at compile time so we don't allocate
/// for something this trivial at runtime.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Accounting Unit
// ---------------------------------------------------------------------------

/// Number of fractional digits in the internal accounting unit. Every
/// registered asset is normalized to this precision before any arithmetic.
pub const INTERNAL_DECIMALS: u8 = 18;

/// Claim token metadata. The claim is fungible and ERC20-shaped; holders
/// see principal through `balance_of` and redeemable value through
/// `get_balance`.
pub const TOKEN_NAME: &str = "SWELL Pool Token";
pub const TOKEN_SYMBOL: &str = "SWL";
pub const TOKEN_DECIMALS: u8 = INTERNAL_DECIMALS;

// ---------------------------------------------------------------------------
// Rate Defaults
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default annual interest in basis points: 800 = 8.00% APY.
pub const DEFAULT_ANNUAL_INTEREST_BPS: u32 = 800;

/// Default per-second compound factor at the internal 1e18 scale.
///
/// 1.00000000244041 per second compounds to ~1.08 over a 365-day year,
/// which is the 8% APY that `DEFAULT_ANNUAL_INTEREST_BPS` advertises. The
/// two values travel together: governance swaps them as a pair.
pub const DEFAULT_INTEREST_PER_SECOND: u128 = 1_000_000_002_440_410_000;

/// Seconds in the protocol year used for all APY math. 365 days, no leap
/// handling. The per-second factor is derived against this value.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Default throttle window for persisted ratio updates, in seconds.
/// Within one window the persisted ratio is recomputed at most once.
pub const DEFAULT_UPDATE_TIME_LIMIT_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Node Parameters
// ---------------------------------------------------------------------------

/// Default REST API port.
pub const DEFAULT_RPC_PORT: u16 = 9750;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9751;

/// Default interval between background settlement passes, in seconds.
/// Each pass drains as much of the withdrawal queue as current liquidity
/// allows; a short interval just burns CPU re-checking a dry buffer.
pub const DEFAULT_SETTLEMENT_INTERVAL_SECS: u64 = 30;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SCALE;

    #[test]
    fn per_second_factor_is_above_one() {
        // A factor below 1.0 would shrink the ratio, which the rate
        // controller must never allow.
        assert!(DEFAULT_INTEREST_PER_SECOND > SCALE);
    }

    #[test]
    fn default_rate_is_a_sane_fraction() {
        assert!(DEFAULT_ANNUAL_INTEREST_BPS < BPS_DENOMINATOR);
        assert!(DEFAULT_ANNUAL_INTEREST_BPS > 0);
    }

    #[test]
    fn per_second_factor_matches_advertised_apy() {
        // Compounding the default factor over the protocol year must land
        // on the advertised 8%, within the rounding dust of fixed-point pow.
        let year = crate::math::pow_fixed(DEFAULT_INTEREST_PER_SECOND, SECONDS_PER_YEAR).unwrap();
        assert!(year > 1_079_000_000_000_000_000);
        assert!(year < 1_081_000_000_000_000_000);
    }

    #[test]
    fn throttle_window_is_positive() {
        assert!(DEFAULT_UPDATE_TIME_LIMIT_SECS > 0);
    }

    #[test]
    fn ports_are_distinct() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }
}
