//! # Rate Controller
//!
//! Owns the *growing ratio*: the single multiplier that turns principal
//! into redeemable value. Instead of touching every account whenever
//! interest accrues, the pool compounds one number and every balance
//! scales through it for free.
//!
//! ## Throttle
//!
//! The persisted ratio is recomputed at most once per
//! `update_time_limit_secs`. Within the window, [`RateController::update_ratio`]
//! is a no-op: calling it twice in a row yields an identical ratio. The
//! throttle exists so that high-frequency callers cannot grind out one
//! floored compounding step per call and slowly under-accrue the pool.
//!
//! ## Projection vs Persistence
//!
//! Two reads, deliberately distinct:
//!
//! - [`RateController::projected_ratio`] answers "what would the ratio be
//!   if updated right now". Pure, never mutates, ignores the throttle.
//!   Backs the `get_balance` view so balances tick in real time.
//! - [`RateController::growing_ratio`] is the last persisted value.
//!   Backs `get_balance_for_withdraw` and every mutating path, which
//!   first run the throttled update and then read this field -- so a
//!   burn computed in the same call always matches persisted state.
//!
//! ## Invariants
//!
//! - The ratio is monotonically non-decreasing. The per-second factor is
//!   rejected below 1.0, and elapsed time never runs backwards here: a
//!   clock that does is treated as zero elapsed seconds.
//! - With `annual_interest_bps == 0` the factor is exactly 1.0: the ratio
//!   freezes but every call remains valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    DEFAULT_ANNUAL_INTEREST_BPS, DEFAULT_INTEREST_PER_SECOND, DEFAULT_UPDATE_TIME_LIMIT_SECS,
};
use crate::math::{self, MathError, SCALE};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from rate configuration and compounding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateError {
    /// A per-second factor below 1.0 would make the ratio regress, which
    /// breaks every holder's already-accrued value. Rejected outright.
    #[error("per-second factor {0} is below the 1.0 scale point")]
    FactorBelowOne(u128),

    /// The throttle window must be positive; a zero window would turn the
    /// throttle off and re-open the grind-the-floor attack.
    #[error("update time limit must be positive, got {0}")]
    NonPositiveTimeLimit(i64),

    /// Compounding arithmetic overflowed.
    #[error("rate arithmetic failed: {0}")]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// RateController
// ---------------------------------------------------------------------------

/// Interest-rate state: the governed parameters and the persisted ratio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateController {
    /// Advertised annual rate in basis points. Informational: the factor
    /// below is what actually compounds.
    annual_interest_bps: u32,

    /// Per-second compound factor at the 1e18 scale. 1.0 means frozen.
    interest_per_second: u128,

    /// The persisted growing ratio at the 1e18 scale. Starts at 1.0 and
    /// never decreases.
    growing_ratio: u128,

    /// When the persisted ratio was last recomputed.
    last_update: DateTime<Utc>,

    /// Throttle window for persisted updates, in seconds.
    update_time_limit_secs: i64,
}

impl RateController {
    /// Creates a controller at genesis: ratio 1.0, default rate, default
    /// throttle window, last update stamped `genesis`.
    pub fn new(genesis: DateTime<Utc>) -> Self {
        Self {
            annual_interest_bps: DEFAULT_ANNUAL_INTEREST_BPS,
            interest_per_second: DEFAULT_INTEREST_PER_SECOND,
            growing_ratio: SCALE,
            last_update: genesis,
            update_time_limit_secs: DEFAULT_UPDATE_TIME_LIMIT_SECS,
        }
    }

    /// The advertised annual rate in basis points.
    pub fn annual_interest_bps(&self) -> u32 {
        self.annual_interest_bps
    }

    /// The per-second compound factor (1e18 scale).
    pub fn interest_per_second(&self) -> u128 {
        self.interest_per_second
    }

    /// The last persisted ratio (1e18 scale). This is the value every
    /// mutating path prices against.
    pub fn growing_ratio(&self) -> u128 {
        self.growing_ratio
    }

    /// When the persisted ratio was last recomputed.
    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// The current throttle window in seconds.
    pub fn update_time_limit_secs(&self) -> i64 {
        self.update_time_limit_secs
    }

    /// Elapsed whole seconds since the last persisted update, clamped at
    /// zero. A clock running backwards reads as "no time passed" rather
    /// than poisoning the monotonic ratio.
    fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        let dt = (now - self.last_update).num_seconds();
        if dt <= 0 {
            0
        } else {
            dt as u64
        }
    }

    /// Recomputes the persisted ratio if the throttle window has elapsed.
    ///
    /// Returns `true` if the ratio was recomputed, `false` if the call was
    /// a throttled no-op. Two calls within one window always leave an
    /// identical ratio.
    pub fn update_ratio(&mut self, now: DateTime<Utc>) -> Result<bool, RateError> {
        let dt = self.elapsed_secs(now);
        if (dt as i64) < self.update_time_limit_secs {
            return Ok(false);
        }
        self.compound(now, dt)?;
        Ok(true)
    }

    /// Recomputes the persisted ratio regardless of the throttle window.
    ///
    /// Used by [`set_interest`](Self::set_interest) to flush accrual under
    /// the old rate before the swap: the window must not let a new rate
    /// apply retroactively to elapsed seconds.
    pub fn force_update(&mut self, now: DateTime<Utc>) -> Result<(), RateError> {
        let dt = self.elapsed_secs(now);
        self.compound(now, dt)
    }

    fn compound(&mut self, now: DateTime<Utc>, dt: u64) -> Result<(), RateError> {
        if dt > 0 {
            let growth = math::pow_fixed(self.interest_per_second, dt)?;
            self.growing_ratio = math::mul_floor(self.growing_ratio, growth)?;
            // Only move the watermark forward; a skewed clock must not
            // rewind it and let the same seconds accrue twice.
            self.last_update = now;
        }
        Ok(())
    }

    /// What the ratio *would* be if persisted right now. Pure projection:
    /// no mutation, no throttle.
    pub fn projected_ratio(&self, now: DateTime<Utc>) -> Result<u128, RateError> {
        let dt = self.elapsed_secs(now);
        if dt == 0 {
            return Ok(self.growing_ratio);
        }
        let growth = math::pow_fixed(self.interest_per_second, dt)?;
        Ok(math::mul_floor(self.growing_ratio, growth)?)
    }

    /// Swaps in a new rate pair, flushing accrual under the old rate first.
    ///
    /// Returns the old `(annual_bps, per_second)` pair for event emission.
    ///
    /// # Errors
    ///
    /// Returns [`RateError::FactorBelowOne`] if the new factor would make
    /// the ratio regress.
    pub fn set_interest(
        &mut self,
        new_annual_bps: u32,
        new_interest_per_second: u128,
        now: DateTime<Utc>,
    ) -> Result<(u32, u128), RateError> {
        if new_interest_per_second < SCALE {
            return Err(RateError::FactorBelowOne(new_interest_per_second));
        }

        // Everything up to this instant accrued at the old rate.
        self.force_update(now)?;

        let old = (self.annual_interest_bps, self.interest_per_second);
        self.annual_interest_bps = new_annual_bps;
        self.interest_per_second = new_interest_per_second;
        Ok(old)
    }

    /// Changes the throttle window. Returns the old value in seconds.
    pub fn set_update_time_limit(&mut self, secs: i64) -> Result<i64, RateError> {
        if secs <= 0 {
            return Err(RateError::NonPositiveTimeLimit(secs));
        }
        let old = self.update_time_limit_secs;
        self.update_time_limit_secs = secs;
        Ok(old)
    }
}
