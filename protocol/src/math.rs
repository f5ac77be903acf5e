//! # Fixed-Point Arithmetic
//!
//! All monetary quantities in SWELL are `u128` values scaled by [`SCALE`]
//! (18 fractional digits). There is no floating point anywhere in the
//! accounting path, and every multiply/divide states which operand carries
//! the scale.
//!
//! ## Rounding
//!
//! Every operation floors. Flooring means the pool can only ever pay out
//! *at most* what was deposited; the sub-unit remainder stays behind as
//! dust. The inverse (rounding up) would mint value out of thin air one
//! attosecond of interest at a time.
//!
//! ## Overflow
//!
//! [`mul_div_floor`] avoids a 256-bit intermediate by decomposing the
//! dividend: with `a = q*c + r`, `floor(a*b/c) = q*b + floor(r*b/c)`
//! exactly. Both partial products are overflow-checked; anything that
//! still overflows u128 is an error, never a wrap.

use thiserror::Error;

/// The internal fixed-point scale: 10^18.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Errors from fixed-point arithmetic.
///
/// These are always programming or configuration errors (absurd amounts,
/// zero divisors), not user-input errors, but they still abort the calling
/// operation cleanly instead of wrapping.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// An intermediate product exceeded u128.
    #[error("arithmetic overflow in fixed-point operation")]
    Overflow,

    /// Division by zero. The growing ratio starts at 1.0 and never
    /// decreases, so a zero divisor means corrupted state.
    #[error("division by zero in fixed-point operation")]
    DivisionByZero,
}

/// Computes `floor(a * b / c)` without a 256-bit intermediate.
///
/// Decomposes `a = q*c + r` so that `a*b/c = q*b + r*b/c` with `r < c`.
/// The first term is exact; the second floors. The sum equals the true
/// floored quotient.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    let q = a / c;
    let r = a % c;

    let whole = q.checked_mul(b).ok_or(MathError::Overflow)?;
    let frac = r.checked_mul(b).ok_or(MathError::Overflow)? / c;
    whole.checked_add(frac).ok_or(MathError::Overflow)
}

/// Multiplies two scaled values: `floor(a * b / SCALE)`.
///
/// Both operands carry the 1e18 scale; the result does too.
pub fn mul_floor(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_floor(a, b, SCALE)
}

/// Divides two scaled values: `floor(a * SCALE / b)`.
///
/// Both operands carry the 1e18 scale; the result does too.
pub fn div_floor(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_floor(a, SCALE, b)
}

/// Raises a scaled base to an integer power: `floor(base^exp)` at [`SCALE`].
///
/// Square-and-multiply, so a year of seconds (~2^25) costs ~50 fixed-point
/// multiplications rather than 31 million. Each step floors; the
/// accumulated error over a one-year exponent is on the order of 1e-11
/// relative, far below the unit of account.
pub fn pow_fixed(base: u128, exp: u64) -> Result<u128, MathError> {
    let mut acc = SCALE;
    let mut base = base;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_floor(acc, base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = mul_floor(base, base)?;
        }
    }
    Ok(acc)
}

/// Returns `10^n`, checked. Used by decimal normalization, where `n` is
/// the gap between an asset's native precision and the internal one.
pub fn pow10(n: u32) -> Result<u128, MathError> {
    10u128.checked_pow(n).ok_or(MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_matches_naive_for_small_values() {
        // Small enough that the naive product fits in u128.
        for (a, b, c) in [
            (7u128, 13u128, 5u128),
            (1_000_000, 999_999, 7),
            (SCALE, SCALE, SCALE),
            (123_456_789, SCALE, 987_654_321),
        ] {
            assert_eq!(mul_div_floor(a, b, c).unwrap(), a * b / c);
        }
    }

    #[test]
    fn mul_div_survives_values_that_would_overflow_naively() {
        // a * b here is ~1e56, far beyond u128. The decomposition keeps
        // every partial product in range.
        let a = 5_000_000_000 * SCALE; // five billion units
        let b = 2 * SCALE; // ratio of 2.0
        assert_eq!(mul_div_floor(a, b, SCALE).unwrap(), 10_000_000_000 * SCALE);
    }

    #[test]
    fn mul_div_rejects_zero_divisor() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_floor_floors() {
        // 1.5 * 1.5 = 2.25 exactly; 1 wei short of 1.5 squared floors down.
        let one_and_half = SCALE + SCALE / 2;
        assert_eq!(
            mul_floor(one_and_half, one_and_half).unwrap(),
            2 * SCALE + SCALE / 4
        );
        assert_eq!(
            mul_floor(one_and_half - 1, one_and_half).unwrap(),
            2 * SCALE + SCALE / 4 - 2
        );
    }

    #[test]
    fn div_floor_inverts_mul_floor_for_exact_quotients() {
        let amount = 250 * SCALE;
        let ratio = 2 * SCALE;
        let principal = div_floor(amount, ratio).unwrap();
        assert_eq!(principal, 125 * SCALE);
        assert_eq!(mul_floor(principal, ratio).unwrap(), amount);
    }

    #[test]
    fn pow_identity_cases() {
        assert_eq!(pow_fixed(SCALE, 0).unwrap(), SCALE);
        assert_eq!(pow_fixed(SCALE, 1_000_000).unwrap(), SCALE);
        assert_eq!(pow_fixed(123 * SCALE, 0).unwrap(), SCALE);
        assert_eq!(pow_fixed(123 * SCALE, 1).unwrap(), 123 * SCALE);
    }

    #[test]
    fn pow_of_two() {
        assert_eq!(pow_fixed(2 * SCALE, 10).unwrap(), 1024 * SCALE);
    }

    #[test]
    fn pow_compounds_a_year_of_interest_accurately() {
        // The default 8% per-second factor over 365 days of seconds.
        let factor = pow_fixed(
            crate::config::DEFAULT_INTEREST_PER_SECOND,
            crate::config::SECONDS_PER_YEAR,
        )
        .unwrap();
        // Must land within a tenth of a percent of 1.08.
        assert!(factor > 1_079_900_000_000_000_000, "factor {}", factor);
        assert!(factor < 1_080_100_000_000_000_000, "factor {}", factor);
    }

    #[test]
    fn pow_is_monotone_in_exponent_for_base_above_one() {
        let base = crate::config::DEFAULT_INTEREST_PER_SECOND;
        let day = pow_fixed(base, 86_400).unwrap();
        let week = pow_fixed(base, 7 * 86_400).unwrap();
        assert!(day > SCALE);
        assert!(week > day);
    }

    #[test]
    fn pow10_caps_at_u128() {
        assert_eq!(pow10(0).unwrap(), 1);
        assert_eq!(pow10(18).unwrap(), SCALE);
        assert!(pow10(39).is_err());
    }
}
