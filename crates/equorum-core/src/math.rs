//! Full-precision fixed-point helpers.
//!
//! Accrual math multiplies two `u128` quantities (e.g. `amount * ACCRUAL_SCALE`
//! or `balance * index_delta`) before dividing. Those products routinely exceed
//! `u128`, so [`mul_div_floor`] computes them over a 256-bit intermediate and
//! only fails when the final quotient does not fit.

// Allow clippy warnings from the uint crate's construct_uint macro
#![allow(clippy::manual_div_ceil)]
#![allow(clippy::assign_op_pattern)]

use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer, wide enough for any `u128` product.
    pub struct U256(4);
}

/// `floor(a * b / denominator)` without intermediate overflow.
///
/// Returns `None` if `denominator` is zero or the quotient exceeds `u128`.
///
/// # Examples
///
/// ```
/// use equorum_core::math::mul_div_floor;
/// assert_eq!(mul_div_floor(10, 20, 3), Some(66));
/// assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
/// assert_eq!(mul_div_floor(1, 1, 0), None);
/// ```
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    // A u128 × u128 product always fits in 256 bits.
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return None;
    }
    Some(quotient.low_u128())
}

/// `floor(amount * bps / 10_000)`.
pub fn apply_bps(amount: u128, bps: u16) -> Option<u128> {
    mul_div_floor(amount, bps as u128, crate::constants::BPS_PRECISION as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ACCRUAL_SCALE, UNIT};
    use proptest::prelude::*;

    #[test]
    fn small_values_match_native() {
        assert_eq!(mul_div_floor(7, 6, 4), Some(10));
        assert_eq!(mul_div_floor(0, 123, 7), Some(0));
        assert_eq!(mul_div_floor(5, 5, 1), Some(25));
    }

    #[test]
    fn zero_denominator_is_none() {
        assert_eq!(mul_div_floor(1, 1, 0), None);
    }

    #[test]
    fn wide_intermediate() {
        // 10^30 * 10^18 overflows u128 but the quotient does not.
        let amount = 1_000_000_000_000 * UNIT;
        let supply = 1_000_000 * UNIT;
        assert_eq!(
            mul_div_floor(amount, ACCRUAL_SCALE, supply),
            Some(1_000_000 * ACCRUAL_SCALE)
        );
    }

    #[test]
    fn quotient_overflow_is_none() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
    }

    #[test]
    fn max_operands() {
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX - 1, u128::MAX), Some(u128::MAX - 1));
    }

    #[test]
    fn floors_toward_zero() {
        assert_eq!(mul_div_floor(1, 2, 3), Some(0));
        assert_eq!(mul_div_floor(2, 2, 3), Some(1));
    }

    #[test]
    fn quotient_at_u128_boundary() {
        // 2^128 - 1 fits, 2^128 does not.
        assert_eq!(mul_div_floor(u128::MAX, 2, 2), Some(u128::MAX));
        assert_eq!(mul_div_floor(1 << 127, 4, 2), None);
        assert_eq!(U256::from(u128::MAX).low_u128(), u128::MAX);
    }

    #[test]
    fn bps_split() {
        assert_eq!(apply_bps(10 * UNIT, 2_000), Some(2 * UNIT));
        assert_eq!(apply_bps(9_999, 1), Some(0));
        assert_eq!(apply_bps(10_000, 10_000), Some(10_000));
        assert_eq!(apply_bps(12_345, 0), Some(0));
    }

    proptest! {
        #[test]
        fn agrees_with_u128_when_product_fits(a in 0u128..=u64::MAX as u128, b in 0u128..=u64::MAX as u128, d in 1u128..=u64::MAX as u128) {
            prop_assert_eq!(mul_div_floor(a, b, d), Some(a * b / d));
        }

        #[test]
        fn identity_when_dividing_by_factor(a in any::<u128>(), b in 1u128..) {
            prop_assert_eq!(mul_div_floor(a, b, b), Some(a));
        }

        #[test]
        fn never_rounds_up(a in any::<u64>(), b in any::<u64>(), d in 1u64..) {
            let q = mul_div_floor(a as u128, b as u128, d as u128).unwrap();
            prop_assert!(q * (d as u128) <= (a as u128) * (b as u128));
        }
    }
}
