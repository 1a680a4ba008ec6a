// SPDX-License-Identifier: MIT

//! Implementations of the WebAssembly numeric instructions.
//!
//! Shift and rotate amounts are masked to the operand bit width. Division
//! and remainder trap on a zero divisor, and signed division additionally
//! traps on `MIN / -1`. Float `min`/`max` order `-0.0` below `+0.0` and
//! return the canonical quiet NaN when either operand is NaN; `nearest`
//! rounds ties to even.

use wex_error::{kinds::Trap, Result};

// --- i32 integer operations ---

/// `i32.div_s`, trapping on zero divisor and on `i32::MIN / -1`.
pub fn i32_div_s(lhs: i32, rhs: i32) -> Result<i32> {
    if rhs == 0 {
        return Err(Trap::IntegerDivideByZero.into());
    }
    lhs.checked_div(rhs).ok_or_else(|| Trap::IntegerOverflow.into())
}

/// `i32.div_u`, trapping on zero divisor.
pub fn i32_div_u(lhs: u32, rhs: u32) -> Result<u32> {
    lhs.checked_div(rhs).ok_or_else(|| Trap::IntegerDivideByZero.into())
}

/// `i32.rem_s`, trapping on zero divisor. `i32::MIN % -1` is zero.
pub fn i32_rem_s(lhs: i32, rhs: i32) -> Result<i32> {
    if rhs == 0 {
        return Err(Trap::IntegerDivideByZero.into());
    }
    Ok(lhs.wrapping_rem(rhs))
}

/// `i32.rem_u`, trapping on zero divisor.
pub fn i32_rem_u(lhs: u32, rhs: u32) -> Result<u32> {
    lhs.checked_rem(rhs).ok_or_else(|| Trap::IntegerDivideByZero.into())
}

/// `i32.shl` with the shift amount masked to 5 bits.
#[must_use]
pub fn i32_shl(lhs: i32, rhs: i32) -> i32 {
    lhs.wrapping_shl(rhs as u32)
}

/// `i32.shr_s` with the shift amount masked to 5 bits.
#[must_use]
pub fn i32_shr_s(lhs: i32, rhs: i32) -> i32 {
    lhs.wrapping_shr(rhs as u32)
}

/// `i32.shr_u` with the shift amount masked to 5 bits.
#[must_use]
pub fn i32_shr_u(lhs: u32, rhs: u32) -> u32 {
    lhs.wrapping_shr(rhs)
}

/// `i32.rotl` with the rotate amount masked to 5 bits.
#[must_use]
pub fn i32_rotl(lhs: u32, rhs: u32) -> u32 {
    lhs.rotate_left(rhs & 31)
}

/// `i32.rotr` with the rotate amount masked to 5 bits.
#[must_use]
pub fn i32_rotr(lhs: u32, rhs: u32) -> u32 {
    lhs.rotate_right(rhs & 31)
}

/// `i32.clz`.
#[must_use]
pub fn i32_clz(value: u32) -> u32 {
    value.leading_zeros()
}

/// `i32.ctz`.
#[must_use]
pub fn i32_ctz(value: u32) -> u32 {
    value.trailing_zeros()
}

/// `i32.popcnt`.
#[must_use]
pub fn i32_popcnt(value: u32) -> u32 {
    value.count_ones()
}

/// `i32.extend8_s`.
#[must_use]
pub fn i32_extend8_s(value: i32) -> i32 {
    value as i8 as i32
}

/// `i32.extend16_s`.
#[must_use]
pub fn i32_extend16_s(value: i32) -> i32 {
    value as i16 as i32
}

// --- i64 integer operations ---

/// `i64.div_s`, trapping on zero divisor and on `i64::MIN / -1`.
pub fn i64_div_s(lhs: i64, rhs: i64) -> Result<i64> {
    if rhs == 0 {
        return Err(Trap::IntegerDivideByZero.into());
    }
    lhs.checked_div(rhs).ok_or_else(|| Trap::IntegerOverflow.into())
}

/// `i64.div_u`, trapping on zero divisor.
pub fn i64_div_u(lhs: u64, rhs: u64) -> Result<u64> {
    lhs.checked_div(rhs).ok_or_else(|| Trap::IntegerDivideByZero.into())
}

/// `i64.rem_s`, trapping on zero divisor. `i64::MIN % -1` is zero.
pub fn i64_rem_s(lhs: i64, rhs: i64) -> Result<i64> {
    if rhs == 0 {
        return Err(Trap::IntegerDivideByZero.into());
    }
    Ok(lhs.wrapping_rem(rhs))
}

/// `i64.rem_u`, trapping on zero divisor.
pub fn i64_rem_u(lhs: u64, rhs: u64) -> Result<u64> {
    lhs.checked_rem(rhs).ok_or_else(|| Trap::IntegerDivideByZero.into())
}

/// `i64.shl` with the shift amount masked to 6 bits.
#[must_use]
pub fn i64_shl(lhs: i64, rhs: i64) -> i64 {
    lhs.wrapping_shl(rhs as u32)
}

/// `i64.shr_s` with the shift amount masked to 6 bits.
#[must_use]
pub fn i64_shr_s(lhs: i64, rhs: i64) -> i64 {
    lhs.wrapping_shr(rhs as u32)
}

/// `i64.shr_u` with the shift amount masked to 6 bits.
#[must_use]
pub fn i64_shr_u(lhs: u64, rhs: u64) -> u64 {
    lhs.wrapping_shr(rhs as u32)
}

/// `i64.rotl` with the rotate amount masked to 6 bits.
#[must_use]
pub fn i64_rotl(lhs: u64, rhs: u64) -> u64 {
    lhs.rotate_left(rhs as u32 & 63)
}

/// `i64.rotr` with the rotate amount masked to 6 bits.
#[must_use]
pub fn i64_rotr(lhs: u64, rhs: u64) -> u64 {
    lhs.rotate_right(rhs as u32 & 63)
}

/// `i64.clz`.
#[must_use]
pub fn i64_clz(value: u64) -> u64 {
    u64::from(value.leading_zeros())
}

/// `i64.ctz`.
#[must_use]
pub fn i64_ctz(value: u64) -> u64 {
    u64::from(value.trailing_zeros())
}

/// `i64.popcnt`.
#[must_use]
pub fn i64_popcnt(value: u64) -> u64 {
    u64::from(value.count_ones())
}

/// `i64.extend8_s`.
#[must_use]
pub fn i64_extend8_s(value: i64) -> i64 {
    value as i8 as i64
}

/// `i64.extend16_s`.
#[must_use]
pub fn i64_extend16_s(value: i64) -> i64 {
    value as i16 as i64
}

/// `i64.extend32_s`.
#[must_use]
pub fn i64_extend32_s(value: i64) -> i64 {
    value as i32 as i64
}

// --- float operations ---

/// `f32.min`: NaN-propagating, `-0.0` ordered below `+0.0`.
#[must_use]
pub fn f32_min(lhs: f32, rhs: f32) -> f32 {
    if lhs.is_nan() || rhs.is_nan() {
        f32::NAN
    } else if lhs == rhs {
        // Equal comparands differ only for the two zeros.
        if lhs.is_sign_negative() { lhs } else { rhs }
    } else if lhs < rhs {
        lhs
    } else {
        rhs
    }
}

/// `f32.max`: NaN-propagating, `+0.0` ordered above `-0.0`.
#[must_use]
pub fn f32_max(lhs: f32, rhs: f32) -> f32 {
    if lhs.is_nan() || rhs.is_nan() {
        f32::NAN
    } else if lhs == rhs {
        if lhs.is_sign_positive() { lhs } else { rhs }
    } else if lhs > rhs {
        lhs
    } else {
        rhs
    }
}

/// `f64.min`: NaN-propagating, `-0.0` ordered below `+0.0`.
#[must_use]
pub fn f64_min(lhs: f64, rhs: f64) -> f64 {
    if lhs.is_nan() || rhs.is_nan() {
        f64::NAN
    } else if lhs == rhs {
        if lhs.is_sign_negative() { lhs } else { rhs }
    } else if lhs < rhs {
        lhs
    } else {
        rhs
    }
}

/// `f64.max`: NaN-propagating, `+0.0` ordered above `-0.0`.
#[must_use]
pub fn f64_max(lhs: f64, rhs: f64) -> f64 {
    if lhs.is_nan() || rhs.is_nan() {
        f64::NAN
    } else if lhs == rhs {
        if lhs.is_sign_positive() { lhs } else { rhs }
    } else if lhs > rhs {
        lhs
    } else {
        rhs
    }
}

/// `f32.nearest`: round to nearest integral, ties to even.
#[must_use]
pub fn f32_nearest(value: f32) -> f32 {
    value.round_ties_even()
}

/// `f64.nearest`: round to nearest integral, ties to even.
#[must_use]
pub fn f64_nearest(value: f64) -> f64 {
    value.round_ties_even()
}

// --- trapping truncations ---
//
// The truncated operand must land inside the target range; NaN is a
// distinct trap from overflow. The boundary constants below are the exact
// float values adjacent to the target range, so integral truncated values
// pass iff they are representable.

/// `i32.trunc_f32_s`.
pub fn i32_trunc_f32_s(value: f32) -> Result<i32> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated < -2_147_483_648.0 || truncated >= 2_147_483_648.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as i32)
}

/// `i32.trunc_f32_u`.
pub fn i32_trunc_f32_u(value: f32) -> Result<u32> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated <= -1.0 || truncated >= 4_294_967_296.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as u32)
}

/// `i32.trunc_f64_s`.
pub fn i32_trunc_f64_s(value: f64) -> Result<i32> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated < -2_147_483_648.0 || truncated >= 2_147_483_648.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as i32)
}

/// `i32.trunc_f64_u`.
pub fn i32_trunc_f64_u(value: f64) -> Result<u32> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated <= -1.0 || truncated >= 4_294_967_296.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as u32)
}

/// `i64.trunc_f32_s`.
pub fn i64_trunc_f32_s(value: f32) -> Result<i64> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as i64)
}

/// `i64.trunc_f32_u`.
pub fn i64_trunc_f32_u(value: f32) -> Result<u64> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated <= -1.0 || truncated >= 18_446_744_073_709_551_616.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as u64)
}

/// `i64.trunc_f64_s`.
pub fn i64_trunc_f64_s(value: f64) -> Result<i64> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as i64)
}

/// `i64.trunc_f64_u`.
pub fn i64_trunc_f64_u(value: f64) -> Result<u64> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger.into());
    }
    let truncated = value.trunc();
    if truncated <= -1.0 || truncated >= 18_446_744_073_709_551_616.0 {
        return Err(Trap::IntegerOverflow.into());
    }
    Ok(truncated as u64)
}

// --- saturating truncations ---
//
// Rust `as` casts from float to integer have exactly the wasm saturating
// semantics (NaN to zero, out-of-range clamped); the named wrappers keep
// the interpreter dispatch table uniform.

/// `i32.trunc_sat_f32_s`.
#[must_use]
pub fn i32_trunc_sat_f32_s(value: f32) -> i32 {
    value as i32
}

/// `i32.trunc_sat_f32_u`.
#[must_use]
pub fn i32_trunc_sat_f32_u(value: f32) -> u32 {
    value as u32
}

/// `i32.trunc_sat_f64_s`.
#[must_use]
pub fn i32_trunc_sat_f64_s(value: f64) -> i32 {
    value as i32
}

/// `i32.trunc_sat_f64_u`.
#[must_use]
pub fn i32_trunc_sat_f64_u(value: f64) -> u32 {
    value as u32
}

/// `i64.trunc_sat_f32_s`.
#[must_use]
pub fn i64_trunc_sat_f32_s(value: f32) -> i64 {
    value as i64
}

/// `i64.trunc_sat_f32_u`.
#[must_use]
pub fn i64_trunc_sat_f32_u(value: f32) -> u64 {
    value as u64
}

/// `i64.trunc_sat_f64_s`.
#[must_use]
pub fn i64_trunc_sat_f64_s(value: f64) -> i64 {
    value as i64
}

/// `i64.trunc_sat_f64_u`.
#[must_use]
pub fn i64_trunc_sat_f64_u(value: f64) -> u64 {
    value as u64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use proptest::prelude::*;
    use wex_error::{kinds::Trap, Error};

    use super::*;

    fn trap_of<T: core::fmt::Debug>(result: Result<T>) -> Trap {
        match result {
            Err(Error::Trap(trap)) => trap,
            other => panic!("expected a trap, got {other:?}"),
        }
    }

    #[test]
    fn signed_division_edge_cases() {
        assert_eq!(i32_div_s(7, -2).unwrap(), -3);
        assert_eq!(trap_of(i32_div_s(1, 0)), Trap::IntegerDivideByZero);
        assert_eq!(trap_of(i32_div_s(i32::MIN, -1)), Trap::IntegerOverflow);
        assert_eq!(trap_of(i64_div_s(i64::MIN, -1)), Trap::IntegerOverflow);
    }

    #[test]
    fn signed_remainder_min_by_minus_one_is_zero() {
        assert_eq!(i32_rem_s(i32::MIN, -1).unwrap(), 0);
        assert_eq!(i64_rem_s(i64::MIN, -1).unwrap(), 0);
        assert_eq!(trap_of(i32_rem_s(1, 0)), Trap::IntegerDivideByZero);
        assert_eq!(trap_of(i64_rem_u(1, 0)), Trap::IntegerDivideByZero);
    }

    #[test]
    fn shift_amounts_are_masked() {
        assert_eq!(i32_shl(1, 33), 2);
        assert_eq!(i32_shr_u(u32::MAX, 33), u32::MAX >> 1);
        assert_eq!(i64_shl(1, 65), 2);
        assert_eq!(i32_shr_s(-8, 34), -2);
        assert_eq!(i32_rotl(0x8000_0001, 33), 0x0000_0003);
    }

    #[test]
    fn min_max_zero_ordering() {
        assert!(f32_min(0.0, -0.0).is_sign_negative());
        assert!(f32_max(-0.0, 0.0).is_sign_positive());
        assert!(f64_min(-0.0, 0.0).is_sign_negative());
        assert!(f64_max(0.0, -0.0).is_sign_positive());
        assert!(f32_min(f32::NAN, 1.0).is_nan());
        assert!(f64_max(1.0, f64::NAN).is_nan());
        assert_eq!(f32_min(1.0, 2.0), 1.0);
        assert_eq!(f64_max(1.0, 2.0), 2.0);
    }

    #[test]
    fn nearest_rounds_ties_to_even() {
        assert_eq!(f32_nearest(2.5), 2.0);
        assert_eq!(f32_nearest(3.5), 4.0);
        assert_eq!(f64_nearest(-2.5), -2.0);
        assert_eq!(f64_nearest(-0.5), -0.0);
        assert!(f64_nearest(-0.5).is_sign_negative());
    }

    #[test]
    fn trunc_traps_distinguish_nan_from_overflow() {
        assert_eq!(trap_of(i32_trunc_f32_s(f32::NAN)), Trap::InvalidConversionToInteger);
        assert_eq!(trap_of(i32_trunc_f32_s(2_147_483_648.0)), Trap::IntegerOverflow);
        assert_eq!(trap_of(i32_trunc_f64_u(-1.0)), Trap::IntegerOverflow);
        assert_eq!(trap_of(i64_trunc_f64_s(f64::INFINITY)), Trap::IntegerOverflow);
        assert_eq!(i32_trunc_f64_s(-2_147_483_648.9).unwrap(), i32::MIN);
        assert_eq!(i32_trunc_f64_u(-0.9).unwrap(), 0);
        assert_eq!(i32_trunc_f64_s(2_147_483_647.9).unwrap(), i32::MAX);
    }

    #[test]
    fn saturating_trunc_clamps() {
        assert_eq!(i32_trunc_sat_f32_s(f32::NAN), 0);
        assert_eq!(i32_trunc_sat_f32_s(1e10), i32::MAX);
        assert_eq!(i32_trunc_sat_f32_s(-1e10), i32::MIN);
        assert_eq!(i32_trunc_sat_f64_u(-5.0), 0);
        assert_eq!(i64_trunc_sat_f64_u(1e300), u64::MAX);
    }

    #[test]
    fn sign_extensions() {
        assert_eq!(i32_extend8_s(0x80), -128);
        assert_eq!(i32_extend16_s(0x8000), -32768);
        assert_eq!(i64_extend32_s(0x8000_0000), i64::from(i32::MIN));
        assert_eq!(i64_extend8_s(0x7f), 127);
    }

    proptest! {
        #[test]
        fn unsigned_division_agrees_with_host(lhs: u32, rhs in 1u32..) {
            prop_assert_eq!(i32_div_u(lhs, rhs).unwrap(), lhs / rhs);
            prop_assert_eq!(i32_rem_u(lhs, rhs).unwrap(), lhs % rhs);
        }

        #[test]
        fn trunc_agrees_with_sat_inside_range(value in -2_147_483_000.0f64..2_147_483_000.0) {
            prop_assert_eq!(i32_trunc_f64_s(value).unwrap(), i32_trunc_sat_f64_s(value));
        }

        #[test]
        fn rotates_are_inverses(value: u64, amount: u64) {
            prop_assert_eq!(i64_rotr(i64_rotl(value, amount), amount), value);
        }
    }
}
