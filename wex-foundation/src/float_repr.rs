// SPDX-License-Identifier: MIT

//! Raw-bit wrappers for IEEE-754 floats.
//!
//! Wasm semantics are defined over bit patterns, not host float equality:
//! two NaNs with different payloads are distinct values, and `-0.0 == 0.0`
//! must not collapse them. Wrapping the bits keeps [`crate::Value`] `Eq` and
//! `Hash` while preserving payloads exactly.

use core::fmt;

/// The raw bits of an `f32` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FloatBits32(pub u32);

impl FloatBits32 {
    /// The canonical quiet NaN bit pattern.
    pub const NAN: Self = Self(0x7fc0_0000);

    /// Wraps the bit pattern of the given float.
    #[must_use]
    pub fn from_float(value: f32) -> Self {
        Self(value.to_bits())
    }

    /// The `f32` represented by these bits.
    #[must_use]
    pub fn value(self) -> f32 {
        f32::from_bits(self.0)
    }
}

impl fmt::Display for FloatBits32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<f32> for FloatBits32 {
    fn from(value: f32) -> Self {
        Self::from_float(value)
    }
}

/// The raw bits of an `f64` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FloatBits64(pub u64);

impl FloatBits64 {
    /// The canonical quiet NaN bit pattern.
    pub const NAN: Self = Self(0x7ff8_0000_0000_0000);

    /// Wraps the bit pattern of the given float.
    #[must_use]
    pub fn from_float(value: f64) -> Self {
        Self(value.to_bits())
    }

    /// The `f64` represented by these bits.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl fmt::Display for FloatBits64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<f64> for FloatBits64 {
    fn from(value: f64) -> Self {
        Self::from_float(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn nan_payloads_are_distinguished() {
        let quiet = FloatBits32::NAN;
        let payload = FloatBits32(0x7fc0_0001);
        assert!(quiet.value().is_nan());
        assert!(payload.value().is_nan());
        assert_ne!(quiet, payload);
    }

    #[test]
    fn signed_zeros_are_distinguished() {
        let pos = FloatBits64::from_float(0.0);
        let neg = FloatBits64::from_float(-0.0);
        assert_ne!(pos, neg);
        assert_eq!(pos.value(), neg.value());
    }
}
