// SPDX-License-Identifier: MIT

//! The tagged host-facing [`Value`] and its compact untagged runtime
//! encoding [`UntypedValue`].
//!
//! The interpreter stack stores only `UntypedValue` words; the static type
//! of every slot is known from the instruction operand that reads it, so no
//! tag dispatch happens on hot paths. The bit layout of `UntypedValue` is an
//! implementation detail and not part of any exposed contract; the only
//! guaranteed property is the exact round-trip through [`Value`] for a
//! known static type.

use core::fmt;

use crate::float_repr::{FloatBits32, FloatBits64};
use crate::types::{ExternAddr, FuncAddr, RefType, ValueType};

/// A nullable reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    /// A function reference, null when `None`.
    Func(Option<FuncAddr>),
    /// An external (host) reference, null when `None`.
    Extern(Option<ExternAddr>),
}

impl Ref {
    /// Whether this reference is null.
    #[must_use]
    pub const fn is_null(self) -> bool {
        matches!(self, Self::Func(None) | Self::Extern(None))
    }

    /// The null reference of the given type.
    #[must_use]
    pub const fn null(ty: RefType) -> Self {
        match ty {
            RefType::Func => Self::Func(None),
            RefType::Extern => Self::Extern(None),
        }
    }
}

/// A tagged WebAssembly value, the representation used at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A 32-bit integer (sign-agnostic two's-complement).
    I32(i32),
    /// A 64-bit integer (sign-agnostic two's-complement).
    I64(i64),
    /// A 32-bit float, stored as raw bits.
    F32(FloatBits32),
    /// A 64-bit float, stored as raw bits.
    F64(FloatBits64),
    /// A nullable function reference.
    FuncRef(Option<FuncAddr>),
    /// A nullable external reference.
    ExternRef(Option<ExternAddr>),
}

impl Value {
    /// The static type of this value.
    #[must_use]
    pub const fn ty(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::FuncRef(_) => ValueType::FuncRef,
            Self::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// Builds an `F32` value from a host float.
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self::F32(FloatBits32::from_float(value))
    }

    /// Builds an `F64` value from a host float.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self::F64(FloatBits64::from_float(value))
    }

    /// The contained `i32`, if this is an `I32` value.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `i64`, if this is an `I64` value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained `f32`, if this is an `F32` value.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(bits) => Some(bits.value()),
            _ => None,
        }
    }

    /// The contained `f64`, if this is an `F64` value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(bits) => Some(bits.value()),
            _ => None,
        }
    }

    /// This value as a reference, if it is one.
    #[must_use]
    pub const fn as_ref(&self) -> Option<Ref> {
        match self {
            Self::FuncRef(addr) => Some(Ref::Func(*addr)),
            Self::ExternRef(addr) => Some(Ref::Extern(*addr)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "i32:{v}"),
            Self::I64(v) => write!(f, "i64:{v}"),
            Self::F32(v) => write!(f, "f32:{v}"),
            Self::F64(v) => write!(f, "f64:{v}"),
            Self::FuncRef(Some(addr)) => write!(f, "funcref:{addr}"),
            Self::FuncRef(None) => write!(f, "funcref:null"),
            Self::ExternRef(Some(addr)) => write!(f, "externref:{addr}"),
            Self::ExternRef(None) => write!(f, "externref:null"),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<Ref> for Value {
    fn from(reference: Ref) -> Self {
        match reference {
            Ref::Func(addr) => Self::FuncRef(addr),
            Ref::Extern(addr) => Self::ExternRef(addr),
        }
    }
}

/// The untagged 64-bit storage word used on the interpreter stack.
///
/// Integers are stored zero-extended, floats as raw bits, references as
/// their store address with the reserved high bit marking null. Non-null
/// reference addresses therefore must fit in 63 bits, which the `u32`
/// address newtypes guarantee by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UntypedValue {
    storage: u64,
}

/// High bit of the storage word, reserved for the null-reference marker.
const NULL_REF_MASK: u64 = 1 << 63;

impl UntypedValue {
    /// The all-zero word (integer zero, `+0.0`, also used for fresh locals).
    pub const ZERO: Self = Self { storage: 0 };

    /// Encodes an `i32` (zero-extending its unsigned representation).
    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        Self { storage: value as u32 as u64 }
    }

    /// Encodes a `u32`.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self { storage: value as u64 }
    }

    /// Encodes an `i64`.
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        Self { storage: value as u64 }
    }

    /// Encodes a `u64`.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self { storage: value }
    }

    /// Encodes an `f32` as its raw bits.
    #[must_use]
    pub fn from_f32(value: f32) -> Self {
        Self { storage: value.to_bits() as u64 }
    }

    /// Encodes an `f64` as its raw bits.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self { storage: value.to_bits() }
    }

    /// Encodes a reference.
    #[must_use]
    pub const fn from_ref(reference: Ref) -> Self {
        let addr = match reference {
            Ref::Func(Some(addr)) => Some(addr.0),
            Ref::Extern(Some(addr)) => Some(addr.0),
            Ref::Func(None) | Ref::Extern(None) => None,
        };
        match addr {
            Some(raw) => Self { storage: raw as u64 },
            None => Self { storage: NULL_REF_MASK },
        }
    }

    /// The word reinterpreted as an `i32`.
    #[must_use]
    pub const fn to_i32(self) -> i32 {
        self.storage as u32 as i32
    }

    /// The word reinterpreted as a `u32`.
    #[must_use]
    pub const fn to_u32(self) -> u32 {
        self.storage as u32
    }

    /// The word reinterpreted as an `i64`.
    #[must_use]
    pub const fn to_i64(self) -> i64 {
        self.storage as i64
    }

    /// The word reinterpreted as a `u64`.
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        self.storage
    }

    /// The word reinterpreted as an `f32`.
    #[must_use]
    pub fn to_f32(self) -> f32 {
        f32::from_bits(self.storage as u32)
    }

    /// The word reinterpreted as an `f64`.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.storage)
    }

    /// Whether the word encodes a null reference.
    ///
    /// Only meaningful for slots whose static type is a reference type.
    #[must_use]
    pub const fn is_null_ref(self) -> bool {
        self.storage & NULL_REF_MASK != 0
    }

    /// The word reinterpreted as a reference of the given type.
    #[must_use]
    pub const fn to_ref(self, ty: RefType) -> Ref {
        if self.is_null_ref() {
            return Ref::null(ty);
        }
        let raw = self.storage as u32;
        match ty {
            RefType::Func => Ref::Func(Some(FuncAddr(raw))),
            RefType::Extern => Ref::Extern(Some(ExternAddr(raw))),
        }
    }

    /// Memory/table address operand view: always evaluated as unsigned, and
    /// the high half of an `i32` slot is zero by construction.
    #[must_use]
    pub const fn as_address_offset(self) -> u64 {
        self.storage
    }

    /// Reinterprets the word as a tagged value of the given static type.
    #[must_use]
    pub fn to_value(self, ty: ValueType) -> Value {
        match ty {
            ValueType::I32 => Value::I32(self.to_i32()),
            ValueType::I64 => Value::I64(self.to_i64()),
            ValueType::F32 => Value::F32(FloatBits32(self.to_u32())),
            ValueType::F64 => Value::F64(FloatBits64(self.to_u64())),
            ValueType::FuncRef => Value::from(self.to_ref(RefType::Func)),
            ValueType::ExternRef => Value::from(self.to_ref(RefType::Extern)),
        }
    }
}

impl From<Value> for UntypedValue {
    fn from(value: Value) -> Self {
        match value {
            Value::I32(v) => Self::from_i32(v),
            Value::I64(v) => Self::from_i64(v),
            Value::F32(bits) => Self::from_u32(bits.0),
            Value::F64(bits) => Self::from_u64(bits.0),
            Value::FuncRef(addr) => Self::from_ref(Ref::Func(addr)),
            Value::ExternRef(addr) => Self::from_ref(Ref::Extern(addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn null_references_round_trip() {
        for ty in [RefType::Func, RefType::Extern] {
            let word = UntypedValue::from_ref(Ref::null(ty));
            assert!(word.is_null_ref());
            assert_eq!(word.to_ref(ty), Ref::null(ty));
        }
    }

    #[test]
    fn zero_word_is_not_a_null_ref() {
        // Fresh locals are zero words; address 0 is a valid function.
        let word = UntypedValue::ZERO;
        assert!(!word.is_null_ref());
        assert_eq!(word.to_ref(RefType::Func), Ref::Func(Some(FuncAddr(0))));
    }

    proptest! {
        #[test]
        fn i32_round_trips(value: i32) {
            let word = UntypedValue::from_i32(value);
            prop_assert_eq!(word.to_i32(), value);
            prop_assert_eq!(word.to_value(ValueType::I32), Value::I32(value));
        }

        #[test]
        fn i64_round_trips(value: i64) {
            let word = UntypedValue::from_i64(value);
            prop_assert_eq!(word.to_value(ValueType::I64), Value::I64(value));
        }

        #[test]
        fn f32_bits_round_trip(bits: u32) {
            let value = Value::F32(FloatBits32(bits));
            let word = UntypedValue::from(value);
            prop_assert_eq!(word.to_value(ValueType::F32), value);
        }

        #[test]
        fn f64_bits_round_trip(bits: u64) {
            let value = Value::F64(FloatBits64(bits));
            let word = UntypedValue::from(value);
            prop_assert_eq!(word.to_value(ValueType::F64), value);
        }

        #[test]
        fn refs_round_trip(raw in proptest::option::of(any::<u32>())) {
            let value = Value::FuncRef(raw.map(FuncAddr));
            let word = UntypedValue::from(value);
            prop_assert_eq!(word.to_value(ValueType::FuncRef), value);
        }

        #[test]
        fn untyped_round_trip_matches_spec(value in any_value()) {
            let word = UntypedValue::from(value);
            prop_assert_eq!(word.to_value(value.ty()), value);
        }
    }

    fn any_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i32>().prop_map(Value::I32),
            any::<i64>().prop_map(Value::I64),
            any::<u32>().prop_map(|bits| Value::F32(FloatBits32(bits))),
            any::<u64>().prop_map(|bits| Value::F64(FloatBits64(bits))),
            proptest::option::of(any::<u32>()).prop_map(|a| Value::FuncRef(a.map(FuncAddr))),
            proptest::option::of(any::<u32>()).prop_map(|a| Value::ExternRef(a.map(ExternAddr))),
        ]
    }
}
