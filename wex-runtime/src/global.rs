// SPDX-License-Identifier: MIT

//! Global variable instances.

use wex_error::{kinds::RuntimeError, Error, Result};
use wex_foundation::{GlobalType, UntypedValue, Value};

/// A global variable instance.
#[derive(Debug)]
pub struct GlobalInstance {
    ty: GlobalType,
    value: UntypedValue,
}

impl GlobalInstance {
    /// A global holding `value`.
    #[must_use]
    pub fn new(ty: GlobalType, value: UntypedValue) -> Self {
        Self { ty, value }
    }

    /// The global's type.
    #[must_use]
    pub const fn ty(&self) -> GlobalType {
        self.ty
    }

    /// The current value as a raw word.
    #[must_use]
    pub const fn get_untyped(&self) -> UntypedValue {
        self.value
    }

    /// The current value, tagged with the global's static type.
    #[must_use]
    pub fn get(&self) -> Value {
        self.value.to_value(self.ty.value_type)
    }

    /// Overwrites the value. Translated `global.set` code only targets
    /// mutable globals, so this skips the mutability check.
    pub(crate) fn set_untyped(&mut self, value: UntypedValue) {
        self.value = value;
    }

    /// API-level write: checks mutability and the value's type.
    pub fn set(&mut self, value: Value) -> Result<()> {
        if !self.ty.mutable {
            return Err(Error::Runtime(RuntimeError::InvalidAddress));
        }
        if value.ty() != self.ty.value_type {
            return Err(Error::Runtime(RuntimeError::ArgumentTypeMismatch {
                index: 0,
                expected: self.ty.value_type.name(),
            }));
        }
        self.value = value.into();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use wex_foundation::ValueType;

    use super::*;

    #[test]
    fn immutable_globals_reject_api_writes() {
        let mut global = GlobalInstance::new(
            GlobalType::immutable(ValueType::I32),
            UntypedValue::from_i32(5),
        );
        assert_eq!(global.get(), Value::I32(5));
        assert!(global.set(Value::I32(6)).is_err());
        assert_eq!(global.get(), Value::I32(5));
    }

    #[test]
    fn typed_writes_are_checked() {
        let mut global = GlobalInstance::new(
            GlobalType::mutable(ValueType::I64),
            UntypedValue::ZERO,
        );
        assert!(global.set(Value::I32(1)).is_err());
        global.set(Value::I64(9)).unwrap();
        assert_eq!(global.get(), Value::I64(9));
    }
}
