// SPDX-License-Identifier: MIT

//! Static types: value types, function signatures, limits and the
//! entity-type descriptors for memories, tables and globals.
//!
//! Index types (`FuncIdx`, …) name positions inside a module's index spaces
//! (imports first, then internal definitions). Address types (`FuncAddr`, …)
//! name store-allocated runtime objects and are only ever minted by a store.

use core::fmt;

use crate::values::Value;

/// Index into the type section of a module.
pub type TypeIdx = u32;
/// Index into the function index space of a module.
pub type FuncIdx = u32;
/// Index into the table index space of a module.
pub type TableIdx = u32;
/// Index into the memory index space of a module.
pub type MemIdx = u32;
/// Index into the global index space of a module.
pub type GlobalIdx = u32;
/// Index into the element segment space of a module.
pub type ElemIdx = u32;
/// Index into the data segment space of a module.
pub type DataIdx = u32;
/// Index of a local (parameter or declared local) within a function.
pub type LocalIdx = u32;
/// Relative depth of a branch target label.
pub type LabelIdx = u32;

macro_rules! store_address {
    ($(#[$doc:meta] $name:ident),* $(,)?) => {
        $(
            #[$doc]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);

            impl $name {
                /// The raw arena index of this address.
                #[must_use]
                pub const fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

store_address! {
    /// Store address of a function instance.
    FuncAddr,
    /// Store address of a table instance.
    TableAddr,
    /// Store address of a memory instance.
    MemAddr,
    /// Store address of a global instance.
    GlobalAddr,
    /// Store address of an element segment instance.
    ElemAddr,
    /// Store address of a data segment instance.
    DataAddr,
    /// Store address of a module instance.
    InstanceAddr,
    /// Opaque address of a host-provided extern reference.
    ExternAddr,
}

/// The value types of core WebAssembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// Nullable function reference.
    FuncRef,
    /// Nullable external (host) reference.
    ExternRef,
}

impl ValueType {
    /// The zero/null value used to initialize locals, globals and tables.
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::F32 => Value::F32(crate::FloatBits32(0)),
            Self::F64 => Value::F64(crate::FloatBits64(0)),
            Self::FuncRef => Value::FuncRef(None),
            Self::ExternRef => Value::ExternRef(None),
        }
    }

    /// Whether this is one of the numeric types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::F32 | Self::F64)
    }

    /// Whether this is one of the reference types.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::FuncRef | Self::ExternRef)
    }

    /// The lowercase wat-style name of this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::FuncRef => "funcref",
            Self::ExternRef => "externref",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The reference types of core WebAssembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// Reference to a function.
    Func,
    /// Reference to a host object.
    Extern,
}

impl RefType {
    /// The corresponding value type.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Func => ValueType::FuncRef,
            Self::Extern => ValueType::ExternRef,
        }
    }
}

impl From<RefType> for ValueType {
    fn from(ty: RefType) -> Self {
        ty.value_type()
    }
}

/// A function signature: parameter and result type sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    params: Box<[ValueType]>,
    results: Box<[ValueType]>,
}

impl FuncType {
    /// Builds a signature from parameter and result types.
    pub fn new(
        params: impl IntoIterator<Item = ValueType>,
        results: impl IntoIterator<Item = ValueType>,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// The parameter types.
    #[must_use]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// The result types.
    #[must_use]
    pub fn results(&self) -> &[ValueType] {
        &self.results
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(func")?;
        if !self.params.is_empty() {
            f.write_str(" (param")?;
            for param in self.params.iter() {
                write!(f, " {param}")?;
            }
            f.write_str(")")?;
        }
        if !self.results.is_empty() {
            f.write_str(" (result")?;
            for result in self.results.iter() {
                write!(f, " {result}")?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")
    }
}

/// Size limits of a memory (in pages) or table (in elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
    /// Minimum size. Allocated eagerly at instantiation.
    pub min: u64,
    /// Optional maximum size; growth beyond it fails.
    pub max: Option<u64>,
}

impl Limits {
    /// Limits with only a minimum.
    #[must_use]
    pub const fn at_least(min: u64) -> Self {
        Self { min, max: None }
    }

    /// Limits with a minimum and maximum.
    #[must_use]
    pub const fn bounded(min: u64, max: u64) -> Self {
        Self { min, max: Some(max) }
    }

    /// Import-compatibility check: the supplied limits must guarantee at
    /// least as much as declared (`min` no smaller) and promise no more
    /// (`max` no larger, and present whenever the declaration has one).
    #[must_use]
    pub fn is_subtype_of(&self, declared: &Self) -> bool {
        if self.min < declared.min {
            return false;
        }
        match (self.max, declared.max) {
            (_, None) => true,
            (Some(supplied), Some(required)) => supplied <= required,
            (None, Some(_)) => false,
        }
    }
}

/// The type of a linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryType {
    /// Page-count limits.
    pub limits: Limits,
    /// Whether the memory uses 64-bit addressing.
    pub is_64: bool,
    /// Whether the memory is shared between threads.
    pub shared: bool,
}

impl MemoryType {
    /// A plain 32-bit, unshared memory with the given page limits.
    #[must_use]
    pub const fn new(min: u64, max: Option<u64>) -> Self {
        Self { limits: Limits { min, max }, is_64: false, shared: false }
    }

    /// Import-compatibility check against a declared memory type.
    #[must_use]
    pub fn is_subtype_of(&self, declared: &Self) -> bool {
        self.is_64 == declared.is_64
            && self.shared == declared.shared
            && self.limits.is_subtype_of(&declared.limits)
    }
}

/// The type of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    /// The element reference type.
    pub element: RefType,
    /// Element-count limits.
    pub limits: Limits,
}

impl TableType {
    /// A table of the given element type and limits.
    #[must_use]
    pub const fn new(element: RefType, min: u64, max: Option<u64>) -> Self {
        Self { element, limits: Limits { min, max } }
    }

    /// Import-compatibility check against a declared table type.
    #[must_use]
    pub fn is_subtype_of(&self, declared: &Self) -> bool {
        self.element == declared.element && self.limits.is_subtype_of(&declared.limits)
    }
}

/// The type of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    /// The type of the stored value.
    pub value_type: ValueType,
    /// Whether `global.set` is permitted.
    pub mutable: bool,
}

impl GlobalType {
    /// An immutable global of the given type.
    #[must_use]
    pub const fn immutable(value_type: ValueType) -> Self {
        Self { value_type, mutable: false }
    }

    /// A mutable global of the given type.
    #[must_use]
    pub const fn mutable(value_type: ValueType) -> Self {
        Self { value_type, mutable: true }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn limits_subtyping() {
        let declared = Limits::bounded(1, 4);
        assert!(Limits::bounded(1, 4).is_subtype_of(&declared));
        assert!(Limits::bounded(2, 3).is_subtype_of(&declared));
        assert!(!Limits::at_least(1).is_subtype_of(&declared));
        assert!(!Limits::bounded(0, 4).is_subtype_of(&declared));
        assert!(!Limits::bounded(1, 5).is_subtype_of(&declared));
        assert!(Limits::at_least(7).is_subtype_of(&Limits::at_least(3)));
    }

    #[test]
    fn func_type_display_is_wat_shaped() {
        let ty = FuncType::new([ValueType::I32, ValueType::I32], [ValueType::I64]);
        assert_eq!(ty.to_string(), "(func (param i32 i32) (result i64))");
        assert_eq!(FuncType::new([], []).to_string(), "(func)");
    }
}
