// SPDX-License-Identifier: MIT

//! Core types for the WEX WebAssembly execution engine.
//!
//! This crate holds everything the runtime and the external decoders share:
//! value and reference types, function/memory/table/global types with their
//! limits, the tagged host-facing [`Value`] and its compact untagged runtime
//! encoding [`UntypedValue`], and the index/address newtypes that keep the
//! module index spaces and store address spaces from mixing.

#![deny(missing_docs)]

pub mod float_repr;
pub mod prelude;
pub mod types;
pub mod values;

pub use float_repr::{FloatBits32, FloatBits64};
pub use types::{
    DataAddr, DataIdx, ElemAddr, ElemIdx, ExternAddr, FuncAddr, FuncIdx, FuncType, GlobalAddr,
    GlobalIdx, GlobalType, InstanceAddr, LabelIdx, Limits, LocalIdx, MemAddr, MemIdx, MemoryType,
    RefType, TableAddr, TableIdx, TableType, TypeIdx, ValueType,
};
pub use values::{Ref, UntypedValue, Value};

/// The WebAssembly linear memory page size (64 KiB).
pub const PAGE_SIZE: usize = 65536;
