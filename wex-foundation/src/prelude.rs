// SPDX-License-Identifier: MIT

//! Prelude module for wex-foundation.
//!
//! Re-exports the types most modules of the engine need, so downstream
//! crates can `use wex_foundation::prelude::*` and get a consistent set of
//! imports.

pub use core::{
    fmt,
    fmt::{Debug, Display},
};

pub use wex_error::{Error, Result};

pub use crate::{
    float_repr::{FloatBits32, FloatBits64},
    types::{
        DataAddr, DataIdx, ElemAddr, ElemIdx, ExternAddr, FuncAddr, FuncIdx, FuncType, GlobalAddr,
        GlobalIdx, GlobalType, InstanceAddr, LabelIdx, Limits, LocalIdx, MemAddr, MemIdx,
        MemoryType, RefType, TableAddr, TableIdx, TableType, TypeIdx, ValueType,
    },
    values::{Ref, UntypedValue, Value},
    PAGE_SIZE,
};
