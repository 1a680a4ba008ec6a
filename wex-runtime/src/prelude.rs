// SPDX-License-Identifier: MIT

//! Prelude module for wex-runtime.

pub use wex_error::{Error, Result};
pub use wex_foundation::prelude::*;

pub use crate::{
    instance::{instantiate, ExternalValue, Imports, ModuleInstance},
    instructions::{BinOp, BlockType, Instr, LoadOp, MemArg, StoreOp, UnOp},
    module::{
        ConstExpr, DataMode, DataSegment, ElementMode, ElementSegment, ExportKind, ExternType,
        Module, ModuleBuilder,
    },
    stack::EngineConfig,
    store::{Caller, Store},
};
