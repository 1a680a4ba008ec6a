// SPDX-License-Identifier: MIT

//! WEX: a WebAssembly execution engine.
//!
//! This facade crate re-exports the public surface of the engine:
//!
//! - `wex-foundation`: value and entity types,
//! - `wex-error`: the error taxonomy, traps included,
//! - `wex-runtime`: modules, stores, instantiation and execution,
//! - `wex-math`: the numeric instruction semantics.
//!
//! A minimal session builds a module, instantiates it and invokes an
//! export:
//!
//! ```
//! use wex::prelude::*;
//!
//! let mut builder = ModuleBuilder::new();
//! let ty = builder.push_type(FuncType::new([ValueType::I32], [ValueType::I32]));
//! let func = builder.push_function(
//!     ty,
//!     [],
//!     [
//!         Instr::LocalGet(0),
//!         Instr::I32Const(1),
//!         Instr::BinOp(BinOp::I32Add),
//!         Instr::End,
//!     ],
//! );
//! builder.push_export("inc", ExportKind::Func(func));
//! let module = builder.finish().unwrap();
//!
//! let mut store = Store::new();
//! let instance = instantiate(&mut store, &module, &Imports::new()).unwrap();
//! let inc = store.instance(instance).unwrap().exported_func("inc").unwrap();
//! let results = store.invoke(inc, &[Value::I32(41)]).unwrap();
//! assert_eq!(results, vec![Value::I32(42)]);
//! ```

#![deny(missing_docs)]

pub use wex_error::{kinds, Error, ErrorCategory, Result};
pub use wex_foundation::{
    FloatBits32, FloatBits64, FuncAddr, FuncType, GlobalType, InstanceAddr, Limits, MemoryType,
    Ref, RefType, TableType, UntypedValue, Value, ValueType, PAGE_SIZE,
};
pub use wex_runtime::{
    instantiate, BinOp, BlockType, Caller, ConstExpr, DataMode, DataSegment, ElementMode,
    ElementSegment, EngineConfig, ExportKind, ExternType, ExternalValue, Imports, Instr, LoadOp,
    MemArg, Module, ModuleBuilder, ModuleInstance, Store, StoreOp, UnOp,
};

pub mod prelude {
    //! One-stop imports for embedders.

    pub use wex_error::{Error, Result};
    pub use wex_foundation::prelude::*;
    pub use wex_runtime::prelude::*;
}
