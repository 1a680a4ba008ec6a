// SPDX-License-Identifier: MIT

//! Translator, store and interpreter for the WEX WebAssembly execution
//! engine.
//!
//! The crate is organized along the lifecycle of a module:
//!
//! - [`module`] holds the immutable compiled form and the builder that
//!   assembles it from structured [`instructions`].
//! - [`translator`] lowers structured bodies to the flat executable form,
//!   lazily and cached per function.
//! - [`store`] owns all runtime state; [`instance`] wires a module into it
//!   by resolving imports, allocating definitions and applying segments.
//! - [`engine`] is the interpreter loop over the [`stack`], with numeric
//!   semantics delegated to `wex-math`.
//!
//! Decoding binaries and validating them is out of scope: bodies arriving
//! through [`module::ModuleBuilder`] are assumed validated, and the
//! translator checks only what it needs for its own soundness.

#![deny(missing_docs)]

mod engine;

pub mod func;
pub mod global;
pub mod instance;
pub mod instructions;
pub mod memory;
pub mod module;
pub mod prelude;
pub mod stack;
pub mod store;
pub mod table;
pub mod translator;

pub use func::FunctionInstance;
pub use global::GlobalInstance;
pub use instance::{instantiate, ExternalValue, Imports, ModuleInstance};
pub use instructions::{BinOp, BlockType, Instr, LoadOp, MemArg, StoreOp, UnOp};
pub use memory::MemoryInstance;
pub use module::{
    ConstExpr, DataMode, DataSegment, ElementMode, ElementSegment, ExportKind, ExternType, Module,
    ModuleBuilder,
};
pub use stack::EngineConfig;
pub use store::{Caller, Store};
pub use table::{DataInstance, ElementInstance, TableInstance};
