// SPDX-License-Identifier: MIT

//! Compiled-module representation.
//!
//! A [`Module`] is immutable and shareable: it owns the type, import,
//! function, table, memory, global, export and segment declarations, plus
//! the structured bodies of its own functions. It holds no runtime state;
//! instantiating it allocates that state in a store. Function bodies are
//! translated to the flat executable form on first call and the result is
//! cached on the [`GuestFunction`], so a module instantiated many times
//! translates each body once.
//!
//! Modules are assembled through [`ModuleBuilder`], the programmatic
//! equivalent of a binary decoder.

use std::sync::{Arc, OnceLock};

use wex_error::{kinds::InstantiationError, Error, Result};
use wex_foundation::{
    DataIdx, ElemIdx, FloatBits32, FloatBits64, FuncIdx, FuncType, GlobalIdx, GlobalType, MemIdx,
    MemoryType, Ref, TableIdx, TableType, TypeIdx, Value, ValueType,
};

use crate::instructions::Instr;
use crate::translator::InstructionSequence;

/// A constant initializer expression.
///
/// Used for global initializers, active segment offsets and element
/// segment items. `GlobalGet` may only name an imported global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstExpr {
    /// An `i32` literal.
    I32(i32),
    /// An `i64` literal.
    I64(i64),
    /// An `f32` literal.
    F32(FloatBits32),
    /// An `f64` literal.
    F64(FloatBits64),
    /// A null reference of the given type.
    RefNull(wex_foundation::RefType),
    /// A reference to a function of the instantiating module.
    RefFunc(FuncIdx),
    /// The value of an imported global.
    GlobalGet(GlobalIdx),
}

impl ConstExpr {
    /// Evaluates the expression given resolvers for the two non-literal
    /// cases.
    pub(crate) fn eval(
        self,
        global: impl FnOnce(GlobalIdx) -> Result<Value>,
        func_ref: impl FnOnce(FuncIdx) -> Result<Ref>,
    ) -> Result<Value> {
        match self {
            Self::I32(v) => Ok(Value::I32(v)),
            Self::I64(v) => Ok(Value::I64(v)),
            Self::F32(v) => Ok(Value::F32(v)),
            Self::F64(v) => Ok(Value::F64(v)),
            Self::RefNull(ty) => Ok(Value::from(Ref::null(ty))),
            Self::RefFunc(idx) => func_ref(idx).map(Value::from),
            Self::GlobalGet(idx) => global(idx),
        }
    }
}

/// The kind of entity an import requests or an export exposes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternType {
    /// A function with the given signature.
    Func(FuncType),
    /// A table of the given type.
    Table(TableType),
    /// A memory of the given type.
    Memory(MemoryType),
    /// A global of the given type.
    Global(GlobalType),
}

impl ExternType {
    /// A short noun for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Func(_) => "function",
            Self::Table(_) => "table",
            Self::Memory(_) => "memory",
            Self::Global(_) => "global",
        }
    }
}

/// A single import declaration.
#[derive(Debug, Clone)]
pub struct Import {
    /// The module namespace the import is resolved in.
    pub module: String,
    /// The item name within the namespace.
    pub name: String,
    /// The declared type the supplied entity must match.
    pub ty: ExternType,
}

/// What an export points at, by module index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Function index space.
    Func(FuncIdx),
    /// Table index space.
    Table(TableIdx),
    /// Memory index space.
    Memory(MemIdx),
    /// Global index space.
    Global(GlobalIdx),
}

/// A single export declaration.
#[derive(Debug, Clone)]
pub struct Export {
    /// The exported name.
    pub name: String,
    /// The exported entity.
    pub kind: ExportKind,
}

/// A module-defined global: its type and initializer.
#[derive(Debug, Clone)]
pub struct GlobalDef {
    /// The global's type.
    pub ty: GlobalType,
    /// The initializer, evaluated at instantiation.
    pub init: ConstExpr,
}

/// How an element segment is applied at instantiation.
#[derive(Debug, Clone)]
pub enum ElementMode {
    /// Written into a table at instantiation, then dropped.
    Active {
        /// The target table.
        table: TableIdx,
        /// The start offset within the table.
        offset: ConstExpr,
    },
    /// Kept in the store for later `table.init`.
    Passive,
    /// Only usable via `ref.func`; dropped immediately.
    Declared,
}

/// An element segment: a list of constant reference expressions.
#[derive(Debug, Clone)]
pub struct ElementSegment {
    /// The reference type of all items.
    pub ty: wex_foundation::RefType,
    /// The item initializers.
    pub items: Box<[ConstExpr]>,
    /// Active, passive or declared.
    pub mode: ElementMode,
}

/// How a data segment is applied at instantiation.
#[derive(Debug, Clone)]
pub enum DataMode {
    /// Copied into a memory at instantiation, then dropped.
    Active {
        /// The target memory.
        memory: MemIdx,
        /// The start offset within the memory.
        offset: ConstExpr,
    },
    /// Kept in the store for later `memory.init`.
    Passive,
}

/// A data segment: raw bytes plus their application mode.
#[derive(Debug, Clone)]
pub struct DataSegment {
    /// The segment bytes.
    pub bytes: Box<[u8]>,
    /// Active or passive.
    pub mode: DataMode,
}

/// A function defined by the module itself.
#[derive(Debug)]
pub struct GuestFunction {
    /// Index of the signature in the module's type section.
    pub type_idx: TypeIdx,
    /// Declared (non-parameter) locals.
    pub locals: Box<[ValueType]>,
    /// The structured body, terminated by `End`.
    pub body: Box<[Instr]>,
    compiled: OnceLock<Arc<InstructionSequence>>,
}

impl GuestFunction {
    /// Returns the flat body, translating it on first use.
    pub(crate) fn compiled(
        &self,
        module: &Module,
        func_idx: FuncIdx,
    ) -> Result<Arc<InstructionSequence>> {
        if let Some(iseq) = self.compiled.get() {
            return Ok(iseq.clone());
        }
        let translated = Arc::new(crate::translator::translate(module, func_idx, self)?);
        // A racing translation produced an identical sequence; first in wins.
        Ok(self.compiled.get_or_init(|| translated).clone())
    }
}

/// An immutable, instantiable module.
#[derive(Debug)]
pub struct Module {
    pub(crate) name: Option<String>,
    pub(crate) types: Box<[FuncType]>,
    pub(crate) imports: Box<[Import]>,
    pub(crate) funcs: Box<[GuestFunction]>,
    pub(crate) func_types: Box<[TypeIdx]>,
    pub(crate) tables: Box<[TableType]>,
    pub(crate) memories: Box<[MemoryType]>,
    pub(crate) globals: Box<[GlobalDef]>,
    pub(crate) exports: Box<[Export]>,
    pub(crate) elements: Box<[ElementSegment]>,
    pub(crate) datas: Box<[DataSegment]>,
    pub(crate) start: Option<FuncIdx>,
    pub(crate) num_imported_funcs: u32,
    pub(crate) num_imported_tables: u32,
    pub(crate) num_imported_memories: u32,
    pub(crate) num_imported_globals: u32,
}

impl Module {
    /// The module's debug name, if one was set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The module's declared types.
    #[must_use]
    pub fn types(&self) -> &[FuncType] {
        &self.types
    }

    /// The module's import declarations, in declaration order.
    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// The module's export declarations.
    #[must_use]
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// The start function, if declared.
    #[must_use]
    pub const fn start(&self) -> Option<FuncIdx> {
        self.start
    }

    /// The signature of the function at `func_idx` in the function index
    /// space (imports first).
    pub(crate) fn func_type(&self, func_idx: FuncIdx) -> Option<&FuncType> {
        let type_idx = if func_idx < self.num_imported_funcs {
            let mut seen = 0;
            let mut found = None;
            for import in self.imports.iter() {
                if let ExternType::Func(ty) = &import.ty {
                    if seen == func_idx {
                        found = Some(ty);
                        break;
                    }
                    seen += 1;
                }
            }
            return found;
        } else {
            let internal = (func_idx - self.num_imported_funcs) as usize;
            *self.func_types.get(internal)?
        };
        self.types.get(type_idx as usize)
    }

    /// The type of the global at `index` in the global index space
    /// (imports first).
    pub(crate) fn global_type(&self, index: GlobalIdx) -> Option<&GlobalType> {
        if index < self.num_imported_globals {
            let mut seen = 0;
            for import in self.imports.iter() {
                if let ExternType::Global(ty) = &import.ty {
                    if seen == index {
                        return Some(ty);
                    }
                    seen += 1;
                }
            }
            return None;
        }
        let internal = (index - self.num_imported_globals) as usize;
        self.globals.get(internal).map(|def| &def.ty)
    }

    /// The guest function at `func_idx`, if that index names an internal
    /// (non-imported) function.
    pub(crate) fn guest_func(&self, func_idx: FuncIdx) -> Option<&GuestFunction> {
        let internal = func_idx.checked_sub(self.num_imported_funcs)?;
        self.funcs.get(internal as usize)
    }
}

/// Builds a [`Module`] declaration by declaration.
///
/// Sections can be filled in any order; `finish` performs the cheap
/// cross-reference checks (type indices in range, single memory) that a
/// decoder's validator would otherwise guarantee.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    name: Option<String>,
    types: Vec<FuncType>,
    imports: Vec<Import>,
    funcs: Vec<GuestFunction>,
    func_types: Vec<TypeIdx>,
    tables: Vec<TableType>,
    memories: Vec<MemoryType>,
    globals: Vec<GlobalDef>,
    exports: Vec<Export>,
    elements: Vec<ElementSegment>,
    datas: Vec<DataSegment>,
    start: Option<FuncIdx>,
}

impl ModuleBuilder {
    /// A fresh, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a function type, returning its type index.
    pub fn push_type(&mut self, ty: FuncType) -> TypeIdx {
        self.types.push(ty);
        (self.types.len() - 1) as TypeIdx
    }

    /// Declares an import. Imports occupy the low indices of their
    /// respective index space, so all imports of a kind must be declared
    /// before definitions of that kind.
    pub fn push_import(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        ty: ExternType,
    ) {
        self.imports.push(Import { module: module.into(), name: name.into(), ty });
    }

    /// Defines a function, returning its index in the function index space.
    pub fn push_function(
        &mut self,
        type_idx: TypeIdx,
        locals: impl Into<Box<[ValueType]>>,
        body: impl Into<Box<[Instr]>>,
    ) -> FuncIdx {
        self.funcs.push(GuestFunction {
            type_idx,
            locals: locals.into(),
            body: body.into(),
            compiled: OnceLock::new(),
        });
        self.func_types.push(type_idx);
        self.num_imported(|ty| matches!(ty, ExternType::Func(_))) + (self.funcs.len() - 1) as u32
    }

    /// Defines a table, returning its index.
    pub fn push_table(&mut self, ty: TableType) -> TableIdx {
        self.tables.push(ty);
        self.num_imported(|t| matches!(t, ExternType::Table(_))) + (self.tables.len() - 1) as u32
    }

    /// Defines a memory, returning its index.
    pub fn push_memory(&mut self, ty: MemoryType) -> MemIdx {
        self.memories.push(ty);
        self.num_imported(|t| matches!(t, ExternType::Memory(_))) + (self.memories.len() - 1) as u32
    }

    /// Defines a global, returning its index.
    pub fn push_global(&mut self, ty: GlobalType, init: ConstExpr) -> GlobalIdx {
        self.globals.push(GlobalDef { ty, init });
        self.num_imported(|t| matches!(t, ExternType::Global(_))) + (self.globals.len() - 1) as u32
    }

    /// Declares an export.
    pub fn push_export(&mut self, name: impl Into<String>, kind: ExportKind) {
        self.exports.push(Export { name: name.into(), kind });
    }

    /// Declares an element segment, returning its index.
    pub fn push_element(&mut self, segment: ElementSegment) -> ElemIdx {
        self.elements.push(segment);
        (self.elements.len() - 1) as ElemIdx
    }

    /// Declares a data segment, returning its index.
    pub fn push_data(&mut self, segment: DataSegment) -> DataIdx {
        self.datas.push(segment);
        (self.datas.len() - 1) as DataIdx
    }

    /// Sets the start function.
    pub fn set_start(&mut self, func: FuncIdx) {
        self.start = Some(func);
    }

    /// Attaches a debug name to the module. Only used in diagnostics.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    fn num_imported(&self, pred: impl Fn(&ExternType) -> bool) -> u32 {
        self.imports.iter().filter(|import| pred(&import.ty)).count() as u32
    }

    /// Finishes the module.
    pub fn finish(self) -> Result<Arc<Module>> {
        for type_idx in &self.func_types {
            if *type_idx as usize >= self.types.len() {
                return Err(Error::Instantiation(InstantiationError::Unsupported(
                    "function type index out of range",
                )));
            }
        }
        let num_imported_memories = self.num_imported(|t| matches!(t, ExternType::Memory(_)));
        if num_imported_memories as usize + self.memories.len() > 1 {
            return Err(Error::Instantiation(InstantiationError::Unsupported(
                "multiple memories",
            )));
        }
        Ok(Arc::new(Module {
            num_imported_funcs: self.num_imported(|t| matches!(t, ExternType::Func(_))),
            num_imported_tables: self.num_imported(|t| matches!(t, ExternType::Table(_))),
            num_imported_memories,
            num_imported_globals: self.num_imported(|t| matches!(t, ExternType::Global(_))),
            name: self.name,
            types: self.types.into(),
            imports: self.imports.into(),
            funcs: self.funcs.into(),
            func_types: self.func_types.into(),
            tables: self.tables.into(),
            memories: self.memories.into(),
            globals: self.globals.into(),
            exports: self.exports.into(),
            elements: self.elements.into(),
            datas: self.datas.into(),
            start: self.start,
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use wex_foundation::ValueType;

    use super::*;

    #[test]
    fn function_indices_account_for_imports() {
        let mut builder = ModuleBuilder::new();
        let ty = builder.push_type(FuncType::new([], []));
        builder.push_import("env", "f", ExternType::Func(FuncType::new([], [])));
        let idx = builder.push_function(ty, [], [Instr::End]);
        assert_eq!(idx, 1);
        let module = builder.finish().unwrap();
        assert_eq!(module.num_imported_funcs, 1);
        assert!(module.guest_func(0).is_none());
        assert!(module.guest_func(1).is_some());
        assert_eq!(module.func_type(0), Some(&FuncType::new([], [])));
    }

    #[test]
    fn multiple_memories_are_rejected() {
        let mut builder = ModuleBuilder::new();
        builder.push_memory(MemoryType::new(1, None));
        builder.push_memory(MemoryType::new(1, None));
        assert!(builder.finish().is_err());
    }

    #[test]
    fn const_expr_literals_evaluate() {
        let expr = ConstExpr::I32(42);
        let value = expr
            .eval(|_| unreachable!(), |_| unreachable!())
            .unwrap();
        assert_eq!(value, Value::I32(42));
        let null = ConstExpr::RefNull(wex_foundation::RefType::Func)
            .eval(|_| unreachable!(), |_| unreachable!())
            .unwrap();
        assert_eq!(null, Value::FuncRef(None));
    }

    #[test]
    fn out_of_range_type_index_is_rejected() {
        let mut builder = ModuleBuilder::new();
        builder.push_function(3, [], [Instr::End]);
        assert!(builder.finish().is_err());
    }
}
