// SPDX-License-Identifier: MIT

//! Module instantiation.
//!
//! Instantiation resolves imports against their declared types, allocates
//! the module's own definitions in the store, applies element segments,
//! then data segments, and finally runs the start function. Failures
//! before the start function report `InstantiationError` or
//! `ImportError`; a trapping start function propagates its trap.
//!
//! Import subtype rules: function and global types must match exactly;
//! table and memory limits are compared with the supplied entity's
//! *current* size as its minimum, so a grown entity still satisfies an
//! import it originally matched.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use wex_error::{
    kinds::{ImportError, InstantiationError},
    Error, Result,
};
use wex_foundation::{
    DataAddr, ElemAddr, FuncAddr, FuncIdx, GlobalAddr, GlobalIdx, InstanceAddr, Limits, MemAddr,
    MemoryType, Ref, TableAddr, TableType, Value,
};

use crate::func::FunctionInstance;
use crate::global::GlobalInstance;
use crate::memory::MemoryInstance;
use crate::module::{
    ConstExpr, DataMode, ElementMode, ExportKind, ExternType, Module,
};
use crate::store::Store;
use crate::table::{DataInstance, ElementInstance, TableInstance};

/// A store-level entity, as supplied to or exported from an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalValue {
    /// A function.
    Func(FuncAddr),
    /// A table.
    Table(TableAddr),
    /// A memory.
    Memory(MemAddr),
    /// A global.
    Global(GlobalAddr),
}

/// The import set supplied to an instantiation, keyed by two-level name.
#[derive(Debug, Default)]
pub struct Imports {
    map: HashMap<(String, String), ExternalValue>,
}

impl Imports {
    /// An empty import set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies `value` under `module`/`name`, replacing any previous
    /// entry for that name.
    pub fn define(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        value: ExternalValue,
    ) -> &mut Self {
        self.map.insert((module.into(), name.into()), value);
        self
    }

    fn lookup(&self, module: &str, name: &str) -> Option<ExternalValue> {
        self.map.get(&(module.to_owned(), name.to_owned())).copied()
    }
}

/// An instantiated module: its store addresses and named exports.
#[derive(Debug)]
pub struct ModuleInstance {
    pub(crate) module: Arc<Module>,
    pub(crate) func_addrs: Box<[FuncAddr]>,
    pub(crate) table_addrs: Box<[TableAddr]>,
    pub(crate) mem_addrs: Box<[MemAddr]>,
    pub(crate) global_addrs: Box<[GlobalAddr]>,
    pub(crate) elem_addrs: Box<[ElemAddr]>,
    pub(crate) data_addrs: Box<[DataAddr]>,
    exports: HashMap<String, ExternalValue>,
}

impl ModuleInstance {
    /// The instantiated module.
    #[must_use]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Looks up an export by name.
    #[must_use]
    pub fn export(&self, name: &str) -> Option<ExternalValue> {
        self.exports.get(name).copied()
    }

    /// Looks up an exported function by name.
    pub fn exported_func(&self, name: &str) -> Result<FuncAddr> {
        match self.exports.get(name) {
            Some(ExternalValue::Func(addr)) => Ok(*addr),
            Some(_) => Err(Error::Runtime(wex_error::kinds::RuntimeError::NotAFunction {
                name: name.to_owned(),
            })),
            None => Err(Error::Runtime(wex_error::kinds::RuntimeError::ExportNotFound {
                name: name.to_owned(),
            })),
        }
    }
}

/// Instantiates `module` in `store` with the given imports.
pub fn instantiate(
    store: &mut Store,
    module: &Arc<Module>,
    imports: &Imports,
) -> Result<InstanceAddr> {
    let instance_addr = InstanceAddr(store.instances.len() as u32);
    debug!(
        "instantiating module {} as instance {instance_addr}",
        module.name().unwrap_or("<unnamed>"),
    );

    let mut builder = InstanceBuilder {
        store,
        module,
        instance_addr,
        func_addrs: Vec::new(),
        table_addrs: Vec::new(),
        mem_addrs: Vec::new(),
        global_addrs: Vec::new(),
    };
    builder.resolve_imports(imports)?;
    builder.allocate_definitions()?;
    let elem_addrs = builder.apply_element_segments()?;
    let data_addrs = builder.apply_data_segments()?;

    let mut exports = HashMap::new();
    for export in module.exports() {
        let value = match export.kind {
            ExportKind::Func(idx) => ExternalValue::Func(builder.func_addr(idx)?),
            ExportKind::Table(idx) => ExternalValue::Table(builder.table_addr(idx)?),
            ExportKind::Memory(idx) => ExternalValue::Memory(builder.mem_addr(idx)?),
            ExportKind::Global(idx) => ExternalValue::Global(builder.global_addr(idx)?),
        };
        exports.insert(export.name.clone(), value);
    }

    let start_addr = match module.start() {
        Some(func_idx) => Some(builder.func_addr(func_idx)?),
        None => None,
    };

    let instance = ModuleInstance {
        module: module.clone(),
        func_addrs: builder.func_addrs.into(),
        table_addrs: builder.table_addrs.into(),
        mem_addrs: builder.mem_addrs.into(),
        global_addrs: builder.global_addrs.into(),
        elem_addrs: elem_addrs.into(),
        data_addrs: data_addrs.into(),
        exports,
    };
    store.instances.push(instance);

    if let Some(start) = start_addr {
        debug!("running start function {start}");
        store.invoke(start, &[])?;
    }
    Ok(instance_addr)
}

struct InstanceBuilder<'a> {
    store: &'a mut Store,
    module: &'a Arc<Module>,
    instance_addr: InstanceAddr,
    func_addrs: Vec<FuncAddr>,
    table_addrs: Vec<TableAddr>,
    mem_addrs: Vec<MemAddr>,
    global_addrs: Vec<GlobalAddr>,
}

impl InstanceBuilder<'_> {
    fn resolve_imports(&mut self, imports: &Imports) -> Result<()> {
        for import in self.module.imports() {
            let supplied = imports.lookup(&import.module, &import.name).ok_or_else(|| {
                Error::Import(ImportError::UnknownImport {
                    module: import.module.clone(),
                    name: import.name.clone(),
                })
            })?;
            let mismatch = || {
                Error::Import(ImportError::IncompatibleImportType {
                    module: import.module.clone(),
                    name: import.name.clone(),
                })
            };
            match (&import.ty, supplied) {
                (ExternType::Func(declared), ExternalValue::Func(addr)) => {
                    if self.store.func(addr)?.ty() != declared {
                        return Err(mismatch());
                    }
                    self.func_addrs.push(addr);
                }
                (ExternType::Table(declared), ExternalValue::Table(addr)) => {
                    let table = self.store.table(addr)?;
                    let actual = TableType {
                        element: table.ty().element,
                        limits: Limits { min: table.size(), max: table.ty().limits.max },
                    };
                    if !actual.is_subtype_of(declared) {
                        return Err(mismatch());
                    }
                    self.table_addrs.push(addr);
                }
                (ExternType::Memory(declared), ExternalValue::Memory(addr)) => {
                    let memory = self.store.memory(addr)?;
                    let actual = MemoryType {
                        limits: Limits {
                            min: memory.size_pages(),
                            max: memory.ty().limits.max,
                        },
                        ..memory.ty()
                    };
                    if !actual.is_subtype_of(declared) {
                        return Err(mismatch());
                    }
                    self.mem_addrs.push(addr);
                }
                (ExternType::Global(declared), ExternalValue::Global(addr)) => {
                    if self.store.global(addr)?.ty() != *declared {
                        return Err(mismatch());
                    }
                    self.global_addrs.push(addr);
                }
                _ => return Err(mismatch()),
            }
        }
        Ok(())
    }

    fn allocate_definitions(&mut self) -> Result<()> {
        let module = self.module;
        for (internal, type_idx) in module.func_types.iter().enumerate() {
            let ty = module
                .types()
                .get(*type_idx as usize)
                .ok_or(Error::Instantiation(InstantiationError::Unsupported(
                    "function type index out of range",
                )))?
                .clone();
            let addr = self.store.alloc_func(FunctionInstance::Guest {
                ty,
                module: module.clone(),
                instance: self.instance_addr,
                func_idx: module.num_imported_funcs + internal as u32,
            });
            self.func_addrs.push(addr);
        }
        for table_ty in module.tables.iter() {
            self.store.tables.push(TableInstance::new(*table_ty));
            self.table_addrs.push(TableAddr((self.store.tables.len() - 1) as u32));
        }
        for memory_ty in module.memories.iter() {
            let memory = MemoryInstance::new(*memory_ty)?;
            self.store.memories.push(memory);
            self.mem_addrs.push(MemAddr((self.store.memories.len() - 1) as u32));
        }
        for global in module.globals.iter() {
            let value = self.eval_const(global.init)?;
            if value.ty() != global.ty.value_type {
                return Err(Error::Instantiation(InstantiationError::InvalidConstExpression));
            }
            self.store.globals.push(GlobalInstance::new(global.ty, value.into()));
            self.global_addrs.push(GlobalAddr((self.store.globals.len() - 1) as u32));
        }
        Ok(())
    }

    /// Evaluates a constant expression in the instantiation context.
    /// `global.get` may only reference imported globals.
    fn eval_const(&self, expr: ConstExpr) -> Result<Value> {
        let num_imported_globals = self.module.num_imported_globals;
        expr.eval(
            |idx: GlobalIdx| {
                if idx >= num_imported_globals {
                    return Err(Error::Instantiation(
                        InstantiationError::InvalidConstExpression,
                    ));
                }
                let addr = self.global_addrs.get(idx as usize).copied().ok_or(
                    Error::Instantiation(InstantiationError::InvalidConstExpression),
                )?;
                Ok(self.store.global(addr)?.get())
            },
            |idx: FuncIdx| {
                let addr = self.func_addrs.get(idx as usize).copied().ok_or(
                    Error::Instantiation(InstantiationError::InvalidConstExpression),
                )?;
                Ok(Ref::Func(Some(addr)))
            },
        )
    }

    fn const_offset(&self, expr: ConstExpr) -> Result<u64> {
        match self.eval_const(expr)? {
            Value::I32(v) => Ok(u64::from(v as u32)),
            _ => Err(Error::Instantiation(InstantiationError::InvalidConstExpression)),
        }
    }

    fn apply_element_segments(&mut self) -> Result<Vec<ElemAddr>> {
        let module = self.module.clone();
        let mut elem_addrs = Vec::with_capacity(module.elements.len());
        for segment in module.elements.iter() {
            let mut items = Vec::with_capacity(segment.items.len());
            for item in segment.items.iter() {
                match self.eval_const(*item)? {
                    Value::FuncRef(addr) if segment.ty == wex_foundation::RefType::Func => {
                        items.push(Ref::Func(addr));
                    }
                    Value::ExternRef(addr) if segment.ty == wex_foundation::RefType::Extern => {
                        items.push(Ref::Extern(addr));
                    }
                    _ => {
                        return Err(Error::Instantiation(
                            InstantiationError::InvalidConstExpression,
                        ))
                    }
                }
            }
            let addr = match &segment.mode {
                ElementMode::Active { table, offset } => {
                    let offset = self.const_offset(*offset)?;
                    let table_addr = self.table_addr(*table)?;
                    let table = self.store.table_mut(table_addr)?;
                    table
                        .init(offset, &items, 0, items.len() as u64)
                        .map_err(|_| {
                            Error::Instantiation(InstantiationError::OutOfBoundsTableAccess)
                        })?;
                    // Active segments are spent after application.
                    self.store
                        .alloc_element(ElementInstance::new(segment.ty, Box::new([])))
                }
                ElementMode::Passive => self
                    .store
                    .alloc_element(ElementInstance::new(segment.ty, items.into())),
                ElementMode::Declared => self
                    .store
                    .alloc_element(ElementInstance::new(segment.ty, Box::new([]))),
            };
            elem_addrs.push(addr);
        }
        Ok(elem_addrs)
    }

    fn apply_data_segments(&mut self) -> Result<Vec<DataAddr>> {
        let module = self.module.clone();
        let mut data_addrs = Vec::with_capacity(module.datas.len());
        for segment in module.datas.iter() {
            let addr = match &segment.mode {
                DataMode::Active { memory, offset } => {
                    let offset = self.const_offset(*offset)?;
                    let mem_addr = self.mem_addr(*memory)?;
                    let memory = self.store.memory_mut(mem_addr)?;
                    memory
                        .init(offset, &segment.bytes, 0, segment.bytes.len() as u64)
                        .map_err(|_| {
                            Error::Instantiation(InstantiationError::OutOfBoundsMemoryAccess)
                        })?;
                    self.store.alloc_data(DataInstance::new(Box::new([])))
                }
                DataMode::Passive => {
                    self.store.alloc_data(DataInstance::new(segment.bytes.clone()))
                }
            };
            data_addrs.push(addr);
        }
        Ok(data_addrs)
    }

    fn func_addr(&self, idx: FuncIdx) -> Result<FuncAddr> {
        self.func_addrs
            .get(idx as usize)
            .copied()
            .ok_or(Error::Instantiation(InstantiationError::Unsupported(
                "function index out of range",
            )))
    }

    fn table_addr(&self, idx: u32) -> Result<TableAddr> {
        self.table_addrs
            .get(idx as usize)
            .copied()
            .ok_or(Error::Instantiation(InstantiationError::Unsupported(
                "table index out of range",
            )))
    }

    fn mem_addr(&self, idx: u32) -> Result<MemAddr> {
        self.mem_addrs
            .get(idx as usize)
            .copied()
            .ok_or(Error::Instantiation(InstantiationError::Unsupported(
                "memory index out of range",
            )))
    }

    fn global_addr(&self, idx: u32) -> Result<GlobalAddr> {
        self.global_addrs
            .get(idx as usize)
            .copied()
            .ok_or(Error::Instantiation(InstantiationError::Unsupported(
                "global index out of range",
            )))
    }
}
