// SPDX-License-Identifier: MIT

//! The store: owner of all runtime state.
//!
//! Functions, tables, memories, globals, segments and instances live in
//! index-addressed arenas; the address newtypes from `wex-foundation` are
//! the only handles handed out. Nothing is ever deallocated, so addresses
//! stay valid for the store's lifetime.
//!
//! [`Store::invoke`] is the typed entry point: it checks arguments against
//! the callee's signature, runs the interpreter on a fresh stack, and tags
//! the results. Host functions called from guest code receive a
//! [`Caller`], through which they can re-enter the same store and the
//! same stack, so the exhaustion limits hold across guest-host-guest
//! chains.

use std::sync::Arc;

use log::debug;
use wex_error::{kinds::RuntimeError, Error, Result};
use wex_foundation::{
    DataAddr, ElemAddr, FuncAddr, FuncType, GlobalAddr, GlobalType, InstanceAddr, MemAddr,
    MemoryType, TableAddr, TableType, UntypedValue, Value,
};

use crate::engine;
use crate::func::{FunctionInstance, HostFunc};
use crate::global::GlobalInstance;
use crate::instance::ModuleInstance;
use crate::memory::MemoryInstance;
use crate::stack::{EngineConfig, Stack};
use crate::table::{DataInstance, ElementInstance, TableInstance};

/// The owner of all runtime entities.
#[derive(Debug, Default)]
pub struct Store {
    config: EngineConfig,
    pub(crate) funcs: Vec<FunctionInstance>,
    pub(crate) tables: Vec<TableInstance>,
    pub(crate) memories: Vec<MemoryInstance>,
    pub(crate) globals: Vec<GlobalInstance>,
    pub(crate) elements: Vec<ElementInstance>,
    pub(crate) datas: Vec<DataInstance>,
    pub(crate) instances: Vec<ModuleInstance>,
}

impl Store {
    /// A store with default execution limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// A store with explicit execution limits.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// The store's execution limits.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn alloc_func(&mut self, func: FunctionInstance) -> FuncAddr {
        self.funcs.push(func);
        FuncAddr((self.funcs.len() - 1) as u32)
    }

    /// Registers a host function, returning its address.
    pub fn register_host_func<F>(&mut self, ty: FuncType, code: F) -> FuncAddr
    where
        F: Fn(Caller<'_>, &[Value], &mut [Value]) -> Result<()> + Send + Sync + 'static,
    {
        self.alloc_func(FunctionInstance::Host { ty, code: Arc::new(code) })
    }

    /// Allocates a host-created memory.
    pub fn register_memory(&mut self, ty: MemoryType) -> Result<MemAddr> {
        let memory = MemoryInstance::new(ty)?;
        self.memories.push(memory);
        Ok(MemAddr((self.memories.len() - 1) as u32))
    }

    /// Allocates a host-created table.
    pub fn register_table(&mut self, ty: TableType) -> TableAddr {
        self.tables.push(TableInstance::new(ty));
        TableAddr((self.tables.len() - 1) as u32)
    }

    /// Allocates a host-created global holding `value`.
    pub fn register_global(&mut self, ty: GlobalType, value: Value) -> Result<GlobalAddr> {
        if value.ty() != ty.value_type {
            return Err(Error::Runtime(RuntimeError::ArgumentTypeMismatch {
                index: 0,
                expected: ty.value_type.name(),
            }));
        }
        self.globals.push(GlobalInstance::new(ty, value.into()));
        Ok(GlobalAddr((self.globals.len() - 1) as u32))
    }

    pub(crate) fn alloc_element(&mut self, element: ElementInstance) -> ElemAddr {
        self.elements.push(element);
        ElemAddr((self.elements.len() - 1) as u32)
    }

    pub(crate) fn alloc_data(&mut self, data: DataInstance) -> DataAddr {
        self.datas.push(data);
        DataAddr((self.datas.len() - 1) as u32)
    }

    /// The function at `addr`.
    pub fn func(&self, addr: FuncAddr) -> Result<&FunctionInstance> {
        self.funcs.get(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// The memory at `addr`.
    pub fn memory(&self, addr: MemAddr) -> Result<&MemoryInstance> {
        self.memories.get(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// Mutable access to the memory at `addr`.
    pub fn memory_mut(&mut self, addr: MemAddr) -> Result<&mut MemoryInstance> {
        self.memories.get_mut(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// The table at `addr`.
    pub fn table(&self, addr: TableAddr) -> Result<&TableInstance> {
        self.tables.get(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// Mutable access to the table at `addr`.
    pub fn table_mut(&mut self, addr: TableAddr) -> Result<&mut TableInstance> {
        self.tables.get_mut(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// The global at `addr`.
    pub fn global(&self, addr: GlobalAddr) -> Result<&GlobalInstance> {
        self.globals.get(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// Mutable access to the global at `addr`.
    pub fn global_mut(&mut self, addr: GlobalAddr) -> Result<&mut GlobalInstance> {
        self.globals.get_mut(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// The instance at `addr`.
    pub fn instance(&self, addr: InstanceAddr) -> Result<&ModuleInstance> {
        self.instances.get(addr.index()).ok_or(Error::Runtime(RuntimeError::InvalidAddress))
    }

    /// Calls a function with tagged arguments on a fresh stack.
    pub fn invoke(&mut self, func: FuncAddr, args: &[Value]) -> Result<Vec<Value>> {
        let mut stack = Stack::new(&self.config);
        invoke_on_stack(self, &mut stack, func, args)
    }
}

/// The handle a host function receives: reentrant access to the store and
/// to the in-flight execution stack.
pub struct Caller<'a> {
    pub(crate) store: &'a mut Store,
    pub(crate) stack: &'a mut Stack,
}

impl Caller<'_> {
    /// The underlying store.
    pub fn store(&mut self) -> &mut Store {
        self.store
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store_ref(&self) -> &Store {
        self.store
    }

    /// Calls back into guest (or host) code on the same stack. A failed
    /// call unwinds its own frames; the host function may recover and
    /// continue.
    pub fn call(&mut self, func: FuncAddr, args: &[Value]) -> Result<Vec<Value>> {
        invoke_on_stack(self.store, self.stack, func, args)
    }
}

/// Shared typed-call path for top-level and reentrant invocations.
pub(crate) fn invoke_on_stack(
    store: &mut Store,
    stack: &mut Stack,
    func: FuncAddr,
    args: &[Value],
) -> Result<Vec<Value>> {
    let ty = store.func(func)?.ty().clone();
    check_args(&ty, args)?;
    debug!("invoking function {func} {ty}");

    let entry_sp = stack.sp();
    let entry_depth = stack.depth();
    let run = |store: &mut Store, stack: &mut Stack| -> Result<Vec<Value>> {
        match store.func(func)? {
            FunctionInstance::Host { code, .. } => {
                let code = code.clone();
                call_host(store, stack, &code, &ty, args)
            }
            FunctionInstance::Guest { .. } => {
                for arg in args {
                    stack.push_checked(UntypedValue::from(*arg))?;
                }
                engine::execute(store, stack, func)?;
                let results = ty
                    .results()
                    .iter()
                    .zip(stack.top(ty.results().len()))
                    .map(|(ty, word)| word.to_value(*ty))
                    .collect();
                stack.set_sp(entry_sp);
                Ok(results)
            }
        }
    };
    let outcome = run(store, stack);
    if outcome.is_err() {
        stack.set_sp(entry_sp);
        stack.truncate_frames(entry_depth);
    }
    outcome
}

/// Invokes a host function, checking the results it produced.
pub(crate) fn call_host(
    store: &mut Store,
    stack: &mut Stack,
    code: &Arc<HostFunc>,
    ty: &FuncType,
    args: &[Value],
) -> Result<Vec<Value>> {
    let mut results: Vec<Value> =
        ty.results().iter().map(|ty| ty.default_value()).collect();
    code(Caller { store, stack }, args, &mut results)?;
    for (index, (result, expected)) in results.iter().zip(ty.results()).enumerate() {
        if result.ty() != *expected {
            return Err(Error::Runtime(RuntimeError::ArgumentTypeMismatch {
                index,
                expected: expected.name(),
            }));
        }
    }
    Ok(results)
}

fn check_args(ty: &FuncType, args: &[Value]) -> Result<()> {
    if args.len() != ty.params().len() {
        return Err(Error::Runtime(RuntimeError::ArgumentArityMismatch {
            expected: ty.params().len(),
            found: args.len(),
        }));
    }
    for (index, (arg, expected)) in args.iter().zip(ty.params()).enumerate() {
        if arg.ty() != *expected {
            return Err(Error::Runtime(RuntimeError::ArgumentTypeMismatch {
                index,
                expected: expected.name(),
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use wex_foundation::ValueType;

    use super::*;

    #[test]
    fn invoke_checks_argument_types() {
        let mut store = Store::new();
        let func = store.register_host_func(
            FuncType::new([ValueType::I32], [ValueType::I32]),
            |_, args, results| {
                results[0] = Value::I32(args[0].as_i32().unwrap() + 1);
                Ok(())
            },
        );
        assert_eq!(store.invoke(func, &[Value::I32(4)]).unwrap(), vec![Value::I32(5)]);
        assert!(matches!(
            store.invoke(func, &[Value::I64(4)]),
            Err(Error::Runtime(RuntimeError::ArgumentTypeMismatch { .. }))
        ));
        assert!(matches!(
            store.invoke(func, &[]),
            Err(Error::Runtime(RuntimeError::ArgumentArityMismatch { expected: 1, found: 0 }))
        ));
    }

    #[test]
    fn host_results_are_type_checked() {
        let mut store = Store::new();
        let func = store.register_host_func(
            FuncType::new([], [ValueType::I64]),
            |_, _, results| {
                results[0] = Value::I32(0);
                Ok(())
            },
        );
        assert!(store.invoke(func, &[]).is_err());
    }

    #[test]
    fn registered_globals_are_typed() {
        let mut store = Store::new();
        assert!(store
            .register_global(GlobalType::immutable(ValueType::I32), Value::I64(1))
            .is_err());
        let addr = store
            .register_global(GlobalType::mutable(ValueType::I32), Value::I32(3))
            .unwrap();
        assert_eq!(store.global(addr).unwrap().get(), Value::I32(3));
    }
}
