// SPDX-License-Identifier: MIT

//! Linking tests: import resolution, host functions and reentrancy,
//! cross-instance sharing, and instantiation ordering.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use wex_error::{
    kinds::{ImportError, Trap},
    Error,
};
use wex_foundation::{FuncType, GlobalType, MemoryType, RefType, TableType, Value, ValueType};
use wex_runtime::{
    instantiate, BinOp, BlockType, ConstExpr, DataMode, DataSegment, ElementMode, ElementSegment,
    ExportKind, ExternType, ExternalValue, Imports, Instr, LoadOp, MemArg, Module, ModuleBuilder,
    Store, StoreOp,
};

fn importing_module(ty: ExternType) -> Arc<Module> {
    let mut builder = ModuleBuilder::new();
    builder.push_import("env", "item", ty);
    builder.finish().unwrap()
}

#[test]
fn missing_import_is_reported_by_name() {
    let module = importing_module(ExternType::Func(FuncType::new([], [])));
    let mut store = Store::new();
    let err = instantiate(&mut store, &module, &Imports::new()).unwrap_err();
    match err {
        Error::Import(ImportError::UnknownImport { module, name }) => {
            assert_eq!(module, "env");
            assert_eq!(name, "item");
        }
        other => panic!("wrong error: {other:?}"),
    }
}

#[test]
fn import_kind_mismatch_is_rejected() {
    let module = importing_module(ExternType::Func(FuncType::new([], [])));
    let mut store = Store::new();
    let memory = store.register_memory(MemoryType::new(1, None)).unwrap();
    let mut imports = Imports::new();
    imports.define("env", "item", ExternalValue::Memory(memory));
    let err = instantiate(&mut store, &module, &imports).unwrap_err();
    assert!(matches!(err, Error::Import(ImportError::IncompatibleImportType { .. })));
}

#[test]
fn function_import_signatures_match_exactly() {
    let module = importing_module(ExternType::Func(FuncType::new([ValueType::I32], [])));
    let mut store = Store::new();
    let func = store.register_host_func(FuncType::new([ValueType::I64], []), |_, _, _| Ok(()));
    let mut imports = Imports::new();
    imports.define("env", "item", ExternalValue::Func(func));
    let err = instantiate(&mut store, &module, &imports).unwrap_err();
    assert!(matches!(err, Error::Import(ImportError::IncompatibleImportType { .. })));
}

#[test]
fn memory_import_limits_use_the_current_size() {
    // The module wants at least 2 pages with a max of 4.
    let module = importing_module(ExternType::Memory(MemoryType::new(2, Some(4))));
    let mut store = Store::new();
    let memory = store.register_memory(MemoryType::new(1, Some(4))).unwrap();
    let mut imports = Imports::new();
    imports.define("env", "item", ExternalValue::Memory(memory));
    // One page is too small.
    assert!(instantiate(&mut store, &module, &imports).is_err());
    // After growing, the same memory satisfies the import.
    assert!(store.memory_mut(memory).unwrap().grow(1).is_some());
    assert!(instantiate(&mut store, &module, &imports).is_ok());
}

#[test]
fn memory_import_max_must_be_promised() {
    let module = importing_module(ExternType::Memory(MemoryType::new(1, Some(2))));
    let mut store = Store::new();
    let unbounded = store.register_memory(MemoryType::new(1, None)).unwrap();
    let mut imports = Imports::new();
    imports.define("env", "item", ExternalValue::Memory(unbounded));
    assert!(instantiate(&mut store, &module, &imports).is_err());
}

#[test]
fn host_function_called_from_guest() {
    let mut builder = ModuleBuilder::new();
    let ty = builder.push_type(FuncType::new([ValueType::I32], [ValueType::I32]));
    builder.push_import("env", "add_ten", ExternType::Func(FuncType::new(
        [ValueType::I32],
        [ValueType::I32],
    )));
    let wrapper = builder.push_function(
        ty,
        [],
        vec![Instr::LocalGet(0), Instr::Call(0), Instr::End],
    );
    builder.push_export("run", ExportKind::Func(wrapper));
    let module = builder.finish().unwrap();

    let mut store = Store::new();
    let host = store.register_host_func(
        FuncType::new([ValueType::I32], [ValueType::I32]),
        |_, args, results| {
            let Some(v) = args[0].as_i32() else { unreachable!() };
            results[0] = Value::I32(v + 10);
            Ok(())
        },
    );
    let mut imports = Imports::new();
    imports.define("env", "add_ten", ExternalValue::Func(host));
    let instance = instantiate(&mut store, &module, &imports).unwrap();
    let run = store.instance(instance).unwrap().exported_func("run").unwrap();
    assert_eq!(store.invoke(run, &[Value::I32(32)]).unwrap(), vec![Value::I32(42)]);
}

#[test]
fn host_function_reenters_the_guest() {
    // A module exporting `double`, and a host function that calls it back.
    let mut builder = ModuleBuilder::new();
    let ty = builder.push_type(FuncType::new([ValueType::I32], [ValueType::I32]));
    let double = builder.push_function(
        ty,
        [],
        vec![
            Instr::LocalGet(0),
            Instr::I32Const(2),
            Instr::BinOp(BinOp::I32Mul),
            Instr::End,
        ],
    );
    builder.push_export("double", ExportKind::Func(double));
    let library = builder.finish().unwrap();

    let mut store = Store::new();
    let instance = instantiate(&mut store, &library, &Imports::new()).unwrap();
    let double = store.instance(instance).unwrap().exported_func("double").unwrap();

    let host = store.register_host_func(
        FuncType::new([ValueType::I32], [ValueType::I32]),
        move |mut caller, args, results| {
            let doubled = caller.call(double, args)?;
            results[0] = doubled[0].clone();
            Ok(())
        },
    );

    // A second module routes through the host function.
    let mut builder = ModuleBuilder::new();
    let ty = builder.push_type(FuncType::new([ValueType::I32], [ValueType::I32]));
    builder.push_import("env", "via_host", ExternType::Func(FuncType::new(
        [ValueType::I32],
        [ValueType::I32],
    )));
    let run = builder.push_function(
        ty,
        [],
        vec![Instr::LocalGet(0), Instr::Call(0), Instr::End],
    );
    builder.push_export("run", ExportKind::Func(run));
    let app = builder.finish().unwrap();

    let mut imports = Imports::new();
    imports.define("env", "via_host", ExternalValue::Func(host));
    let instance = instantiate(&mut store, &app, &imports).unwrap();
    let run = store.instance(instance).unwrap().exported_func("run").unwrap();
    assert_eq!(store.invoke(run, &[Value::I32(21)]).unwrap(), vec![Value::I32(42)]);
}

#[test]
fn host_function_recovers_from_a_guest_trap() {
    let mut builder = ModuleBuilder::new();
    let ty = builder.push_type(FuncType::new([], []));
    let boom = builder.push_function(ty, [], vec![Instr::Unreachable, Instr::End]);
    builder.push_export("boom", ExportKind::Func(boom));
    let library = builder.finish().unwrap();

    let mut store = Store::new();
    let instance = instantiate(&mut store, &library, &Imports::new()).unwrap();
    let boom = store.instance(instance).unwrap().exported_func("boom").unwrap();

    let host = store.register_host_func(
        FuncType::new([], [ValueType::I32]),
        move |mut caller, _, results| {
            // The failed inner call unwinds its own frames; execution of the
            // outer invocation continues.
            let outcome = caller.call(boom, &[]);
            assert!(matches!(outcome, Err(Error::Trap(Trap::Unreachable))));
            results[0] = Value::I32(7);
            Ok(())
        },
    );
    assert_eq!(store.invoke(host, &[]).unwrap(), vec![Value::I32(7)]);
}

#[test]
fn exported_memory_is_shared_between_instances() {
    let mut builder = ModuleBuilder::new();
    let mem = builder.push_memory(MemoryType::new(1, None));
    builder.push_export("mem", ExportKind::Memory(mem));
    let ty = builder.push_type(FuncType::new([], [ValueType::I32]));
    let peek = builder.push_function(
        ty,
        [],
        vec![
            Instr::I32Const(0),
            Instr::Load(LoadOp::I32Load, MemArg::offset(0)),
            Instr::End,
        ],
    );
    builder.push_export("peek", ExportKind::Func(peek));
    let provider = builder.finish().unwrap();

    let mut builder = ModuleBuilder::new();
    builder.push_import("provider", "mem", ExternType::Memory(MemoryType::new(1, None)));
    let ty = builder.push_type(FuncType::new([ValueType::I32], []));
    let poke = builder.push_function(
        ty,
        [],
        vec![
            Instr::I32Const(0),
            Instr::LocalGet(0),
            Instr::Store(StoreOp::I32Store, MemArg::offset(0)),
            Instr::End,
        ],
    );
    builder.push_export("poke", ExportKind::Func(poke));
    let consumer = builder.finish().unwrap();

    let mut store = Store::new();
    let provider_inst = instantiate(&mut store, &provider, &Imports::new()).unwrap();
    let shared = store.instance(provider_inst).unwrap().export("mem").unwrap();
    let mut imports = Imports::new();
    imports.define("provider", "mem", shared);
    let consumer_inst = instantiate(&mut store, &consumer, &imports).unwrap();

    let poke = store.instance(consumer_inst).unwrap().exported_func("poke").unwrap();
    let peek = store.instance(provider_inst).unwrap().exported_func("peek").unwrap();
    store.invoke(poke, &[Value::I32(1234)]).unwrap();
    assert_eq!(store.invoke(peek, &[]).unwrap(), vec![Value::I32(1234)]);
}

#[test]
fn imported_global_feeds_const_expressions() {
    let mut store = Store::new();
    let base = store
        .register_global(GlobalType::immutable(ValueType::I32), Value::I32(32))
        .unwrap();

    let mut builder = ModuleBuilder::new();
    builder.push_import("env", "base", ExternType::Global(GlobalType::immutable(ValueType::I32)));
    builder.push_memory(MemoryType::new(1, None));
    // The segment lands at the imported base offset.
    builder.push_data(DataSegment {
        bytes: vec![0x2a].into(),
        mode: DataMode::Active { memory: 0, offset: ConstExpr::GlobalGet(0) },
    });
    let ty = builder.push_type(FuncType::new([], [ValueType::I32]));
    let peek = builder.push_function(
        ty,
        [],
        vec![
            Instr::I32Const(32),
            Instr::Load(LoadOp::I32Load8U, MemArg::offset(0)),
            Instr::End,
        ],
    );
    builder.push_export("peek", ExportKind::Func(peek));
    let module = builder.finish().unwrap();

    let mut imports = Imports::new();
    imports.define("env", "base", ExternalValue::Global(base));
    let instance = instantiate(&mut store, &module, &imports).unwrap();
    let peek = store.instance(instance).unwrap().exported_func("peek").unwrap();
    assert_eq!(store.invoke(peek, &[]).unwrap(), vec![Value::I32(0x2a)]);
}

#[test]
fn out_of_bounds_active_segments_fail_instantiation() {
    let mut builder = ModuleBuilder::new();
    builder.push_memory(MemoryType::new(1, None));
    builder.push_data(DataSegment {
        bytes: vec![0; 8].into(),
        mode: DataMode::Active { memory: 0, offset: ConstExpr::I32(65532) },
    });
    let module = builder.finish().unwrap();
    let mut store = Store::new();
    let err = instantiate(&mut store, &module, &Imports::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Instantiation(wex_error::kinds::InstantiationError::OutOfBoundsMemoryAccess)
    ));

    let mut builder = ModuleBuilder::new();
    builder.push_table(TableType::new(RefType::Func, 2, None));
    let ty = builder.push_type(FuncType::new([], []));
    let func = builder.push_function(ty, [], vec![Instr::End]);
    builder.push_element(ElementSegment {
        ty: RefType::Func,
        items: vec![ConstExpr::RefFunc(func); 3].into(),
        mode: ElementMode::Active { table: 0, offset: ConstExpr::I32(0) },
    });
    let module = builder.finish().unwrap();
    let err = instantiate(&mut store, &module, &Imports::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Instantiation(wex_error::kinds::InstantiationError::OutOfBoundsTableAccess)
    ));
}

#[test]
fn start_runs_after_segments_are_applied() {
    let mut builder = ModuleBuilder::new();
    builder.push_memory(MemoryType::new(1, None));
    builder.push_data(DataSegment {
        bytes: vec![0x2a].into(),
        mode: DataMode::Active { memory: 0, offset: ConstExpr::I32(0) },
    });
    let ty = builder.push_type(FuncType::new([], []));
    // Traps unless the data segment is already visible.
    let start = builder.push_function(
        ty,
        [],
        vec![
            Instr::I32Const(0),
            Instr::Load(LoadOp::I32Load8U, MemArg::offset(0)),
            Instr::I32Const(0x2a),
            Instr::BinOp(BinOp::I32Ne),
            Instr::If(BlockType::Empty),
            Instr::Unreachable,
            Instr::End,
            // Leave a marker for the embedder.
            Instr::I32Const(1),
            Instr::I32Const(1),
            Instr::Store(StoreOp::I32Store8, MemArg::offset(0)),
            Instr::End,
        ],
    );
    builder.set_start(start);
    let peek_ty = builder.push_type(FuncType::new([], [ValueType::I32]));
    let peek = builder.push_function(
        peek_ty,
        [],
        vec![
            Instr::I32Const(1),
            Instr::Load(LoadOp::I32Load8U, MemArg::offset(0)),
            Instr::End,
        ],
    );
    builder.push_export("peek", ExportKind::Func(peek));
    let module = builder.finish().unwrap();

    let mut store = Store::new();
    let instance = instantiate(&mut store, &module, &Imports::new()).unwrap();
    let peek = store.instance(instance).unwrap().exported_func("peek").unwrap();
    assert_eq!(store.invoke(peek, &[]).unwrap(), vec![Value::I32(1)]);
}

#[test]
fn trapping_start_fails_instantiation() {
    let mut builder = ModuleBuilder::new();
    let ty = builder.push_type(FuncType::new([], []));
    let start = builder.push_function(ty, [], vec![Instr::Unreachable, Instr::End]);
    builder.set_start(start);
    let module = builder.finish().unwrap();
    let mut store = Store::new();
    let err = instantiate(&mut store, &module, &Imports::new()).unwrap_err();
    assert_eq!(err.as_trap(), Some(&Trap::Unreachable));
}

#[test]
fn passive_elements_feed_table_init() {
    let mut builder = ModuleBuilder::new();
    builder.push_table(TableType::new(RefType::Func, 4, None));
    let ty = builder.push_type(FuncType::new([], [ValueType::I32]));
    let target = builder.push_function(ty, [], vec![Instr::I32Const(5), Instr::End]);
    let elem = builder.push_element(ElementSegment {
        ty: RefType::Func,
        items: vec![ConstExpr::RefFunc(target)].into(),
        mode: ElementMode::Passive,
    });
    let run = builder.push_function(
        ty,
        [],
        vec![
            // Copy the one passive item into slot 3, then call it.
            Instr::I32Const(3),
            Instr::I32Const(0),
            Instr::I32Const(1),
            Instr::TableInit { table: 0, elem },
            Instr::ElemDrop(elem),
            Instr::I32Const(3),
            Instr::CallIndirect { table: 0, ty },
            Instr::End,
        ],
    );
    builder.push_export("run", ExportKind::Func(run));
    let module = builder.finish().unwrap();

    let mut store = Store::new();
    let instance = instantiate(&mut store, &module, &Imports::new()).unwrap();
    let run = store.instance(instance).unwrap().exported_func("run").unwrap();
    assert_eq!(store.invoke(run, &[]).unwrap(), vec![Value::I32(5)]);
    // The element segment was dropped: repeating the init traps.
    let err = store.invoke(run, &[]).unwrap_err();
    assert!(matches!(err, Error::Trap(Trap::OutOfBoundsTableAccess { .. })));
}
