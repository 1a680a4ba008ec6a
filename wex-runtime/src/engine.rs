// SPDX-License-Identifier: MIT

//! The interpreter loop.
//!
//! Execution state is four locals: the current code sequence, program
//! counter, frame base and instance. Calls suspend them into a
//! [`CallFrame`]; returns restore them. The loop indexes the value stack
//! without per-push capacity checks, which is sound because frame
//! admission verified the function's worst-case height and the translator
//! guarantees the runtime stack pointer always equals the height it
//! computed statically.
//!
//! Traps return as errors and unwind every guest frame of the current
//! invocation; the invocation boundary in `store.rs` restores the stack
//! to its entry state.

use std::sync::Arc;

use log::trace;
use wex_error::{kinds::RuntimeError, kinds::Trap, Error, Result};
use wex_foundation::{
    DataAddr, ElemAddr, FuncAddr, GlobalAddr, InstanceAddr, MemAddr, Ref, TableAddr, UntypedValue,
};

use crate::func::FunctionInstance;
use crate::instance::ModuleInstance;
use crate::instructions::{BranchTarget, Instruction, LoadOp, StoreOp};
use crate::stack::{CallFrame, Stack};
use crate::store::{self, Store};
use crate::translator::InstructionSequence;

/// Runs a guest function whose arguments are already on `stack`.
///
/// On success the function's results are the top slots; the caller reads
/// and removes them.
pub(crate) fn execute(store: &mut Store, stack: &mut Stack, func: FuncAddr) -> Result<()> {
    let (code, instance, params) = resolve_guest(store, func)?;
    let base = stack.sp() - params;
    stack.admit_frame(base, params, &code)?;
    trace!("executing function {func}, frame base {base}");
    run(store, stack, code, instance, base)
}

/// Resolves a guest function to its translated code.
fn resolve_guest(
    store: &Store,
    func: FuncAddr,
) -> Result<(Arc<InstructionSequence>, InstanceAddr, usize)> {
    match store.func(func)? {
        FunctionInstance::Guest { ty, module, instance, func_idx } => {
            let guest = module
                .guest_func(*func_idx)
                .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
            let code = guest.compiled(module, *func_idx)?;
            Ok((code, *instance, ty.params().len()))
        }
        FunctionInstance::Host { .. } => Err(Error::Runtime(RuntimeError::InvalidAddress)),
    }
}

#[allow(clippy::too_many_lines)]
fn run(
    store: &mut Store,
    stack: &mut Stack,
    mut code: Arc<InstructionSequence>,
    mut instance: InstanceAddr,
    mut base: usize,
) -> Result<()> {
    let entry_depth = stack.depth();
    let mut pc = 0usize;
    loop {
        let instruction = &code.instructions[pc];
        pc += 1;
        match instruction {
            Instruction::Unreachable => return Err(Error::Trap(Trap::Unreachable)),
            Instruction::Br(target) => {
                let target = *target;
                take_branch(stack, &mut pc, target);
            }
            Instruction::BrIf(target) => {
                let target = *target;
                if stack.pop().to_i32() != 0 {
                    take_branch(stack, &mut pc, target);
                }
            }
            Instruction::BrIfNot(target) => {
                let target = *target;
                if stack.pop().to_i32() == 0 {
                    take_branch(stack, &mut pc, target);
                }
            }
            Instruction::BrTable(targets) => {
                let index = stack.pop().to_u32() as usize;
                // Out-of-range indices take the default, the final entry.
                let target = targets[index.min(targets.len() - 1)];
                take_branch(stack, &mut pc, target);
            }
            Instruction::Return => {
                stack.return_adjust(base, code.results_count as usize);
                if stack.depth() == entry_depth {
                    return Ok(());
                }
                let Some(frame) = stack.pop_frame() else {
                    return Ok(());
                };
                code = frame.iseq;
                pc = frame.return_pc;
                base = frame.base;
                instance = frame.instance;
            }
            Instruction::Call(func_idx) => {
                let func_idx = *func_idx;
                let callee = func_by_index(store, instance, func_idx)?;
                call(store, stack, &mut code, &mut pc, &mut base, &mut instance, callee)?;
            }
            Instruction::CallIndirect { table, ty } => {
                let (table, ty) = (*table, *ty);
                let callee = resolve_indirect(store, instance, table, ty, stack.pop())?;
                call(store, stack, &mut code, &mut pc, &mut base, &mut instance, callee)?;
            }
            Instruction::Drop => {
                stack.pop();
            }
            Instruction::Select => {
                let cond = stack.pop();
                let on_zero = stack.pop();
                let on_nonzero = stack.pop();
                stack.push(if cond.to_i32() != 0 { on_nonzero } else { on_zero });
            }
            Instruction::LocalGet(index) => {
                let value = stack.get(base + *index as usize);
                stack.push(value);
            }
            Instruction::LocalSet(index) => {
                let index = *index;
                let value = stack.pop();
                stack.set(base + index as usize, value);
            }
            Instruction::LocalTee(index) => {
                let index = *index;
                let value = stack.peek();
                stack.set(base + index as usize, value);
            }
            Instruction::GlobalGet(index) => {
                let addr = global_addr(store, instance, *index)?;
                stack.push(store.global(addr)?.get_untyped());
            }
            Instruction::GlobalSet(index) => {
                let addr = global_addr(store, instance, *index)?;
                let value = stack.pop();
                store.global_mut(addr)?.set_untyped(value);
            }
            Instruction::Load { op, offset } => {
                let (op, offset) = (*op, *offset);
                let addr = effective_address(stack.pop(), offset, op.width())?;
                let memory = store.memory(memory_addr(store, instance)?)?;
                stack.push(load(memory, op, addr)?);
            }
            Instruction::Store { op, offset } => {
                let (op, offset) = (*op, *offset);
                let value = stack.pop();
                let addr = effective_address(stack.pop(), offset, op.width())?;
                let memory = store.memory_mut(memory_addr(store, instance)?)?;
                store_value(memory, op, addr, value)?;
            }
            Instruction::MemorySize => {
                let memory = store.memory(memory_addr(store, instance)?)?;
                stack.push(UntypedValue::from_u32(memory.size_pages() as u32));
            }
            Instruction::MemoryGrow => {
                let delta = u64::from(stack.pop().to_u32());
                let memory = store.memory_mut(memory_addr(store, instance)?)?;
                match memory.grow(delta) {
                    Some(old_pages) => stack.push(UntypedValue::from_u32(old_pages as u32)),
                    None => stack.push(UntypedValue::from_i32(-1)),
                }
            }
            Instruction::MemoryInit(data_idx) => {
                let data = data_addr(store, instance, *data_idx)?;
                let len = u64::from(stack.pop().to_u32());
                let src = u64::from(stack.pop().to_u32());
                let dst = u64::from(stack.pop().to_u32());
                let mem = memory_addr(store, instance)?;
                memory_init(store, mem, data, dst, src, len)?;
            }
            Instruction::DataDrop(data_idx) => {
                let data = data_addr(store, instance, *data_idx)?;
                if let Some(segment) = store.datas.get_mut(data.index()) {
                    segment.drop_bytes();
                }
            }
            Instruction::MemoryCopy => {
                let len = u64::from(stack.pop().to_u32());
                let src = u64::from(stack.pop().to_u32());
                let dst = u64::from(stack.pop().to_u32());
                let mem = memory_addr(store, instance)?;
                store.memory_mut(mem)?.copy_within(dst, src, len)?;
            }
            Instruction::MemoryFill => {
                let len = u64::from(stack.pop().to_u32());
                let byte = stack.pop().to_u32() as u8;
                let dst = u64::from(stack.pop().to_u32());
                let mem = memory_addr(store, instance)?;
                store.memory_mut(mem)?.fill(dst, byte, len)?;
            }
            Instruction::TableGet(table_idx) => {
                let addr = table_addr(store, instance, *table_idx)?;
                let index = u64::from(stack.pop().to_u32());
                let value = store.table(addr)?.get(index)?;
                stack.push(UntypedValue::from_ref(value));
            }
            Instruction::TableSet(table_idx) => {
                let addr = table_addr(store, instance, *table_idx)?;
                let element_ty = store.table(addr)?.ty().element;
                let value = stack.pop().to_ref(element_ty);
                let index = u64::from(stack.pop().to_u32());
                store.table_mut(addr)?.set(index, value)?;
            }
            Instruction::TableSize(table_idx) => {
                let addr = table_addr(store, instance, *table_idx)?;
                stack.push(UntypedValue::from_u32(store.table(addr)?.size() as u32));
            }
            Instruction::TableGrow(table_idx) => {
                let addr = table_addr(store, instance, *table_idx)?;
                let element_ty = store.table(addr)?.ty().element;
                let delta = u64::from(stack.pop().to_u32());
                let init = stack.pop().to_ref(element_ty);
                match store.table_mut(addr)?.grow(delta, init) {
                    Some(old_size) => stack.push(UntypedValue::from_u32(old_size as u32)),
                    None => stack.push(UntypedValue::from_i32(-1)),
                }
            }
            Instruction::TableFill(table_idx) => {
                let addr = table_addr(store, instance, *table_idx)?;
                let element_ty = store.table(addr)?.ty().element;
                let len = u64::from(stack.pop().to_u32());
                let value = stack.pop().to_ref(element_ty);
                let dst = u64::from(stack.pop().to_u32());
                store.table_mut(addr)?.fill(dst, value, len)?;
            }
            Instruction::TableCopy { dst, src } => {
                let dst_addr = table_addr(store, instance, *dst)?;
                let src_addr = table_addr(store, instance, *src)?;
                let len = u64::from(stack.pop().to_u32());
                let src = u64::from(stack.pop().to_u32());
                let dst = u64::from(stack.pop().to_u32());
                table_copy(store, dst_addr, src_addr, dst, src, len)?;
            }
            Instruction::TableInit { table, elem } => {
                let table = table_addr(store, instance, *table)?;
                let elem = elem_addr(store, instance, *elem)?;
                let len = u64::from(stack.pop().to_u32());
                let src = u64::from(stack.pop().to_u32());
                let dst = u64::from(stack.pop().to_u32());
                table_init(store, table, elem, dst, src, len)?;
            }
            Instruction::ElemDrop(elem_idx) => {
                let elem = elem_addr(store, instance, *elem_idx)?;
                if let Some(segment) = store.elements.get_mut(elem.index()) {
                    segment.drop_items();
                }
            }
            Instruction::RefNull(ty) => {
                stack.push(UntypedValue::from_ref(Ref::null(*ty)));
            }
            Instruction::RefIsNull => {
                let value = stack.pop();
                stack.push(UntypedValue::from_u32(value.is_null_ref().into()));
            }
            Instruction::RefFunc(func_idx) => {
                let addr = func_by_index(store, instance, *func_idx)?;
                stack.push(UntypedValue::from_ref(Ref::Func(Some(addr))));
            }
            Instruction::Const(word) => {
                let word = *word;
                stack.push(word);
            }
            Instruction::UnOp(op) => {
                let op = *op;
                let value = stack.pop();
                stack.push(op.eval(value)?);
            }
            Instruction::BinOp(op) => {
                let op = *op;
                let rhs = stack.pop();
                let lhs = stack.pop();
                stack.push(op.eval(lhs, rhs)?);
            }
        }
    }
}

#[inline]
fn take_branch(stack: &mut Stack, pc: &mut usize, target: BranchTarget) {
    stack.branch_adjust(target.copy_count as usize, target.pop_count as usize);
    *pc = target.pc as usize;
}

/// Transfers control into `callee`, which may be guest or host.
fn call(
    store: &mut Store,
    stack: &mut Stack,
    code: &mut Arc<InstructionSequence>,
    pc: &mut usize,
    base: &mut usize,
    instance: &mut InstanceAddr,
    callee: FuncAddr,
) -> Result<()> {
    match store.func(callee)? {
        FunctionInstance::Host { ty, code: host } => {
            let (ty, host) = (ty.clone(), host.clone());
            let params = ty.params().len();
            let args: Vec<_> = stack
                .top(params)
                .iter()
                .zip(ty.params())
                .map(|(word, ty)| word.to_value(*ty))
                .collect();
            stack.set_sp(stack.sp() - params);
            let results = store::call_host(store, stack, &host, &ty, &args)?;
            for result in results {
                stack.push_checked(result.into())?;
            }
            Ok(())
        }
        FunctionInstance::Guest { .. } => {
            let (callee_code, callee_instance, params) = resolve_guest(store, callee)?;
            let new_base = stack.sp() - params;
            stack.suspend_caller(CallFrame {
                base: *base,
                return_pc: *pc,
                instance: *instance,
                iseq: code.clone(),
            })?;
            stack.admit_frame(new_base, params, &callee_code)?;
            *code = callee_code;
            *pc = 0;
            *base = new_base;
            *instance = callee_instance;
            Ok(())
        }
    }
}

/// Resolves `call_indirect`: table lookup, null check, signature check.
fn resolve_indirect(
    store: &Store,
    instance: InstanceAddr,
    table_idx: u32,
    type_idx: u32,
    index_word: UntypedValue,
) -> Result<FuncAddr> {
    let index = u64::from(index_word.to_u32());
    let table = store.table(table_addr(store, instance, table_idx)?)?;
    let reference = table.get(index)?;
    let Ref::Func(maybe_func) = reference else {
        return Err(Error::Trap(Trap::TableUninitialized { index }));
    };
    let Some(func) = maybe_func else {
        return Err(Error::Trap(Trap::TableUninitialized { index }));
    };
    let expected = current_instance(store, instance)?
        .module()
        .types()
        .get(type_idx as usize)
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
    let actual = store.func(func)?.ty();
    if actual != expected {
        return Err(Error::Trap(Trap::IndirectCallTypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }));
    }
    Ok(func)
}

fn current_instance(store: &Store, instance: InstanceAddr) -> Result<&ModuleInstance> {
    store.instance(instance)
}

fn func_by_index(store: &Store, instance: InstanceAddr, func_idx: u32) -> Result<FuncAddr> {
    current_instance(store, instance)?
        .func_addrs
        .get(func_idx as usize)
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

fn global_addr(store: &Store, instance: InstanceAddr, index: u32) -> Result<GlobalAddr> {
    current_instance(store, instance)?
        .global_addrs
        .get(index as usize)
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

fn table_addr(store: &Store, instance: InstanceAddr, index: u32) -> Result<TableAddr> {
    current_instance(store, instance)?
        .table_addrs
        .get(index as usize)
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

fn memory_addr(store: &Store, instance: InstanceAddr) -> Result<MemAddr> {
    current_instance(store, instance)?
        .mem_addrs
        .first()
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

fn elem_addr(store: &Store, instance: InstanceAddr, index: u32) -> Result<ElemAddr> {
    current_instance(store, instance)?
        .elem_addrs
        .get(index as usize)
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

fn data_addr(store: &Store, instance: InstanceAddr, index: u32) -> Result<DataAddr> {
    current_instance(store, instance)?
        .data_addrs
        .get(index as usize)
        .copied()
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))
}

/// Adds the static offset, trapping on address overflow.
fn effective_address(index_word: UntypedValue, offset: u64, width: u64) -> Result<u64> {
    index_word
        .as_address_offset()
        .checked_add(offset)
        .ok_or(Error::Trap(Trap::OutOfBoundsMemoryAccess {
            address: index_word.as_address_offset(),
            length: width,
        }))
}

fn load(
    memory: &crate::memory::MemoryInstance,
    op: LoadOp,
    addr: u64,
) -> Result<UntypedValue> {
    use UntypedValue as V;
    let word = match op {
        LoadOp::I32Load => V::from_u32(u32::from_le_bytes(memory.read(addr)?)),
        LoadOp::I64Load => V::from_u64(u64::from_le_bytes(memory.read(addr)?)),
        LoadOp::F32Load => V::from_u32(u32::from_le_bytes(memory.read(addr)?)),
        LoadOp::F64Load => V::from_u64(u64::from_le_bytes(memory.read(addr)?)),
        LoadOp::I32Load8S => V::from_i32(i32::from(i8::from_le_bytes(memory.read(addr)?))),
        LoadOp::I32Load8U => V::from_u32(u32::from(u8::from_le_bytes(memory.read(addr)?))),
        LoadOp::I32Load16S => V::from_i32(i32::from(i16::from_le_bytes(memory.read(addr)?))),
        LoadOp::I32Load16U => V::from_u32(u32::from(u16::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load8S => V::from_i64(i64::from(i8::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load8U => V::from_u64(u64::from(u8::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load16S => V::from_i64(i64::from(i16::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load16U => V::from_u64(u64::from(u16::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load32S => V::from_i64(i64::from(i32::from_le_bytes(memory.read(addr)?))),
        LoadOp::I64Load32U => V::from_u64(u64::from(u32::from_le_bytes(memory.read(addr)?))),
    };
    Ok(word)
}

fn store_value(
    memory: &mut crate::memory::MemoryInstance,
    op: StoreOp,
    addr: u64,
    value: UntypedValue,
) -> Result<()> {
    match op {
        StoreOp::I32Store | StoreOp::F32Store => {
            memory.write(addr, value.to_u32().to_le_bytes())
        }
        StoreOp::I64Store | StoreOp::F64Store => {
            memory.write(addr, value.to_u64().to_le_bytes())
        }
        StoreOp::I32Store8 => memory.write(addr, [value.to_u32() as u8]),
        StoreOp::I32Store16 => memory.write(addr, (value.to_u32() as u16).to_le_bytes()),
        StoreOp::I64Store8 => memory.write(addr, [value.to_u64() as u8]),
        StoreOp::I64Store16 => memory.write(addr, (value.to_u64() as u16).to_le_bytes()),
        StoreOp::I64Store32 => memory.write(addr, (value.to_u64() as u32).to_le_bytes()),
    }
}

/// `memory.init` needs the segment and the memory at once; they live in
/// different store arenas, so the borrow is split field-wise.
fn memory_init(
    store: &mut Store,
    mem: MemAddr,
    data: DataAddr,
    dst: u64,
    src: u64,
    len: u64,
) -> Result<()> {
    let Store { memories, datas, .. } = store;
    let segment = datas
        .get(data.index())
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
    let memory = memories
        .get_mut(mem.index())
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
    memory.init(dst, segment.bytes(), src, len)
}

fn table_init(
    store: &mut Store,
    table: TableAddr,
    elem: ElemAddr,
    dst: u64,
    src: u64,
    len: u64,
) -> Result<()> {
    let Store { tables, elements, .. } = store;
    let segment = elements
        .get(elem.index())
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
    let table = tables
        .get_mut(table.index())
        .ok_or(Error::Runtime(RuntimeError::InvalidAddress))?;
    table.init(dst, segment.items(), src, len)
}

fn table_copy(
    store: &mut Store,
    dst_addr: TableAddr,
    src_addr: TableAddr,
    dst: u64,
    src: u64,
    len: u64,
) -> Result<()> {
    if dst_addr == src_addr {
        return store.table_mut(dst_addr)?.copy_within(dst, src, len);
    }
    let tables = &mut store.tables;
    let invalid = || Error::Runtime(RuntimeError::InvalidAddress);
    if dst_addr.index() < src_addr.index() {
        let (low, high) = tables.split_at_mut(src_addr.index());
        let source = high.first().ok_or_else(invalid)?;
        low.get_mut(dst_addr.index()).ok_or_else(invalid)?.copy_from(dst, source, src, len)
    } else {
        let (low, high) = tables.split_at_mut(dst_addr.index());
        let source = low.get(src_addr.index()).ok_or_else(invalid)?;
        high.first_mut().ok_or_else(invalid)?.copy_from(dst, source, src, len)
    }
}
