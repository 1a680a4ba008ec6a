// SPDX-License-Identifier: MIT

//! Single-pass translation from structured to flat instructions.
//!
//! The translator walks a function body once, maintaining a stack of open
//! control frames and the current operand-stack height. Branches out of a
//! frame are emitted with a placeholder target and back-patched when the
//! frame's `end` is reached; branches to a `loop` head are resolved
//! immediately. Alongside lowering, the translator records the maximum
//! stack height the function can reach, which the interpreter uses for a
//! single up-front capacity check per call.
//!
//! Full validation is the decoder's job. The translator only performs the
//! checks it needs to stay sound on its own bookkeeping: operand counts
//! against the current frame, branch depths, index-space bounds, and block
//! result arities. Code it can prove unreachable is skipped entirely, so
//! stack-polymorphic sequences after `unreachable` or `br` never confuse
//! the height tracking.

use log::trace;
use wex_error::{kinds::TranslationError, Error, Result};
use wex_foundation::{FuncIdx, GlobalType, UntypedValue};

use crate::instructions::{BlockType, BranchTarget, Instr, Instruction};
use crate::module::{GuestFunction, Module};

/// Per-function limit on locals, matching common embedding limits.
const MAX_LOCALS: usize = 50_000;

/// Per-function limit on the translated frame size in slots.
const MAX_FRAME_HEIGHT: u32 = 1 << 20;

/// The executable form of one function body.
#[derive(Debug)]
pub struct InstructionSequence {
    /// The flat instructions, every branch target resolved.
    pub instructions: Box<[Instruction]>,
    /// Parameter plus declared-local slot count.
    pub locals_count: u32,
    /// Result slot count, used by `return` to place results.
    pub results_count: u32,
    /// Worst-case frame size in slots, locals included.
    pub max_stack_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Block,
    Loop { head: u32 },
    If { else_fixup: usize },
    /// An `if` whose `else` arm has begun.
    Else,
}

#[derive(Debug)]
struct ControlFrame {
    kind: FrameKind,
    params: u32,
    results: u32,
    /// Operand height below this frame's label results.
    base: u32,
    /// Branch sites to patch to this frame's end.
    end_fixups: Vec<Fixup>,
    /// Entered while the enclosing code was already unreachable.
    skipped: bool,
    /// The remainder of this frame's code cannot be reached.
    unreachable: bool,
}

/// A placeholder branch target: instruction index plus, for `br_table`,
/// the entry within it.
#[derive(Debug, Clone, Copy)]
struct Fixup {
    instr: usize,
    slot: usize,
}

struct FuncTranslator<'m> {
    module: &'m Module,
    instructions: Vec<Instruction>,
    frames: Vec<ControlFrame>,
    locals_count: u32,
    height: u32,
    max_height: u32,
}

/// Translates one guest function body.
pub(crate) fn translate(
    module: &Module,
    func_idx: FuncIdx,
    func: &GuestFunction,
) -> Result<InstructionSequence> {
    let ty = module
        .types()
        .get(func.type_idx as usize)
        .ok_or(Error::Translation(TranslationError::UnknownIndex {
            space: "type",
            index: func.type_idx,
        }))?;
    let params = ty.params().len();
    let results = ty.results().len() as u32;
    let locals_total = params + func.locals.len();
    if locals_total > MAX_LOCALS {
        return Err(Error::Translation(TranslationError::TooManyLocals { count: locals_total }));
    }
    let locals_count = locals_total as u32;

    let mut translator = FuncTranslator {
        module,
        instructions: Vec::with_capacity(func.body.len()),
        frames: vec![ControlFrame {
            kind: FrameKind::Block,
            params: 0,
            results,
            base: 0,
            end_fixups: Vec::new(),
            skipped: false,
            unreachable: false,
        }],
        locals_count,
        height: 0,
        max_height: 0,
    };
    for instr in func.body.iter() {
        translator.visit(instr)?;
        if translator.frames.is_empty() {
            break;
        }
    }
    if !translator.frames.is_empty() {
        return Err(Error::Translation(TranslationError::MissingEnd));
    }

    let max_stack_height = locals_count
        .checked_add(translator.max_height)
        .filter(|height| *height <= MAX_FRAME_HEIGHT)
        .ok_or(Error::Translation(TranslationError::StackHeightLimitExceeded))?;
    trace!(
        "translated function {func_idx}: {} instructions, frame height {max_stack_height}",
        translator.instructions.len()
    );
    Ok(InstructionSequence {
        instructions: translator.instructions.into(),
        locals_count,
        results_count: results,
        max_stack_height,
    })
}

impl FuncTranslator<'_> {
    fn visit(&mut self, instr: &Instr) -> Result<()> {
        if self.in_unreachable_code() {
            return self.skip(instr);
        }
        match instr {
            Instr::Nop => {}
            Instr::Unreachable => {
                self.emit(Instruction::Unreachable);
                self.mark_unreachable();
            }
            Instr::Block(bt) => {
                let (params, results) = self.block_arity(*bt)?;
                self.open_frame(FrameKind::Block, params, results)?;
            }
            Instr::Loop(bt) => {
                let (params, results) = self.block_arity(*bt)?;
                let head = self.instructions.len() as u32;
                self.open_frame(FrameKind::Loop { head }, params, results)?;
            }
            Instr::If(bt) => {
                self.pop(1)?;
                let (params, results) = self.block_arity(*bt)?;
                let else_fixup = self.emit(Instruction::BrIfNot(PLACEHOLDER));
                self.open_frame(FrameKind::If { else_fixup }, params, results)?;
            }
            Instr::Else => self.visit_else()?,
            Instr::End => self.visit_end()?,
            Instr::Br(depth) => {
                let target = self.branch_target(*depth)?;
                let at = self.emit(Instruction::Br(target.resolved));
                self.register_fixup(*depth, target, Fixup { instr: at, slot: 0 });
                self.mark_unreachable();
            }
            Instr::BrIf(depth) => {
                self.pop(1)?;
                let target = self.branch_target(*depth)?;
                let at = self.emit(Instruction::BrIf(target.resolved));
                self.register_fixup(*depth, target, Fixup { instr: at, slot: 0 });
            }
            Instr::BrTable { labels, default } => {
                self.pop(1)?;
                let mut targets = Vec::with_capacity(labels.len() + 1);
                let mut pending = Vec::with_capacity(labels.len() + 1);
                for depth in labels.iter().chain([default]) {
                    let target = self.branch_target(*depth)?;
                    targets.push(target.resolved);
                    pending.push((*depth, target));
                }
                let at = self.emit(Instruction::BrTable(targets.into()));
                for (slot, (depth, target)) in pending.into_iter().enumerate() {
                    self.register_fixup(depth, target, Fixup { instr: at, slot });
                }
                self.mark_unreachable();
            }
            Instr::Return => {
                let results = self.function_results();
                self.require(results)?;
                self.emit(Instruction::Return);
                self.mark_unreachable();
            }
            Instr::Call(func) => {
                let ty = self.module.func_type(*func).cloned().ok_or(Error::Translation(
                    TranslationError::UnknownIndex { space: "function", index: *func },
                ))?;
                self.pop(ty.params().len() as u32)?;
                self.push(ty.results().len() as u32);
                self.emit(Instruction::Call(*func));
            }
            Instr::CallIndirect { table, ty } => {
                self.check_table(*table)?;
                let sig = self.module.types().get(*ty as usize).cloned().ok_or(
                    Error::Translation(TranslationError::UnknownIndex {
                        space: "type",
                        index: *ty,
                    }),
                )?;
                self.pop(1)?;
                self.pop(sig.params().len() as u32)?;
                self.push(sig.results().len() as u32);
                self.emit(Instruction::CallIndirect { table: *table, ty: *ty });
            }
            Instr::Drop => {
                self.pop(1)?;
                self.emit(Instruction::Drop);
            }
            Instr::Select => {
                self.pop(3)?;
                self.push(1);
                self.emit(Instruction::Select);
            }
            Instr::LocalGet(index) => {
                self.check_local(*index)?;
                self.push(1);
                self.emit(Instruction::LocalGet(*index));
            }
            Instr::LocalSet(index) => {
                self.check_local(*index)?;
                self.pop(1)?;
                self.emit(Instruction::LocalSet(*index));
            }
            Instr::LocalTee(index) => {
                self.check_local(*index)?;
                self.require(1)?;
                self.emit(Instruction::LocalTee(*index));
            }
            Instr::GlobalGet(index) => {
                self.check_global(*index)?;
                self.push(1);
                self.emit(Instruction::GlobalGet(*index));
            }
            Instr::GlobalSet(index) => {
                let ty = self.check_global(*index)?;
                if !ty.mutable {
                    return Err(Error::Translation(TranslationError::ImmutableGlobal {
                        index: *index,
                    }));
                }
                self.pop(1)?;
                self.emit(Instruction::GlobalSet(*index));
            }
            Instr::Load(op, memarg) => {
                self.check_memory()?;
                self.pop(1)?;
                self.push(1);
                self.emit(Instruction::Load { op: *op, offset: memarg.offset });
            }
            Instr::Store(op, memarg) => {
                self.check_memory()?;
                self.pop(2)?;
                self.emit(Instruction::Store { op: *op, offset: memarg.offset });
            }
            Instr::MemorySize => {
                self.check_memory()?;
                self.push(1);
                self.emit(Instruction::MemorySize);
            }
            Instr::MemoryGrow => {
                self.check_memory()?;
                self.require(1)?;
                self.emit(Instruction::MemoryGrow);
            }
            Instr::MemoryInit(data) => {
                self.check_memory()?;
                self.check_data(*data)?;
                self.pop(3)?;
                self.emit(Instruction::MemoryInit(*data));
            }
            Instr::DataDrop(data) => {
                self.check_data(*data)?;
                self.emit(Instruction::DataDrop(*data));
            }
            Instr::MemoryCopy => {
                self.check_memory()?;
                self.pop(3)?;
                self.emit(Instruction::MemoryCopy);
            }
            Instr::MemoryFill => {
                self.check_memory()?;
                self.pop(3)?;
                self.emit(Instruction::MemoryFill);
            }
            Instr::TableGet(table) => {
                self.check_table(*table)?;
                self.require(1)?;
                self.emit(Instruction::TableGet(*table));
            }
            Instr::TableSet(table) => {
                self.check_table(*table)?;
                self.pop(2)?;
                self.emit(Instruction::TableSet(*table));
            }
            Instr::TableSize(table) => {
                self.check_table(*table)?;
                self.push(1);
                self.emit(Instruction::TableSize(*table));
            }
            Instr::TableGrow(table) => {
                self.check_table(*table)?;
                self.pop(2)?;
                self.push(1);
                self.emit(Instruction::TableGrow(*table));
            }
            Instr::TableFill(table) => {
                self.check_table(*table)?;
                self.pop(3)?;
                self.emit(Instruction::TableFill(*table));
            }
            Instr::TableCopy { dst, src } => {
                self.check_table(*dst)?;
                self.check_table(*src)?;
                self.pop(3)?;
                self.emit(Instruction::TableCopy { dst: *dst, src: *src });
            }
            Instr::TableInit { table, elem } => {
                self.check_table(*table)?;
                self.check_elem(*elem)?;
                self.pop(3)?;
                self.emit(Instruction::TableInit { table: *table, elem: *elem });
            }
            Instr::ElemDrop(elem) => {
                self.check_elem(*elem)?;
                self.emit(Instruction::ElemDrop(*elem));
            }
            Instr::RefNull(ty) => {
                self.push(1);
                self.emit(Instruction::RefNull(*ty));
            }
            Instr::RefIsNull => {
                self.require(1)?;
                self.emit(Instruction::RefIsNull);
            }
            Instr::RefFunc(func) => {
                if self.module.func_type(*func).is_none() {
                    return Err(Error::Translation(TranslationError::UnknownIndex {
                        space: "function",
                        index: *func,
                    }));
                }
                self.push(1);
                self.emit(Instruction::RefFunc(*func));
            }
            Instr::I32Const(v) => {
                self.push(1);
                self.emit(Instruction::Const(UntypedValue::from_i32(*v)));
            }
            Instr::I64Const(v) => {
                self.push(1);
                self.emit(Instruction::Const(UntypedValue::from_i64(*v)));
            }
            Instr::F32Const(v) => {
                self.push(1);
                self.emit(Instruction::Const(UntypedValue::from_u32(v.0)));
            }
            Instr::F64Const(v) => {
                self.push(1);
                self.emit(Instruction::Const(UntypedValue::from_u64(v.0)));
            }
            Instr::UnOp(op) => {
                self.require(1)?;
                self.emit(Instruction::UnOp(*op));
            }
            Instr::BinOp(op) => {
                self.pop(2)?;
                self.push(1);
                self.emit(Instruction::BinOp(*op));
            }
        }
        Ok(())
    }

    /// Handles an instruction inside provably-unreachable code. Nothing is
    /// emitted; only frame nesting is tracked so the matching `else`/`end`
    /// is found.
    fn skip(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => {
                self.frames.push(ControlFrame {
                    kind: FrameKind::Block,
                    params: 0,
                    results: 0,
                    base: self.height,
                    end_fixups: Vec::new(),
                    skipped: true,
                    unreachable: true,
                });
            }
            Instr::Else => {
                let frame = self.current_frame();
                if !frame.skipped {
                    // The `else` of a real `if` whose then-arm diverged.
                    return self.visit_else();
                }
            }
            Instr::End => {
                let frame = self.current_frame();
                if frame.skipped {
                    self.frames.pop();
                } else {
                    return self.visit_end();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_else(&mut self) -> Result<()> {
        let reachable = !self.current_frame().unreachable;
        let frame = self.current_frame();
        let FrameKind::If { else_fixup } = frame.kind else {
            return Err(Error::Translation(TranslationError::ElseWithoutIf));
        };
        let (base, params, results) = (frame.base, frame.params, frame.results);
        if reachable {
            self.check_frame_result(base, results)?;
            // Fall-through of the then-arm jumps over the else-arm.
            let at = self.emit(Instruction::Br(PLACEHOLDER));
            self.current_frame_mut().end_fixups.push(Fixup { instr: at, slot: 0 });
        }
        let else_start = self.instructions.len() as u32;
        self.patch(Fixup { instr: else_fixup, slot: 0 }, else_start);
        let frame = self.current_frame_mut();
        frame.kind = FrameKind::Else;
        frame.unreachable = false;
        self.height = base + params;
        self.track_height();
        Ok(())
    }

    fn visit_end(&mut self) -> Result<()> {
        let frame = self.current_frame();
        let (base, results, unreachable) = (frame.base, frame.results, frame.unreachable);
        if !unreachable {
            self.check_frame_result(base, results)?;
        }
        let end_pc = self.instructions.len() as u32;
        // An `if` with no `else` falls through; its false edge also lands
        // here.
        if let FrameKind::If { else_fixup } = self.current_frame().kind {
            self.patch(Fixup { instr: else_fixup, slot: 0 }, end_pc);
        }
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(Error::Translation(TranslationError::MissingEnd)),
        };
        for fixup in frame.end_fixups {
            self.patch(fixup, end_pc);
        }
        self.height = frame.base + frame.results;
        self.track_height();
        if self.frames.is_empty() {
            self.emit(Instruction::Return);
        }
        Ok(())
    }

    fn block_arity(&self, bt: BlockType) -> Result<(u32, u32)> {
        match bt {
            BlockType::Empty => Ok((0, 0)),
            BlockType::Value(_) => Ok((0, 1)),
            BlockType::Func(type_idx) => {
                let ty = self.module.types().get(type_idx as usize).ok_or(Error::Translation(
                    TranslationError::UnknownIndex { space: "type", index: type_idx },
                ))?;
                Ok((ty.params().len() as u32, ty.results().len() as u32))
            }
        }
    }

    fn open_frame(&mut self, kind: FrameKind, params: u32, results: u32) -> Result<()> {
        self.require(params)?;
        self.frames.push(ControlFrame {
            kind,
            params,
            results,
            base: self.height - params,
            end_fixups: Vec::new(),
            skipped: false,
            unreachable: false,
        });
        Ok(())
    }

    /// Resolves a branch at the current height to the frame `depth` levels
    /// up. Loop targets are final; all others carry a placeholder pc.
    fn branch_target(&self, depth: u32) -> Result<ResolvedBranch> {
        let index = self
            .frames
            .len()
            .checked_sub(1 + depth as usize)
            .ok_or(Error::Translation(TranslationError::UnknownLabel { depth }))?;
        let frame = &self.frames[index];
        let arity = match frame.kind {
            FrameKind::Loop { .. } => frame.params,
            _ => frame.results,
        };
        let height = self.height;
        if height < frame.base + arity {
            return Err(Error::Translation(TranslationError::OperandStackUnderflow));
        }
        let pc = match frame.kind {
            FrameKind::Loop { head } => head,
            _ => u32::MAX,
        };
        Ok(ResolvedBranch {
            resolved: BranchTarget {
                pc,
                copy_count: arity,
                pop_count: height - arity - frame.base,
            },
            needs_fixup: !matches!(frame.kind, FrameKind::Loop { .. }),
        })
    }

    fn register_fixup(&mut self, depth: u32, target: ResolvedBranch, fixup: Fixup) {
        if target.needs_fixup {
            let index = self.frames.len() - 1 - depth as usize;
            self.frames[index].end_fixups.push(fixup);
        }
    }

    fn patch(&mut self, fixup: Fixup, pc: u32) {
        match &mut self.instructions[fixup.instr] {
            Instruction::Br(target) | Instruction::BrIf(target) | Instruction::BrIfNot(target) => {
                target.pc = pc;
            }
            Instruction::BrTable(targets) => targets[fixup.slot].pc = pc,
            _ => {}
        }
    }

    fn check_frame_result(&self, base: u32, results: u32) -> Result<()> {
        if self.height != base + results {
            return Err(Error::Translation(TranslationError::ResultArityMismatch {
                expected: results as usize,
                found: self.height.saturating_sub(base) as usize,
            }));
        }
        Ok(())
    }

    fn in_unreachable_code(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.unreachable)
    }

    fn mark_unreachable(&mut self) {
        self.current_frame_mut().unreachable = true;
    }

    fn current_frame(&self) -> &ControlFrame {
        // `frames` is only empty after the function-level `end`, at which
        // point translation has stopped.
        &self.frames[self.frames.len() - 1]
    }

    fn current_frame_mut(&mut self) -> &mut ControlFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn function_results(&self) -> u32 {
        self.frames[0].results
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    fn push(&mut self, count: u32) {
        self.height += count;
        self.track_height();
    }

    fn pop(&mut self, count: u32) -> Result<()> {
        self.require(count)?;
        self.height -= count;
        Ok(())
    }

    /// Checks `count` operands are available without consuming them.
    fn require(&self, count: u32) -> Result<()> {
        if self.height < self.current_frame().base + count {
            return Err(Error::Translation(TranslationError::OperandStackUnderflow));
        }
        Ok(())
    }

    fn track_height(&mut self) {
        self.max_height = self.max_height.max(self.height);
    }

    fn check_local(&self, index: u32) -> Result<()> {
        if index < self.locals_count {
            Ok(())
        } else {
            Err(Error::Translation(TranslationError::UnknownIndex { space: "local", index }))
        }
    }

    fn check_global(&self, index: u32) -> Result<&GlobalType> {
        self.module
            .global_type(index)
            .ok_or(Error::Translation(TranslationError::UnknownIndex { space: "global", index }))
    }

    fn check_table(&self, index: u32) -> Result<()> {
        let total = self.module.num_imported_tables as usize + self.module.tables.len();
        if (index as usize) < total {
            Ok(())
        } else {
            Err(Error::Translation(TranslationError::UnknownIndex { space: "table", index }))
        }
    }

    fn check_memory(&self) -> Result<()> {
        let total = self.module.num_imported_memories as usize + self.module.memories.len();
        if total > 0 {
            Ok(())
        } else {
            Err(Error::Translation(TranslationError::UnknownIndex { space: "memory", index: 0 }))
        }
    }

    fn check_elem(&self, index: u32) -> Result<()> {
        if (index as usize) < self.module.elements.len() {
            Ok(())
        } else {
            Err(Error::Translation(TranslationError::UnknownIndex { space: "element", index }))
        }
    }

    fn check_data(&self, index: u32) -> Result<()> {
        if (index as usize) < self.module.datas.len() {
            Ok(())
        } else {
            Err(Error::Translation(TranslationError::UnknownIndex { space: "data", index }))
        }
    }
}

struct ResolvedBranch {
    resolved: BranchTarget,
    needs_fixup: bool,
}

const PLACEHOLDER: BranchTarget = BranchTarget { pc: u32::MAX, copy_count: 0, pop_count: 0 };

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use std::sync::Arc;

    use wex_foundation::{FuncType, ValueType};

    use super::*;
    use crate::instructions::BinOp;
    use crate::module::{ConstExpr, ModuleBuilder};

    fn build(params: &[ValueType], results: &[ValueType], body: Vec<Instr>) -> Arc<Module> {
        let mut builder = ModuleBuilder::new();
        let ty = builder.push_type(FuncType::new(params.to_vec(), results.to_vec()));
        builder.push_function(ty, [], body);
        builder.finish().unwrap()
    }

    fn translate_first(module: &Module) -> InstructionSequence {
        let func = module.guest_func(0).unwrap();
        translate(module, 0, func).unwrap()
    }

    #[test]
    fn add_function_lowers_flat() {
        let module = build(
            &[ValueType::I32, ValueType::I32],
            &[ValueType::I32],
            vec![
                Instr::LocalGet(0),
                Instr::LocalGet(1),
                Instr::BinOp(BinOp::I32Add),
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        assert_eq!(
            &*iseq.instructions,
            &[
                Instruction::LocalGet(0),
                Instruction::LocalGet(1),
                Instruction::BinOp(BinOp::I32Add),
                Instruction::Return,
            ]
        );
        assert_eq!(iseq.locals_count, 2);
        assert_eq!(iseq.max_stack_height, 4);
    }

    #[test]
    fn block_branch_is_back_patched() {
        let module = build(
            &[],
            &[],
            vec![
                Instr::Block(BlockType::Empty),
                Instr::Br(0),
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        // The branch jumps just past itself, to the end of the block.
        assert_eq!(
            iseq.instructions[0],
            Instruction::Br(BranchTarget { pc: 1, copy_count: 0, pop_count: 0 })
        );
    }

    #[test]
    fn loop_branch_targets_the_head() {
        let module = build(
            &[],
            &[],
            vec![
                Instr::Loop(BlockType::Empty),
                Instr::I32Const(0),
                Instr::BrIf(0),
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        assert_eq!(
            iseq.instructions[1],
            Instruction::BrIf(BranchTarget { pc: 0, copy_count: 0, pop_count: 0 })
        );
    }

    #[test]
    fn branch_with_results_records_copy_and_pop() {
        // block (result i32): push two values, branch carrying the top one
        // over the other.
        let module = build(
            &[],
            &[ValueType::I32],
            vec![
                Instr::Block(BlockType::Value(ValueType::I32)),
                Instr::I32Const(1),
                Instr::I32Const(2),
                Instr::Br(0),
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        assert_eq!(
            iseq.instructions[2],
            Instruction::Br(BranchTarget { pc: 3, copy_count: 1, pop_count: 1 })
        );
    }

    #[test]
    fn if_else_fixups_thread_correctly() {
        let module = build(
            &[ValueType::I32],
            &[ValueType::I32],
            vec![
                Instr::LocalGet(0),
                Instr::If(BlockType::Value(ValueType::I32)),
                Instr::I32Const(10),
                Instr::Else,
                Instr::I32Const(20),
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        // local.get, br_if_not -> else, const 10, br -> end, const 20, return
        assert_eq!(
            iseq.instructions[1],
            Instruction::BrIfNot(BranchTarget { pc: 4, copy_count: 0, pop_count: 0 })
        );
        // The fall-through branch performs no stack adjustment; the
        // then-arm's result is already in place.
        assert_eq!(
            iseq.instructions[3],
            Instruction::Br(BranchTarget { pc: 5, copy_count: 0, pop_count: 0 })
        );
    }

    #[test]
    fn code_after_branch_is_skipped() {
        let module = build(
            &[],
            &[],
            vec![
                Instr::Block(BlockType::Empty),
                Instr::Br(0),
                Instr::I32Const(1),
                Instr::Drop,
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        assert_eq!(iseq.instructions.len(), 2);
    }

    #[test]
    fn unreachable_nested_blocks_are_tracked() {
        let module = build(
            &[],
            &[],
            vec![
                Instr::Unreachable,
                Instr::Block(BlockType::Empty),
                Instr::Loop(BlockType::Empty),
                Instr::End,
                Instr::End,
                Instr::End,
            ],
        );
        let iseq = translate_first(&module);
        assert_eq!(&*iseq.instructions, &[Instruction::Unreachable, Instruction::Return]);
    }

    #[test]
    fn missing_end_is_reported() {
        let module = build(&[], &[], vec![Instr::Block(BlockType::Empty), Instr::End]);
        let func = module.guest_func(0).unwrap();
        let err = translate(&module, 0, func).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(TranslationError::MissingEnd)
        ));
    }

    #[test]
    fn result_arity_is_checked() {
        let module = build(&[], &[ValueType::I32], vec![Instr::End]);
        let func = module.guest_func(0).unwrap();
        let err = translate(&module, 0, func).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(TranslationError::ResultArityMismatch { .. })
        ));
    }

    #[test]
    fn unknown_branch_depth_is_reported() {
        let module = build(&[], &[], vec![Instr::Br(5), Instr::End]);
        let func = module.guest_func(0).unwrap();
        let err = translate(&module, 0, func).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(TranslationError::UnknownLabel { depth: 5 })
        ));
    }

    #[test]
    fn global_set_on_an_immutable_global_is_rejected() {
        let mut builder = ModuleBuilder::new();
        let ty = builder.push_type(FuncType::new([], []));
        builder.push_global(GlobalType::immutable(ValueType::I32), ConstExpr::I32(5));
        builder.push_function(
            ty,
            [],
            vec![Instr::I32Const(99), Instr::GlobalSet(0), Instr::End],
        );
        let module = builder.finish().unwrap();
        let func = module.guest_func(0).unwrap();
        let err = translate(&module, 0, func).unwrap_err();
        assert!(matches!(
            err,
            Error::Translation(TranslationError::ImmutableGlobal { index: 0 })
        ));
    }

    #[test]
    fn else_resumes_after_diverging_then_arm() {
        let module = build(
            &[ValueType::I32],
            &[ValueType::I32],
            vec![
                Instr::LocalGet(0),
                Instr::If(BlockType::Value(ValueType::I32)),
                Instr::Return,
                Instr::Else,
                Instr::I32Const(7),
                Instr::End,
                Instr::End,
            ],
        );
        let func = module.guest_func(0).unwrap();
        // Must not reject the body: the else arm is reachable even though
        // the then arm diverges before producing its result.
        assert!(translate(&module, 0, func).is_ok());
    }
}
