// SPDX-License-Identifier: MIT

//! The execution stack: a fixed-capacity slab of value slots plus the
//! call-frame bookkeeping.
//!
//! Capacity is fixed for the lifetime of one top-level invocation. Guest
//! code never checks capacity per push: admission of a frame checks the
//! function's worst-case height once, so every push inside it is in
//! bounds by construction. Host reentrancy shares the same stack, keeping
//! the exhaustion limit global across guest-host-guest chains.

use std::sync::Arc;

use wex_error::{kinds::Trap, Error, Result};
use wex_foundation::{InstanceAddr, UntypedValue};

use crate::translator::InstructionSequence;

/// Tunable execution limits.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Value-stack capacity in slots, shared by locals and operands.
    pub value_stack_capacity: usize,
    /// Maximum number of nested call frames.
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // 128 Ki slots, one megabyte of stack.
            value_stack_capacity: 1 << 17,
            max_call_depth: 2048,
        }
    }
}

/// A suspended caller, restored on return.
#[derive(Debug)]
pub(crate) struct CallFrame {
    /// Slot index of the caller's local 0.
    pub base: usize,
    /// Where the caller resumes.
    pub return_pc: usize,
    /// The caller's instance.
    pub instance: InstanceAddr,
    /// The caller's code.
    pub iseq: Arc<InstructionSequence>,
}

/// The value and frame stacks of one top-level invocation.
#[derive(Debug)]
pub(crate) struct Stack {
    slots: Box<[UntypedValue]>,
    sp: usize,
    frames: Vec<CallFrame>,
    max_call_depth: usize,
}

impl Stack {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            slots: vec![UntypedValue::ZERO; config.value_stack_capacity].into(),
            sp: 0,
            frames: Vec::new(),
            max_call_depth: config.max_call_depth,
        }
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn set_sp(&mut self, sp: usize) {
        self.sp = sp;
    }

    /// Checked push, used at entry boundaries (arguments, host results).
    pub fn push_checked(&mut self, value: UntypedValue) -> Result<()> {
        if self.sp == self.slots.len() {
            return Err(Error::Trap(Trap::CallStackExhausted));
        }
        self.slots[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    /// Unchecked-by-admission push for translated code.
    pub fn push(&mut self, value: UntypedValue) {
        self.slots[self.sp] = value;
        self.sp += 1;
    }

    pub fn pop(&mut self) -> UntypedValue {
        self.sp -= 1;
        self.slots[self.sp]
    }

    pub fn peek(&self) -> UntypedValue {
        self.slots[self.sp - 1]
    }

    pub fn get(&self, slot: usize) -> UntypedValue {
        self.slots[slot]
    }

    pub fn set(&mut self, slot: usize, value: UntypedValue) {
        self.slots[slot] = value;
    }

    /// The `count` slots below the stack pointer.
    pub fn top(&self, count: usize) -> &[UntypedValue] {
        &self.slots[self.sp - count..self.sp]
    }

    /// Executes a taken branch: moves the `copy` carried slots down over
    /// `pop` discarded ones.
    pub fn branch_adjust(&mut self, copy: usize, pop: usize) {
        if pop > 0 {
            let start = self.sp - copy;
            self.slots.copy_within(start..self.sp, start - pop);
            self.sp -= pop;
        }
    }

    /// Copies `count` result slots down to `base` and truncates above them.
    pub fn return_adjust(&mut self, base: usize, count: usize) {
        let start = self.sp - count;
        if start != base {
            self.slots.copy_within(start..self.sp, base);
        }
        self.sp = base + count;
    }

    /// Suspends the caller's frame, enforcing the call-depth limit.
    pub fn suspend_caller(&mut self, caller: CallFrame) -> Result<()> {
        if self.frames.len() == self.max_call_depth {
            return Err(Error::Trap(Trap::CallStackExhausted));
        }
        self.frames.push(caller);
        Ok(())
    }

    /// Admits a callee frame: checks the function's worst-case height
    /// against capacity once, zeroes the non-parameter locals, and places
    /// the stack pointer above the locals.
    ///
    /// `base` is the slot of the callee's local 0 (the first argument,
    /// already on the stack).
    pub fn admit_frame(
        &mut self,
        base: usize,
        params: usize,
        callee: &InstructionSequence,
    ) -> Result<()> {
        let limit = base
            .checked_add(callee.max_stack_height as usize)
            .ok_or(Error::Trap(Trap::CallStackExhausted))?;
        if limit > self.slots.len() {
            return Err(Error::Trap(Trap::CallStackExhausted));
        }
        let locals = callee.locals_count as usize;
        self.slots[base + params..base + locals].fill(UntypedValue::ZERO);
        self.sp = base + locals;
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    /// Discards frames above `depth`, for unwinding after a failed
    /// reentrant call.
    pub fn truncate_frames(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn iseq(locals: u32, height: u32) -> InstructionSequence {
        InstructionSequence {
            instructions: Box::new([]),
            locals_count: locals,
            results_count: 0,
            max_stack_height: height,
        }
    }

    fn stack(slots: usize, depth: usize) -> Stack {
        Stack::new(&EngineConfig { value_stack_capacity: slots, max_call_depth: depth })
    }

    fn dummy_frame(iseq: &Arc<InstructionSequence>) -> CallFrame {
        CallFrame { base: 0, return_pc: 0, instance: InstanceAddr(0), iseq: iseq.clone() }
    }

    #[test]
    fn branch_adjust_moves_carried_slots() {
        let mut s = stack(16, 4);
        for v in [1, 2, 3, 4] {
            s.push(UntypedValue::from_i32(v));
        }
        // Keep the top slot, discard the two beneath it.
        s.branch_adjust(1, 2);
        assert_eq!(s.sp(), 2);
        assert_eq!(s.get(1).to_i32(), 4);
        assert_eq!(s.get(0).to_i32(), 1);
    }

    #[test]
    fn frame_admission_checks_worst_case_height() {
        let mut s = stack(8, 4);
        s.push(UntypedValue::from_i32(1));
        let callee = iseq(1, 12);
        let err = s.admit_frame(0, 1, &callee).unwrap_err();
        assert!(matches!(err, Error::Trap(Trap::CallStackExhausted)));
        let callee = iseq(1, 8);
        s.admit_frame(0, 1, &callee).unwrap();
        assert_eq!(s.sp(), 1);
    }

    #[test]
    fn frame_admission_zeroes_declared_locals() {
        let mut s = stack(8, 4);
        s.push(UntypedValue::from_i32(42));
        s.push(UntypedValue::from_i32(99));
        // One argument at base 1, two declared locals.
        let callee = iseq(3, 5);
        s.admit_frame(1, 1, &callee).unwrap();
        assert_eq!(s.sp(), 4);
        assert_eq!(s.get(1).to_i32(), 99);
        assert_eq!(s.get(2).to_i32(), 0);
        assert_eq!(s.get(3).to_i32(), 0);
    }

    #[test]
    fn call_depth_is_limited() {
        let shared = Arc::new(iseq(0, 1));
        let mut s = stack(64, 2);
        s.suspend_caller(dummy_frame(&shared)).unwrap();
        s.suspend_caller(dummy_frame(&shared)).unwrap();
        let err = s.suspend_caller(dummy_frame(&shared)).unwrap_err();
        assert!(matches!(err, Error::Trap(Trap::CallStackExhausted)));
        s.truncate_frames(1);
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn return_adjust_places_results_at_base() {
        let mut s = stack(16, 4);
        for v in [9, 1, 2, 3] {
            s.push(UntypedValue::from_i32(v));
        }
        s.return_adjust(1, 1);
        assert_eq!(s.sp(), 2);
        assert_eq!(s.get(1).to_i32(), 3);
        assert_eq!(s.get(0).to_i32(), 9);
    }
}
