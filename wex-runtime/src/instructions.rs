// SPDX-License-Identifier: MIT

//! Instruction representations.
//!
//! Two forms exist. [`Instr`] is the structured form a decoder (or the
//! [`crate::module::ModuleBuilder`]) produces: it still has `block`/`loop`/
//! `if` nesting and label-relative branches. [`Instruction`] is the flat
//! form the translator emits and the interpreter executes: control structure
//! is gone, branches carry absolute instruction offsets plus the stack
//! adjustment the branch performs.
//!
//! Operator enums ([`UnOp`], [`BinOp`], [`LoadOp`], [`StoreOp`]) are shared
//! between the two forms; their evaluation rules live here next to the
//! definitions so the interpreter loop stays a thin dispatcher.

use wex_error::Result;
use wex_foundation::{
    DataIdx, ElemIdx, FloatBits32, FloatBits64, FuncIdx, GlobalIdx, LabelIdx, LocalIdx, RefType,
    TableIdx, TypeIdx, UntypedValue, ValueType,
};

/// The type of a structured control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters, no results.
    Empty,
    /// No parameters, one result.
    Value(ValueType),
    /// Parameters and results given by a module type index.
    Func(TypeIdx),
}

/// The static offset and alignment hint of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemArg {
    /// Static offset added to the dynamic address operand.
    pub offset: u64,
    /// Alignment exponent. A hint only; execution never requires it.
    pub align: u32,
}

impl MemArg {
    /// A memarg with the given static offset and natural alignment 0.
    #[must_use]
    pub const fn offset(offset: u64) -> Self {
        Self { offset, align: 0 }
    }
}

/// Structured instructions, as produced by decoding or a module builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `unreachable`
    Unreachable,
    /// `nop`
    Nop,
    /// `block`
    Block(BlockType),
    /// `loop`
    Loop(BlockType),
    /// `if`
    If(BlockType),
    /// `else`
    Else,
    /// `end`
    End,
    /// `br`
    Br(LabelIdx),
    /// `br_if`
    BrIf(LabelIdx),
    /// `br_table`, with the default label last in semantics.
    BrTable {
        /// The per-index labels.
        labels: Box<[LabelIdx]>,
        /// The label taken for out-of-range indices.
        default: LabelIdx,
    },
    /// `return`
    Return,
    /// `call`
    Call(FuncIdx),
    /// `call_indirect`
    CallIndirect {
        /// The table holding the function references.
        table: TableIdx,
        /// The expected signature's type index.
        ty: TypeIdx,
    },
    /// `drop`
    Drop,
    /// `select` (the operand type is irrelevant at execution).
    Select,
    /// `local.get`
    LocalGet(LocalIdx),
    /// `local.set`
    LocalSet(LocalIdx),
    /// `local.tee`
    LocalTee(LocalIdx),
    /// `global.get`
    GlobalGet(GlobalIdx),
    /// `global.set`
    GlobalSet(GlobalIdx),
    /// A memory load.
    Load(LoadOp, MemArg),
    /// A memory store.
    Store(StoreOp, MemArg),
    /// `memory.size`
    MemorySize,
    /// `memory.grow`
    MemoryGrow,
    /// `memory.init`
    MemoryInit(DataIdx),
    /// `data.drop`
    DataDrop(DataIdx),
    /// `memory.copy`
    MemoryCopy,
    /// `memory.fill`
    MemoryFill,
    /// `table.get`
    TableGet(TableIdx),
    /// `table.set`
    TableSet(TableIdx),
    /// `table.size`
    TableSize(TableIdx),
    /// `table.grow`
    TableGrow(TableIdx),
    /// `table.fill`
    TableFill(TableIdx),
    /// `table.copy`
    TableCopy {
        /// Destination table.
        dst: TableIdx,
        /// Source table.
        src: TableIdx,
    },
    /// `table.init`
    TableInit {
        /// Destination table.
        table: TableIdx,
        /// Source element segment.
        elem: ElemIdx,
    },
    /// `elem.drop`
    ElemDrop(ElemIdx),
    /// `ref.null`
    RefNull(RefType),
    /// `ref.is_null`
    RefIsNull,
    /// `ref.func`
    RefFunc(FuncIdx),
    /// `i32.const`
    I32Const(i32),
    /// `i64.const`
    I64Const(i64),
    /// `f32.const`
    F32Const(FloatBits32),
    /// `f64.const`
    F64Const(FloatBits64),
    /// A unary numeric operator.
    UnOp(UnOp),
    /// A binary numeric operator.
    BinOp(BinOp),
}

/// A flat branch destination with its stack adjustment.
///
/// A taken branch moves the top `copy_count` operand slots down by
/// `pop_count` slots, shrinks the operand stack by `pop_count`, and jumps
/// to `pc`. Branches into a not-yet-emitted location are back-patched by
/// the translator before the sequence is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchTarget {
    /// Absolute instruction offset within the sequence.
    pub pc: u32,
    /// Number of label-result slots carried across the branch.
    pub copy_count: u32,
    /// Number of slots discarded beneath the carried results.
    pub pop_count: u32,
}

/// Flat instructions, as executed by the interpreter.
///
/// Const operands are pre-encoded as [`UntypedValue`] words and memarg
/// offsets are folded into the load/store variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Trap unconditionally.
    Unreachable,
    /// Unconditional branch.
    Br(BranchTarget),
    /// Branch if the popped `i32` is non-zero.
    BrIf(BranchTarget),
    /// Branch if the popped `i32` is zero.
    BrIfNot(BranchTarget),
    /// Indexed branch; the last entry is the default target.
    BrTable(Box<[BranchTarget]>),
    /// Return from the current function.
    Return,
    /// Direct call through the current instance's function index space.
    Call(FuncIdx),
    /// Indirect call through a table.
    CallIndirect {
        /// The table holding the function references.
        table: TableIdx,
        /// The expected signature's type index.
        ty: TypeIdx,
    },
    /// Discard the top operand slot.
    Drop,
    /// Pop condition and two operands, push one of them.
    Select,
    /// Push the value of a frame slot.
    LocalGet(LocalIdx),
    /// Pop into a frame slot.
    LocalSet(LocalIdx),
    /// Copy the top operand into a frame slot.
    LocalTee(LocalIdx),
    /// Push a global's value.
    GlobalGet(GlobalIdx),
    /// Pop into a global.
    GlobalSet(GlobalIdx),
    /// A memory load; the static offset is already folded in.
    Load {
        /// The access kind.
        op: LoadOp,
        /// Static offset added to the address operand.
        offset: u64,
    },
    /// A memory store; the static offset is already folded in.
    Store {
        /// The access kind.
        op: StoreOp,
        /// Static offset added to the address operand.
        offset: u64,
    },
    /// Push the current memory size in pages.
    MemorySize,
    /// Grow memory, pushing the old page count or `-1`.
    MemoryGrow,
    /// Copy from a data segment into memory.
    MemoryInit(DataIdx),
    /// Release a data segment's contents.
    DataDrop(DataIdx),
    /// Copy within memory, overlap-safe.
    MemoryCopy,
    /// Fill a memory span with a byte.
    MemoryFill,
    /// Push a table element.
    TableGet(TableIdx),
    /// Pop a reference into a table slot.
    TableSet(TableIdx),
    /// Push the current table size.
    TableSize(TableIdx),
    /// Grow a table, pushing the old size or `-1`.
    TableGrow(TableIdx),
    /// Fill a table span with a reference.
    TableFill(TableIdx),
    /// Copy between (or within) tables, overlap-safe.
    TableCopy {
        /// Destination table.
        dst: TableIdx,
        /// Source table.
        src: TableIdx,
    },
    /// Copy from an element segment into a table.
    TableInit {
        /// Destination table.
        table: TableIdx,
        /// Source element segment.
        elem: ElemIdx,
    },
    /// Release an element segment's contents.
    ElemDrop(ElemIdx),
    /// Push a null reference.
    RefNull(RefType),
    /// Pop a reference, push its null test as `i32`.
    RefIsNull,
    /// Push a reference to a function of the current instance.
    RefFunc(FuncIdx),
    /// Push a pre-encoded constant word.
    Const(UntypedValue),
    /// Apply a unary operator to the top slot.
    UnOp(UnOp),
    /// Apply a binary operator to the top two slots.
    BinOp(BinOp),
}

macro_rules! operator_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }
    };
}

operator_enum! {
    /// Unary numeric operators, including tests and conversions.
    UnOp {
        /// `i32.eqz`
        I32Eqz,
        /// `i32.clz`
        I32Clz,
        /// `i32.ctz`
        I32Ctz,
        /// `i32.popcnt`
        I32Popcnt,
        /// `i32.extend8_s`
        I32Extend8S,
        /// `i32.extend16_s`
        I32Extend16S,
        /// `i64.eqz`
        I64Eqz,
        /// `i64.clz`
        I64Clz,
        /// `i64.ctz`
        I64Ctz,
        /// `i64.popcnt`
        I64Popcnt,
        /// `i64.extend8_s`
        I64Extend8S,
        /// `i64.extend16_s`
        I64Extend16S,
        /// `i64.extend32_s`
        I64Extend32S,
        /// `f32.abs`
        F32Abs,
        /// `f32.neg`
        F32Neg,
        /// `f32.ceil`
        F32Ceil,
        /// `f32.floor`
        F32Floor,
        /// `f32.trunc`
        F32Trunc,
        /// `f32.nearest`
        F32Nearest,
        /// `f32.sqrt`
        F32Sqrt,
        /// `f64.abs`
        F64Abs,
        /// `f64.neg`
        F64Neg,
        /// `f64.ceil`
        F64Ceil,
        /// `f64.floor`
        F64Floor,
        /// `f64.trunc`
        F64Trunc,
        /// `f64.nearest`
        F64Nearest,
        /// `f64.sqrt`
        F64Sqrt,
        /// `i32.wrap_i64`
        I32WrapI64,
        /// `i64.extend_i32_s`
        I64ExtendI32S,
        /// `i64.extend_i32_u`
        I64ExtendI32U,
        /// `i32.trunc_f32_s`
        I32TruncF32S,
        /// `i32.trunc_f32_u`
        I32TruncF32U,
        /// `i32.trunc_f64_s`
        I32TruncF64S,
        /// `i32.trunc_f64_u`
        I32TruncF64U,
        /// `i64.trunc_f32_s`
        I64TruncF32S,
        /// `i64.trunc_f32_u`
        I64TruncF32U,
        /// `i64.trunc_f64_s`
        I64TruncF64S,
        /// `i64.trunc_f64_u`
        I64TruncF64U,
        /// `i32.trunc_sat_f32_s`
        I32TruncSatF32S,
        /// `i32.trunc_sat_f32_u`
        I32TruncSatF32U,
        /// `i32.trunc_sat_f64_s`
        I32TruncSatF64S,
        /// `i32.trunc_sat_f64_u`
        I32TruncSatF64U,
        /// `i64.trunc_sat_f32_s`
        I64TruncSatF32S,
        /// `i64.trunc_sat_f32_u`
        I64TruncSatF32U,
        /// `i64.trunc_sat_f64_s`
        I64TruncSatF64S,
        /// `i64.trunc_sat_f64_u`
        I64TruncSatF64U,
        /// `f32.convert_i32_s`
        F32ConvertI32S,
        /// `f32.convert_i32_u`
        F32ConvertI32U,
        /// `f32.convert_i64_s`
        F32ConvertI64S,
        /// `f32.convert_i64_u`
        F32ConvertI64U,
        /// `f64.convert_i32_s`
        F64ConvertI32S,
        /// `f64.convert_i32_u`
        F64ConvertI32U,
        /// `f64.convert_i64_s`
        F64ConvertI64S,
        /// `f64.convert_i64_u`
        F64ConvertI64U,
        /// `f32.demote_f64`
        F32DemoteF64,
        /// `f64.promote_f32`
        F64PromoteF32,
        /// `i32.reinterpret_f32`
        I32ReinterpretF32,
        /// `i64.reinterpret_f64`
        I64ReinterpretF64,
        /// `f32.reinterpret_i32`
        F32ReinterpretI32,
        /// `f64.reinterpret_i64`
        F64ReinterpretI64,
    }
}

operator_enum! {
    /// Binary numeric operators, including comparisons.
    BinOp {
        /// `i32.add`
        I32Add,
        /// `i32.sub`
        I32Sub,
        /// `i32.mul`
        I32Mul,
        /// `i32.div_s`
        I32DivS,
        /// `i32.div_u`
        I32DivU,
        /// `i32.rem_s`
        I32RemS,
        /// `i32.rem_u`
        I32RemU,
        /// `i32.and`
        I32And,
        /// `i32.or`
        I32Or,
        /// `i32.xor`
        I32Xor,
        /// `i32.shl`
        I32Shl,
        /// `i32.shr_s`
        I32ShrS,
        /// `i32.shr_u`
        I32ShrU,
        /// `i32.rotl`
        I32Rotl,
        /// `i32.rotr`
        I32Rotr,
        /// `i32.eq`
        I32Eq,
        /// `i32.ne`
        I32Ne,
        /// `i32.lt_s`
        I32LtS,
        /// `i32.lt_u`
        I32LtU,
        /// `i32.gt_s`
        I32GtS,
        /// `i32.gt_u`
        I32GtU,
        /// `i32.le_s`
        I32LeS,
        /// `i32.le_u`
        I32LeU,
        /// `i32.ge_s`
        I32GeS,
        /// `i32.ge_u`
        I32GeU,
        /// `i64.add`
        I64Add,
        /// `i64.sub`
        I64Sub,
        /// `i64.mul`
        I64Mul,
        /// `i64.div_s`
        I64DivS,
        /// `i64.div_u`
        I64DivU,
        /// `i64.rem_s`
        I64RemS,
        /// `i64.rem_u`
        I64RemU,
        /// `i64.and`
        I64And,
        /// `i64.or`
        I64Or,
        /// `i64.xor`
        I64Xor,
        /// `i64.shl`
        I64Shl,
        /// `i64.shr_s`
        I64ShrS,
        /// `i64.shr_u`
        I64ShrU,
        /// `i64.rotl`
        I64Rotl,
        /// `i64.rotr`
        I64Rotr,
        /// `i64.eq`
        I64Eq,
        /// `i64.ne`
        I64Ne,
        /// `i64.lt_s`
        I64LtS,
        /// `i64.lt_u`
        I64LtU,
        /// `i64.gt_s`
        I64GtS,
        /// `i64.gt_u`
        I64GtU,
        /// `i64.le_s`
        I64LeS,
        /// `i64.le_u`
        I64LeU,
        /// `i64.ge_s`
        I64GeS,
        /// `i64.ge_u`
        I64GeU,
        /// `f32.add`
        F32Add,
        /// `f32.sub`
        F32Sub,
        /// `f32.mul`
        F32Mul,
        /// `f32.div`
        F32Div,
        /// `f32.min`
        F32Min,
        /// `f32.max`
        F32Max,
        /// `f32.copysign`
        F32Copysign,
        /// `f32.eq`
        F32Eq,
        /// `f32.ne`
        F32Ne,
        /// `f32.lt`
        F32Lt,
        /// `f32.gt`
        F32Gt,
        /// `f32.le`
        F32Le,
        /// `f32.ge`
        F32Ge,
        /// `f64.add`
        F64Add,
        /// `f64.sub`
        F64Sub,
        /// `f64.mul`
        F64Mul,
        /// `f64.div`
        F64Div,
        /// `f64.min`
        F64Min,
        /// `f64.max`
        F64Max,
        /// `f64.copysign`
        F64Copysign,
        /// `f64.eq`
        F64Eq,
        /// `f64.ne`
        F64Ne,
        /// `f64.lt`
        F64Lt,
        /// `f64.gt`
        F64Gt,
        /// `f64.le`
        F64Le,
        /// `f64.ge`
        F64Ge,
    }
}

operator_enum! {
    /// Memory load access kinds.
    LoadOp {
        /// `i32.load`
        I32Load,
        /// `i64.load`
        I64Load,
        /// `f32.load`
        F32Load,
        /// `f64.load`
        F64Load,
        /// `i32.load8_s`
        I32Load8S,
        /// `i32.load8_u`
        I32Load8U,
        /// `i32.load16_s`
        I32Load16S,
        /// `i32.load16_u`
        I32Load16U,
        /// `i64.load8_s`
        I64Load8S,
        /// `i64.load8_u`
        I64Load8U,
        /// `i64.load16_s`
        I64Load16S,
        /// `i64.load16_u`
        I64Load16U,
        /// `i64.load32_s`
        I64Load32S,
        /// `i64.load32_u`
        I64Load32U,
    }
}

operator_enum! {
    /// Memory store access kinds.
    StoreOp {
        /// `i32.store`
        I32Store,
        /// `i64.store`
        I64Store,
        /// `f32.store`
        F32Store,
        /// `f64.store`
        F64Store,
        /// `i32.store8`
        I32Store8,
        /// `i32.store16`
        I32Store16,
        /// `i64.store8`
        I64Store8,
        /// `i64.store16`
        I64Store16,
        /// `i64.store32`
        I64Store32,
    }
}

impl LoadOp {
    /// The number of bytes this access reads.
    #[must_use]
    pub const fn width(self) -> u64 {
        match self {
            Self::I32Load8S | Self::I32Load8U | Self::I64Load8S | Self::I64Load8U => 1,
            Self::I32Load16S | Self::I32Load16U | Self::I64Load16S | Self::I64Load16U => 2,
            Self::I32Load | Self::F32Load | Self::I64Load32S | Self::I64Load32U => 4,
            Self::I64Load | Self::F64Load => 8,
        }
    }
}

impl StoreOp {
    /// The number of bytes this access writes.
    #[must_use]
    pub const fn width(self) -> u64 {
        match self {
            Self::I32Store8 | Self::I64Store8 => 1,
            Self::I32Store16 | Self::I64Store16 => 2,
            Self::I32Store | Self::F32Store | Self::I64Store32 => 4,
            Self::I64Store | Self::F64Store => 8,
        }
    }
}

impl UnOp {
    /// Evaluates the operator on an operand word.
    pub fn eval(self, value: UntypedValue) -> Result<UntypedValue> {
        use UntypedValue as V;
        let result = match self {
            Self::I32Eqz => V::from_u32((value.to_i32() == 0).into()),
            Self::I32Clz => V::from_u32(wex_math::i32_clz(value.to_u32())),
            Self::I32Ctz => V::from_u32(wex_math::i32_ctz(value.to_u32())),
            Self::I32Popcnt => V::from_u32(wex_math::i32_popcnt(value.to_u32())),
            Self::I32Extend8S => V::from_i32(wex_math::i32_extend8_s(value.to_i32())),
            Self::I32Extend16S => V::from_i32(wex_math::i32_extend16_s(value.to_i32())),
            Self::I64Eqz => V::from_u32((value.to_i64() == 0).into()),
            Self::I64Clz => V::from_u64(wex_math::i64_clz(value.to_u64())),
            Self::I64Ctz => V::from_u64(wex_math::i64_ctz(value.to_u64())),
            Self::I64Popcnt => V::from_u64(wex_math::i64_popcnt(value.to_u64())),
            Self::I64Extend8S => V::from_i64(wex_math::i64_extend8_s(value.to_i64())),
            Self::I64Extend16S => V::from_i64(wex_math::i64_extend16_s(value.to_i64())),
            Self::I64Extend32S => V::from_i64(wex_math::i64_extend32_s(value.to_i64())),
            Self::F32Abs => V::from_f32(value.to_f32().abs()),
            Self::F32Neg => V::from_f32(-value.to_f32()),
            Self::F32Ceil => V::from_f32(value.to_f32().ceil()),
            Self::F32Floor => V::from_f32(value.to_f32().floor()),
            Self::F32Trunc => V::from_f32(value.to_f32().trunc()),
            Self::F32Nearest => V::from_f32(wex_math::f32_nearest(value.to_f32())),
            Self::F32Sqrt => V::from_f32(value.to_f32().sqrt()),
            Self::F64Abs => V::from_f64(value.to_f64().abs()),
            Self::F64Neg => V::from_f64(-value.to_f64()),
            Self::F64Ceil => V::from_f64(value.to_f64().ceil()),
            Self::F64Floor => V::from_f64(value.to_f64().floor()),
            Self::F64Trunc => V::from_f64(value.to_f64().trunc()),
            Self::F64Nearest => V::from_f64(wex_math::f64_nearest(value.to_f64())),
            Self::F64Sqrt => V::from_f64(value.to_f64().sqrt()),
            Self::I32WrapI64 => V::from_i32(value.to_i64() as i32),
            Self::I64ExtendI32S => V::from_i64(i64::from(value.to_i32())),
            Self::I64ExtendI32U => V::from_u64(u64::from(value.to_u32())),
            Self::I32TruncF32S => V::from_i32(wex_math::i32_trunc_f32_s(value.to_f32())?),
            Self::I32TruncF32U => V::from_u32(wex_math::i32_trunc_f32_u(value.to_f32())?),
            Self::I32TruncF64S => V::from_i32(wex_math::i32_trunc_f64_s(value.to_f64())?),
            Self::I32TruncF64U => V::from_u32(wex_math::i32_trunc_f64_u(value.to_f64())?),
            Self::I64TruncF32S => V::from_i64(wex_math::i64_trunc_f32_s(value.to_f32())?),
            Self::I64TruncF32U => V::from_u64(wex_math::i64_trunc_f32_u(value.to_f32())?),
            Self::I64TruncF64S => V::from_i64(wex_math::i64_trunc_f64_s(value.to_f64())?),
            Self::I64TruncF64U => V::from_u64(wex_math::i64_trunc_f64_u(value.to_f64())?),
            Self::I32TruncSatF32S => V::from_i32(wex_math::i32_trunc_sat_f32_s(value.to_f32())),
            Self::I32TruncSatF32U => V::from_u32(wex_math::i32_trunc_sat_f32_u(value.to_f32())),
            Self::I32TruncSatF64S => V::from_i32(wex_math::i32_trunc_sat_f64_s(value.to_f64())),
            Self::I32TruncSatF64U => V::from_u32(wex_math::i32_trunc_sat_f64_u(value.to_f64())),
            Self::I64TruncSatF32S => V::from_i64(wex_math::i64_trunc_sat_f32_s(value.to_f32())),
            Self::I64TruncSatF32U => V::from_u64(wex_math::i64_trunc_sat_f32_u(value.to_f32())),
            Self::I64TruncSatF64S => V::from_i64(wex_math::i64_trunc_sat_f64_s(value.to_f64())),
            Self::I64TruncSatF64U => V::from_u64(wex_math::i64_trunc_sat_f64_u(value.to_f64())),
            Self::F32ConvertI32S => V::from_f32(value.to_i32() as f32),
            Self::F32ConvertI32U => V::from_f32(value.to_u32() as f32),
            Self::F32ConvertI64S => V::from_f32(value.to_i64() as f32),
            Self::F32ConvertI64U => V::from_f32(value.to_u64() as f32),
            Self::F64ConvertI32S => V::from_f64(f64::from(value.to_i32())),
            Self::F64ConvertI32U => V::from_f64(f64::from(value.to_u32())),
            Self::F64ConvertI64S => V::from_f64(value.to_i64() as f64),
            Self::F64ConvertI64U => V::from_f64(value.to_u64() as f64),
            Self::F32DemoteF64 => V::from_f32(value.to_f64() as f32),
            Self::F64PromoteF32 => V::from_f64(f64::from(value.to_f32())),
            Self::I32ReinterpretF32 | Self::F32ReinterpretI32 => V::from_u32(value.to_u32()),
            Self::I64ReinterpretF64 | Self::F64ReinterpretI64 => value,
        };
        Ok(result)
    }
}

impl BinOp {
    /// Evaluates the operator on two operand words (`lhs` was pushed first).
    pub fn eval(self, lhs: UntypedValue, rhs: UntypedValue) -> Result<UntypedValue> {
        use UntypedValue as V;
        let result = match self {
            Self::I32Add => V::from_i32(lhs.to_i32().wrapping_add(rhs.to_i32())),
            Self::I32Sub => V::from_i32(lhs.to_i32().wrapping_sub(rhs.to_i32())),
            Self::I32Mul => V::from_i32(lhs.to_i32().wrapping_mul(rhs.to_i32())),
            Self::I32DivS => V::from_i32(wex_math::i32_div_s(lhs.to_i32(), rhs.to_i32())?),
            Self::I32DivU => V::from_u32(wex_math::i32_div_u(lhs.to_u32(), rhs.to_u32())?),
            Self::I32RemS => V::from_i32(wex_math::i32_rem_s(lhs.to_i32(), rhs.to_i32())?),
            Self::I32RemU => V::from_u32(wex_math::i32_rem_u(lhs.to_u32(), rhs.to_u32())?),
            Self::I32And => V::from_u32(lhs.to_u32() & rhs.to_u32()),
            Self::I32Or => V::from_u32(lhs.to_u32() | rhs.to_u32()),
            Self::I32Xor => V::from_u32(lhs.to_u32() ^ rhs.to_u32()),
            Self::I32Shl => V::from_i32(wex_math::i32_shl(lhs.to_i32(), rhs.to_i32())),
            Self::I32ShrS => V::from_i32(wex_math::i32_shr_s(lhs.to_i32(), rhs.to_i32())),
            Self::I32ShrU => V::from_u32(wex_math::i32_shr_u(lhs.to_u32(), rhs.to_u32())),
            Self::I32Rotl => V::from_u32(wex_math::i32_rotl(lhs.to_u32(), rhs.to_u32())),
            Self::I32Rotr => V::from_u32(wex_math::i32_rotr(lhs.to_u32(), rhs.to_u32())),
            Self::I32Eq => V::from_u32((lhs.to_i32() == rhs.to_i32()).into()),
            Self::I32Ne => V::from_u32((lhs.to_i32() != rhs.to_i32()).into()),
            Self::I32LtS => V::from_u32((lhs.to_i32() < rhs.to_i32()).into()),
            Self::I32LtU => V::from_u32((lhs.to_u32() < rhs.to_u32()).into()),
            Self::I32GtS => V::from_u32((lhs.to_i32() > rhs.to_i32()).into()),
            Self::I32GtU => V::from_u32((lhs.to_u32() > rhs.to_u32()).into()),
            Self::I32LeS => V::from_u32((lhs.to_i32() <= rhs.to_i32()).into()),
            Self::I32LeU => V::from_u32((lhs.to_u32() <= rhs.to_u32()).into()),
            Self::I32GeS => V::from_u32((lhs.to_i32() >= rhs.to_i32()).into()),
            Self::I32GeU => V::from_u32((lhs.to_u32() >= rhs.to_u32()).into()),
            Self::I64Add => V::from_i64(lhs.to_i64().wrapping_add(rhs.to_i64())),
            Self::I64Sub => V::from_i64(lhs.to_i64().wrapping_sub(rhs.to_i64())),
            Self::I64Mul => V::from_i64(lhs.to_i64().wrapping_mul(rhs.to_i64())),
            Self::I64DivS => V::from_i64(wex_math::i64_div_s(lhs.to_i64(), rhs.to_i64())?),
            Self::I64DivU => V::from_u64(wex_math::i64_div_u(lhs.to_u64(), rhs.to_u64())?),
            Self::I64RemS => V::from_i64(wex_math::i64_rem_s(lhs.to_i64(), rhs.to_i64())?),
            Self::I64RemU => V::from_u64(wex_math::i64_rem_u(lhs.to_u64(), rhs.to_u64())?),
            Self::I64And => V::from_u64(lhs.to_u64() & rhs.to_u64()),
            Self::I64Or => V::from_u64(lhs.to_u64() | rhs.to_u64()),
            Self::I64Xor => V::from_u64(lhs.to_u64() ^ rhs.to_u64()),
            Self::I64Shl => V::from_i64(wex_math::i64_shl(lhs.to_i64(), rhs.to_i64())),
            Self::I64ShrS => V::from_i64(wex_math::i64_shr_s(lhs.to_i64(), rhs.to_i64())),
            Self::I64ShrU => V::from_u64(wex_math::i64_shr_u(lhs.to_u64(), rhs.to_u64())),
            Self::I64Rotl => V::from_u64(wex_math::i64_rotl(lhs.to_u64(), rhs.to_u64())),
            Self::I64Rotr => V::from_u64(wex_math::i64_rotr(lhs.to_u64(), rhs.to_u64())),
            Self::I64Eq => V::from_u32((lhs.to_i64() == rhs.to_i64()).into()),
            Self::I64Ne => V::from_u32((lhs.to_i64() != rhs.to_i64()).into()),
            Self::I64LtS => V::from_u32((lhs.to_i64() < rhs.to_i64()).into()),
            Self::I64LtU => V::from_u32((lhs.to_u64() < rhs.to_u64()).into()),
            Self::I64GtS => V::from_u32((lhs.to_i64() > rhs.to_i64()).into()),
            Self::I64GtU => V::from_u32((lhs.to_u64() > rhs.to_u64()).into()),
            Self::I64LeS => V::from_u32((lhs.to_i64() <= rhs.to_i64()).into()),
            Self::I64LeU => V::from_u32((lhs.to_u64() <= rhs.to_u64()).into()),
            Self::I64GeS => V::from_u32((lhs.to_i64() >= rhs.to_i64()).into()),
            Self::I64GeU => V::from_u32((lhs.to_u64() >= rhs.to_u64()).into()),
            Self::F32Add => V::from_f32(lhs.to_f32() + rhs.to_f32()),
            Self::F32Sub => V::from_f32(lhs.to_f32() - rhs.to_f32()),
            Self::F32Mul => V::from_f32(lhs.to_f32() * rhs.to_f32()),
            Self::F32Div => V::from_f32(lhs.to_f32() / rhs.to_f32()),
            Self::F32Min => V::from_f32(wex_math::f32_min(lhs.to_f32(), rhs.to_f32())),
            Self::F32Max => V::from_f32(wex_math::f32_max(lhs.to_f32(), rhs.to_f32())),
            Self::F32Copysign => V::from_f32(lhs.to_f32().copysign(rhs.to_f32())),
            Self::F32Eq => V::from_u32((lhs.to_f32() == rhs.to_f32()).into()),
            Self::F32Ne => V::from_u32((lhs.to_f32() != rhs.to_f32()).into()),
            Self::F32Lt => V::from_u32((lhs.to_f32() < rhs.to_f32()).into()),
            Self::F32Gt => V::from_u32((lhs.to_f32() > rhs.to_f32()).into()),
            Self::F32Le => V::from_u32((lhs.to_f32() <= rhs.to_f32()).into()),
            Self::F32Ge => V::from_u32((lhs.to_f32() >= rhs.to_f32()).into()),
            Self::F64Add => V::from_f64(lhs.to_f64() + rhs.to_f64()),
            Self::F64Sub => V::from_f64(lhs.to_f64() - rhs.to_f64()),
            Self::F64Mul => V::from_f64(lhs.to_f64() * rhs.to_f64()),
            Self::F64Div => V::from_f64(lhs.to_f64() / rhs.to_f64()),
            Self::F64Min => V::from_f64(wex_math::f64_min(lhs.to_f64(), rhs.to_f64())),
            Self::F64Max => V::from_f64(wex_math::f64_max(lhs.to_f64(), rhs.to_f64())),
            Self::F64Copysign => V::from_f64(lhs.to_f64().copysign(rhs.to_f64())),
            Self::F64Eq => V::from_u32((lhs.to_f64() == rhs.to_f64()).into()),
            Self::F64Ne => V::from_u32((lhs.to_f64() != rhs.to_f64()).into()),
            Self::F64Lt => V::from_u32((lhs.to_f64() < rhs.to_f64()).into()),
            Self::F64Gt => V::from_u32((lhs.to_f64() > rhs.to_f64()).into()),
            Self::F64Le => V::from_u32((lhs.to_f64() <= rhs.to_f64()).into()),
            Self::F64Ge => V::from_u32((lhs.to_f64() >= rhs.to_f64()).into()),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn binop_operand_order() {
        let lhs = UntypedValue::from_i32(7);
        let rhs = UntypedValue::from_i32(2);
        let quotient = BinOp::I32DivS.eval(lhs, rhs).unwrap();
        assert_eq!(quotient.to_i32(), 3);
        let cmp = BinOp::I32GtS.eval(lhs, rhs).unwrap();
        assert_eq!(cmp.to_u32(), 1);
    }

    #[test]
    fn comparisons_produce_i32_booleans() {
        let a = UntypedValue::from_f64(1.5);
        let b = UntypedValue::from_f64(f64::NAN);
        assert_eq!(BinOp::F64Ne.eval(a, b).unwrap().to_u32(), 1);
        assert_eq!(BinOp::F64Eq.eval(b, b).unwrap().to_u32(), 0);
        assert_eq!(BinOp::F64Lt.eval(a, b).unwrap().to_u32(), 0);
    }

    #[test]
    fn reinterpret_preserves_bits() {
        let word = UntypedValue::from_f32(f32::from_bits(0x7fa0_0001));
        let as_int = UnOp::I32ReinterpretF32.eval(word).unwrap();
        assert_eq!(as_int.to_u32(), 0x7fa0_0001);
    }

    #[test]
    fn wrap_discards_high_bits() {
        let word = UntypedValue::from_i64(0x1_2345_6789);
        assert_eq!(UnOp::I32WrapI64.eval(word).unwrap().to_u32(), 0x2345_6789);
    }

    #[test]
    fn access_widths() {
        assert_eq!(LoadOp::I64Load32U.width(), 4);
        assert_eq!(LoadOp::F64Load.width(), 8);
        assert_eq!(StoreOp::I32Store8.width(), 1);
        assert_eq!(StoreOp::I64Store.width(), 8);
    }
}
