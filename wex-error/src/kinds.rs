// SPDX-License-Identifier: MIT

//! The concrete error kinds of the four taxonomies.

use core::fmt;

use crate::codes;

/// A runtime-detected illegal operation that aborts the current invocation
/// without corrupting any store-resident state.
///
/// The `Display` representations follow the assertion texts of the
/// WebAssembly reference test suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    /// The `unreachable` instruction was executed.
    Unreachable,
    /// A load or store was outside the bounds of the accessed memory.
    OutOfBoundsMemoryAccess {
        /// First byte of the attempted access.
        address: u64,
        /// Width of the attempted access in bytes.
        length: u64,
    },
    /// A table access was outside the bounds of the accessed table.
    OutOfBoundsTableAccess {
        /// The out-of-range element index.
        index: u64,
    },
    /// A table element holding a null reference was called or read where a
    /// function was required.
    TableUninitialized {
        /// The index of the uninitialized element.
        index: u64,
    },
    /// The declared call-site type of `call_indirect` did not equal the
    /// actual type of the table element.
    IndirectCallTypeMismatch {
        /// Rendered form of the call-site type.
        expected: String,
        /// Rendered form of the table element's type.
        actual: String,
    },
    /// Integer division or remainder by zero.
    IntegerDivideByZero,
    /// Integer arithmetic overflowed (e.g. `i32::MIN / -1`).
    IntegerOverflow,
    /// A float-to-integer truncation of NaN or an out-of-range value.
    InvalidConversionToInteger,
    /// The shared value/frame stack ran out of capacity.
    CallStackExhausted,
}

impl Trap {
    /// The stable numeric code for this trap kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Unreachable => codes::TRAP_UNREACHABLE,
            Self::OutOfBoundsMemoryAccess { .. } => codes::TRAP_OUT_OF_BOUNDS_MEMORY_ACCESS,
            Self::OutOfBoundsTableAccess { .. } => codes::TRAP_OUT_OF_BOUNDS_TABLE_ACCESS,
            Self::TableUninitialized { .. } => codes::TRAP_TABLE_UNINITIALIZED,
            Self::IndirectCallTypeMismatch { .. } => codes::TRAP_INDIRECT_CALL_TYPE_MISMATCH,
            Self::IntegerDivideByZero => codes::TRAP_INTEGER_DIVIDE_BY_ZERO,
            Self::IntegerOverflow => codes::TRAP_INTEGER_OVERFLOW,
            Self::InvalidConversionToInteger => codes::TRAP_INVALID_CONVERSION_TO_INTEGER,
            Self::CallStackExhausted => codes::TRAP_CALL_STACK_EXHAUSTED,
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "unreachable"),
            Self::OutOfBoundsMemoryAccess { address, length } => {
                write!(f, "out of bounds memory access ({length} bytes at {address})")
            },
            Self::OutOfBoundsTableAccess { index } => {
                write!(f, "out of bounds table access (element {index})")
            },
            Self::TableUninitialized { index } => write!(f, "uninitialized element {index}"),
            Self::IndirectCallTypeMismatch { expected, actual } => {
                write!(f, "indirect call type mismatch (expected {expected}, found {actual})")
            },
            Self::IntegerDivideByZero => write!(f, "integer divide by zero"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::InvalidConversionToInteger => write!(f, "invalid conversion to integer"),
            Self::CallStackExhausted => write!(f, "call stack exhausted"),
        }
    }
}

/// A failure to resolve one of a module's declared imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// No external value was supplied under the declared `(module, name)`.
    UnknownImport {
        /// Declared import module namespace.
        module: String,
        /// Declared import field name.
        name: String,
    },
    /// The supplied external value exists but its kind or type is not
    /// compatible with the declaration.
    IncompatibleImportType {
        /// Declared import module namespace.
        module: String,
        /// Declared import field name.
        name: String,
    },
}

impl ImportError {
    /// The stable numeric code for this import error kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::UnknownImport { .. } => codes::IMPORT_UNKNOWN,
            Self::IncompatibleImportType { .. } => codes::IMPORT_INCOMPATIBLE_TYPE,
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownImport { module, name } => {
                write!(f, "unknown import `{module}`.`{name}`")
            },
            Self::IncompatibleImportType { module, name } => {
                write!(f, "incompatible import type for `{module}`.`{name}`")
            },
        }
    }
}

/// A failure while turning a linked module into a live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationError {
    /// An active element segment did not fit its target table.
    OutOfBoundsTableAccess,
    /// An active data segment did not fit its target memory.
    OutOfBoundsMemoryAccess,
    /// A constant initializer expression was malformed (e.g. `global.get`
    /// of a non-imported or mutable global).
    InvalidConstExpression,
    /// The module uses a feature this engine does not implement.
    Unsupported(&'static str),
}

impl InstantiationError {
    /// The stable numeric code for this instantiation error kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::OutOfBoundsTableAccess => codes::INSTANTIATION_OUT_OF_BOUNDS_TABLE_ACCESS,
            Self::OutOfBoundsMemoryAccess => codes::INSTANTIATION_OUT_OF_BOUNDS_MEMORY_ACCESS,
            Self::InvalidConstExpression => codes::INSTANTIATION_INVALID_CONST_EXPRESSION,
            Self::Unsupported(_) => codes::INSTANTIATION_UNSUPPORTED,
        }
    }
}

impl fmt::Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBoundsTableAccess => write!(f, "out of bounds table access"),
            Self::OutOfBoundsMemoryAccess => write!(f, "out of bounds memory access"),
            Self::InvalidConstExpression => write!(f, "invalid constant expression"),
            Self::Unsupported(what) => write!(f, "unsupported operation: {what}"),
        }
    }
}

/// A structural defect found while lowering a function body to the flat,
/// directly-dispatchable form.
///
/// Translation is lazy, so these surface at the first call that compiles
/// the affected function, never as undefined behavior at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// A branch named a label depth with no enclosing block.
    UnknownLabel {
        /// The relative depth the branch asked for.
        depth: u32,
    },
    /// An `else` appeared outside an `if` block.
    ElseWithoutIf,
    /// The body ran out of instructions with blocks still open.
    MissingEnd,
    /// An instruction required more operands than were on the stack.
    OperandStackUnderflow,
    /// An instruction referred outside one of the module index spaces.
    UnknownIndex {
        /// Which index space was violated.
        space: &'static str,
        /// The offending index.
        index: u32,
    },
    /// More parameter/local slots were declared than can be addressed.
    TooManyLocals {
        /// The declared slot count.
        count: usize,
    },
    /// The operand stack exceeded the representable slot range.
    StackHeightLimitExceeded,
    /// The values left on the stack at the final `end` did not match the
    /// declared result count.
    ResultArityMismatch {
        /// Result count declared by the function type.
        expected: usize,
        /// Values actually left on the operand stack.
        found: usize,
    },
    /// A `global.set` named a global declared immutable.
    ImmutableGlobal {
        /// The offending global index.
        index: u32,
    },
}

impl TranslationError {
    /// The stable numeric code for this translation error kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::UnknownLabel { .. } => codes::TRANSLATION_UNKNOWN_LABEL,
            Self::ElseWithoutIf => codes::TRANSLATION_ELSE_WITHOUT_IF,
            Self::MissingEnd => codes::TRANSLATION_MISSING_END,
            Self::OperandStackUnderflow => codes::TRANSLATION_OPERAND_STACK_UNDERFLOW,
            Self::UnknownIndex { .. } => codes::TRANSLATION_UNKNOWN_INDEX,
            Self::TooManyLocals { .. } => codes::TRANSLATION_TOO_MANY_LOCALS,
            Self::StackHeightLimitExceeded => codes::TRANSLATION_STACK_HEIGHT_LIMIT,
            Self::ResultArityMismatch { .. } => codes::TRANSLATION_RESULT_ARITY_MISMATCH,
            Self::ImmutableGlobal { .. } => codes::TRANSLATION_IMMUTABLE_GLOBAL,
        }
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLabel { depth } => write!(f, "unknown label at depth {depth}"),
            Self::ElseWithoutIf => write!(f, "`else` without matching `if`"),
            Self::MissingEnd => write!(f, "function body ended with open blocks"),
            Self::OperandStackUnderflow => write!(f, "operand stack underflow"),
            Self::UnknownIndex { space, index } => write!(f, "unknown {space} index {index}"),
            Self::TooManyLocals { count } => write!(f, "too many locals: {count}"),
            Self::StackHeightLimitExceeded => write!(f, "operand stack height limit exceeded"),
            Self::ResultArityMismatch { expected, found } => {
                write!(f, "expected {expected} results, found {found}")
            },
            Self::ImmutableGlobal { index } => write!(f, "global {index} is immutable"),
        }
    }
}

/// A misuse of the embedder-facing API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The requested export name does not exist on the instance.
    ExportNotFound {
        /// The name that was looked up.
        name: String,
    },
    /// The requested export exists but is not a function.
    NotAFunction {
        /// The name that was looked up.
        name: String,
    },
    /// The invocation argument count did not match the function type.
    ArgumentArityMismatch {
        /// Parameter count declared by the function type.
        expected: usize,
        /// Arguments actually supplied.
        found: usize,
    },
    /// An invocation argument had the wrong type.
    ArgumentTypeMismatch {
        /// Zero-based position of the offending argument.
        index: usize,
        /// Rendered name of the declared parameter type.
        expected: &'static str,
    },
    /// A store address referred to an object the store does not hold.
    InvalidAddress,
}

impl RuntimeError {
    /// The stable numeric code for this runtime error kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::ExportNotFound { .. } => codes::RUNTIME_EXPORT_NOT_FOUND,
            Self::NotAFunction { .. } => codes::RUNTIME_NOT_A_FUNCTION,
            Self::ArgumentArityMismatch { .. } => codes::RUNTIME_ARGUMENT_ARITY_MISMATCH,
            Self::ArgumentTypeMismatch { .. } => codes::RUNTIME_ARGUMENT_TYPE_MISMATCH,
            Self::InvalidAddress => codes::RUNTIME_INVALID_ADDRESS,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExportNotFound { name } => write!(f, "export `{name}` not found"),
            Self::NotAFunction { name } => write!(f, "export `{name}` is not a function"),
            Self::ArgumentArityMismatch { expected, found } => {
                write!(f, "expected {expected} arguments, found {found}")
            },
            Self::ArgumentTypeMismatch { index, expected } => {
                write!(f, "argument {index} must be of type {expected}")
            },
            Self::InvalidAddress => write!(f, "invalid store address"),
        }
    }
}
