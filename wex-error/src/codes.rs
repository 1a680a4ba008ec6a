// SPDX-License-Identifier: MIT

//! Stable numeric codes for every error kind.
//!
//! Codes are grouped by taxonomy so that an embedder logging or mapping
//! failures does not need to match on the full enum shape.

// Trap codes (1000-1999)
/// The `unreachable` instruction was executed.
pub const TRAP_UNREACHABLE: u16 = 1000;
/// A memory access was outside the bounds of the accessed linear memory.
pub const TRAP_OUT_OF_BOUNDS_MEMORY_ACCESS: u16 = 1001;
/// A table access was outside the bounds of the accessed table.
pub const TRAP_OUT_OF_BOUNDS_TABLE_ACCESS: u16 = 1002;
/// A table element was read before being initialized.
pub const TRAP_TABLE_UNINITIALIZED: u16 = 1003;
/// The callee signature of `call_indirect` did not match the table element.
pub const TRAP_INDIRECT_CALL_TYPE_MISMATCH: u16 = 1004;
/// Integer division or remainder by zero.
pub const TRAP_INTEGER_DIVIDE_BY_ZERO: u16 = 1005;
/// Integer arithmetic overflowed (e.g. `i32::MIN / -1`).
pub const TRAP_INTEGER_OVERFLOW: u16 = 1006;
/// A float-to-integer truncation had no representable result.
pub const TRAP_INVALID_CONVERSION_TO_INTEGER: u16 = 1007;
/// The shared value/frame stack capacity was exhausted.
pub const TRAP_CALL_STACK_EXHAUSTED: u16 = 1008;

// Translation error codes (2000-2999)
/// A branch referred to a label depth with no enclosing block.
pub const TRANSLATION_UNKNOWN_LABEL: u16 = 2000;
/// An `else` appeared without a matching `if`.
pub const TRANSLATION_ELSE_WITHOUT_IF: u16 = 2001;
/// A function body ended without closing all open blocks.
pub const TRANSLATION_MISSING_END: u16 = 2002;
/// An instruction popped more operands than the stack held.
pub const TRANSLATION_OPERAND_STACK_UNDERFLOW: u16 = 2003;
/// An index referred outside its module index space.
pub const TRANSLATION_UNKNOWN_INDEX: u16 = 2004;
/// The function declared more locals than the engine can address.
pub const TRANSLATION_TOO_MANY_LOCALS: u16 = 2005;
/// The operand stack grew beyond the representable slot range.
pub const TRANSLATION_STACK_HEIGHT_LIMIT: u16 = 2006;
/// The values left at the end of a body did not match the declared results.
pub const TRANSLATION_RESULT_ARITY_MISMATCH: u16 = 2007;
/// A `global.set` targeted an immutable global.
pub const TRANSLATION_IMMUTABLE_GLOBAL: u16 = 2008;

// Instantiation error codes (3000-3999)
/// An active element segment initializer was out of bounds for its table.
pub const INSTANTIATION_OUT_OF_BOUNDS_TABLE_ACCESS: u16 = 3000;
/// An active data segment initializer was out of bounds for its memory.
pub const INSTANTIATION_OUT_OF_BOUNDS_MEMORY_ACCESS: u16 = 3001;
/// A constant initializer expression could not be evaluated.
pub const INSTANTIATION_INVALID_CONST_EXPRESSION: u16 = 3002;
/// The module requires a feature this engine does not support.
pub const INSTANTIATION_UNSUPPORTED: u16 = 3003;

// Import error codes (4000-4999)
/// No external value was supplied for a declared import.
pub const IMPORT_UNKNOWN: u16 = 4000;
/// The supplied external value did not match the declared import type.
pub const IMPORT_INCOMPATIBLE_TYPE: u16 = 4001;

// Runtime (embedder API) error codes (5000-5999)
/// The requested export name does not exist on the instance.
pub const RUNTIME_EXPORT_NOT_FOUND: u16 = 5000;
/// The requested export exists but is not a function.
pub const RUNTIME_NOT_A_FUNCTION: u16 = 5001;
/// The invocation argument count did not match the function type.
pub const RUNTIME_ARGUMENT_ARITY_MISMATCH: u16 = 5002;
/// An invocation argument type did not match the function type.
pub const RUNTIME_ARGUMENT_TYPE_MISMATCH: u16 = 5003;
/// A store address referred to an object the store does not hold.
pub const RUNTIME_INVALID_ADDRESS: u16 = 5004;
