// SPDX-License-Identifier: MIT

//! Numeric operation semantics for the WEX WebAssembly execution engine.
//!
//! Every WebAssembly numeric instruction with a non-trivial semantics lives
//! here as a free function: trapping integer division, shift-amount masking,
//! the deterministic float `min`/`max`/`nearest` rules, and the full set of
//! conversions including the trapping and saturating truncations. Keeping
//! these out of the interpreter loop makes each rule testable in isolation.
//!
//! Functions that can trap return [`wex_error::Result`]; all others are
//! total and return plain values.

#![deny(missing_docs)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]

pub mod ops;
pub mod prelude;

pub use ops::*;
