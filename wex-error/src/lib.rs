// SPDX-License-Identifier: MIT

//! Error handling for the WEX WebAssembly execution engine.
//!
//! Two disjoint taxonomies are exposed as data so that embedders can catch
//! and inspect the specific failure kind:
//!
//! - Setup-time failures ([`ImportError`], [`InstantiationError`],
//!   [`TranslationError`]) raised while linking, instantiating or lowering a
//!   module. These abort instantiation (or the first call that triggers lazy
//!   translation) entirely.
//! - Runtime traps ([`Trap`]) raised during an invocation. A trap unwinds
//!   exactly one top-level invocation; the store and any other live
//!   instances remain valid and reusable afterwards.
//!
//! All variants funnel into the umbrella [`Error`] type carried by the
//! crate-wide [`Result`] alias.

#![deny(missing_docs)]

pub mod codes;
mod errors;
pub mod kinds;
pub mod prelude;

pub use errors::{Error, ErrorCategory};
pub use kinds::{ImportError, InstantiationError, RuntimeError, Trap, TranslationError};

/// The result type used across the WEX crates.
pub type Result<T> = core::result::Result<T, Error>;
