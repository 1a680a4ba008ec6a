// SPDX-License-Identifier: MIT

//! Crate prelude re-exporting the error surface in one import.

pub use crate::{
    codes, Error, ErrorCategory, ImportError, InstantiationError, Result, RuntimeError, Trap,
    TranslationError,
};
