// SPDX-License-Identifier: MIT

//! The umbrella [`Error`] type and its category classification.

use core::fmt;

use crate::kinds::{ImportError, InstantiationError, RuntimeError, Trap, TranslationError};

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// A WebAssembly trap raised during execution.
    RuntimeTrap = 1,
    /// A failure to resolve a declared import.
    Import = 2,
    /// A failure while instantiating a module.
    Instantiation = 3,
    /// A defect found while lowering a function body.
    Translation = 4,
    /// A misuse of the embedder-facing API.
    Runtime = 5,
}

/// The main error type of the WEX crates.
///
/// Constructed from the taxonomy kinds via `From`; match on the variant (or
/// use [`Error::as_trap`]) to inspect the specific failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A runtime trap. See [`Trap`].
    Trap(Trap),
    /// An import resolution failure. See [`ImportError`].
    Import(ImportError),
    /// An instantiation failure. See [`InstantiationError`].
    Instantiation(InstantiationError),
    /// A translation failure. See [`TranslationError`].
    Translation(TranslationError),
    /// An embedder API misuse. See [`RuntimeError`].
    Runtime(RuntimeError),
}

impl Error {
    /// The category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Trap(_) => ErrorCategory::RuntimeTrap,
            Self::Import(_) => ErrorCategory::Import,
            Self::Instantiation(_) => ErrorCategory::Instantiation,
            Self::Translation(_) => ErrorCategory::Translation,
            Self::Runtime(_) => ErrorCategory::Runtime,
        }
    }

    /// The stable numeric code of the underlying kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Trap(e) => e.code(),
            Self::Import(e) => e.code(),
            Self::Instantiation(e) => e.code(),
            Self::Translation(e) => e.code(),
            Self::Runtime(e) => e.code(),
        }
    }

    /// Returns the contained trap, if this error is one.
    #[must_use]
    pub const fn as_trap(&self) -> Option<&Trap> {
        match self {
            Self::Trap(trap) => Some(trap),
            _ => None,
        }
    }

    /// Whether this error is a runtime trap.
    #[must_use]
    pub const fn is_trap(&self) -> bool {
        matches!(self, Self::Trap(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trap(e) => fmt::Display::fmt(e, f),
            Self::Import(e) => fmt::Display::fmt(e, f),
            Self::Instantiation(e) => fmt::Display::fmt(e, f),
            Self::Translation(e) => fmt::Display::fmt(e, f),
            Self::Runtime(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<Trap> for Error {
    fn from(trap: Trap) -> Self {
        Self::Trap(trap)
    }
}

impl From<ImportError> for Error {
    fn from(err: ImportError) -> Self {
        Self::Import(err)
    }
}

impl From<InstantiationError> for Error {
    fn from(err: InstantiationError) -> Self {
        Self::Instantiation(err)
    }
}

impl From<TranslationError> for Error {
    fn from(err: TranslationError) -> Self {
        Self::Translation(err)
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Self::Runtime(err)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::codes;

    #[test]
    fn trap_display_matches_reference_assertion_texts() {
        assert_eq!(Trap::IntegerDivideByZero.to_string(), "integer divide by zero");
        assert_eq!(Trap::IntegerOverflow.to_string(), "integer overflow");
        assert_eq!(Trap::CallStackExhausted.to_string(), "call stack exhausted");
        assert!(Trap::OutOfBoundsMemoryAccess { address: 65536, length: 4 }
            .to_string()
            .starts_with("out of bounds memory access"));
    }

    #[test]
    fn categories_and_codes_are_stable() {
        let err = Error::from(Trap::Unreachable);
        assert_eq!(err.category(), ErrorCategory::RuntimeTrap);
        assert_eq!(err.code(), codes::TRAP_UNREACHABLE);
        assert!(err.is_trap());

        let err = Error::from(InstantiationError::OutOfBoundsMemoryAccess);
        assert_eq!(err.category(), ErrorCategory::Instantiation);
        assert_eq!(err.code(), codes::INSTANTIATION_OUT_OF_BOUNDS_MEMORY_ACCESS);
        assert!(err.as_trap().is_none());
    }
}
