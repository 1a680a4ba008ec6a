// SPDX-License-Identifier: MIT

//! Function instances: guest functions bound to their instance, and host
//! functions wrapping native closures.

use std::fmt;
use std::sync::Arc;

use wex_error::Result;
use wex_foundation::{FuncIdx, FuncType, InstanceAddr, Value};

use crate::module::Module;
use crate::store::Caller;

/// The signature of a host function implementation.
///
/// Arguments arrive tagged; results are written into the pre-sized output
/// slice. The [`Caller`] grants reentrant access to the store and the
/// in-flight execution stack.
pub type HostFunc =
    dyn Fn(Caller<'_>, &[Value], &mut [Value]) -> Result<()> + Send + Sync + 'static;

/// A store-allocated function.
pub enum FunctionInstance {
    /// A function defined by an instantiated module.
    Guest {
        /// The resolved signature.
        ty: FuncType,
        /// The defining module, for lazy body translation.
        module: Arc<Module>,
        /// The instance the function closes over.
        instance: InstanceAddr,
        /// Index in the defining module's function index space.
        func_idx: FuncIdx,
    },
    /// A function implemented by the embedder.
    Host {
        /// The declared signature.
        ty: FuncType,
        /// The native implementation.
        code: Arc<HostFunc>,
    },
}

impl FunctionInstance {
    /// The function's signature.
    #[must_use]
    pub fn ty(&self) -> &FuncType {
        match self {
            Self::Guest { ty, .. } | Self::Host { ty, .. } => ty,
        }
    }
}

impl fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest { ty, instance, func_idx, .. } => f
                .debug_struct("Guest")
                .field("ty", ty)
                .field("instance", instance)
                .field("func_idx", func_idx)
                .finish(),
            Self::Host { ty, .. } => f.debug_struct("Host").field("ty", ty).finish_non_exhaustive(),
        }
    }
}
