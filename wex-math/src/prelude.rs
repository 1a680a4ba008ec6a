// SPDX-License-Identifier: MIT

//! Prelude module for wex-math.

pub use wex_error::{Error, Result};

pub use crate::ops::*;
