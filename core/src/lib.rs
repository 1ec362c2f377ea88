#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

//! Core of the verifying assembler.
//!
//! An [`Emitter`](emitter::Emitter) accepts typed stack-machine instructions
//! one at a time and checks each against an abstract operand stack before
//! recording it. Stack underflow, type mismatches, unbalanced control flow and
//! exception-region misuse are reported at the call that introduced them.
//!
//! ```
//! use verasm_core::emitter::{Emitter, Signature};
//! use verasm_core::types::SemanticType;
//!
//! let mut e = Emitter::new("add_one", Signature::new([SemanticType::Int32], Some(SemanticType::Int32)));
//! e.load_argument(0)?;
//! e.load_constant(1)?;
//! e.add()?;
//! e.ret()?;
//! let body = e.finalize()?;
//! assert_eq!(body.max_stack, 2);
//! # Ok::<(), verasm_core::error::EmitError>(())
//! ```

// This works on std and no_std and is harmless.
extern crate alloc;

// Exports some symbols publicly basically so that macros can always refer to these.
#[doc(hidden)]
pub mod shim {
    pub use alloc::{boxed::Box, fmt, format, string::String, string::ToString, vec, vec::Vec};
}

// Re-export (crate only) for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use shim::*;

pub mod api;
pub mod emitter;
pub mod error;
pub mod instruction;
pub mod listing;
pub mod members;
pub mod ops;
pub mod state;
pub mod transition;

pub use verasm_types as types;
