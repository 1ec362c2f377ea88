//! Verasm - a verifying assembler for a typed stack machine
//!
//! # Overview
//!
//! Verasm checks instruction streams before they are handed to a code
//! generator. Every instruction is run against an abstract operand stack, so
//! a body that would underflow, mix incompatible types, jump between
//! exception blocks, or fall off its end is rejected at the instruction that
//! caused it.
//!
//! There are two ways in:
//!
//! 1. **Emitter**: build a body one call at a time, with typed handles for
//!    labels, locals and exception blocks.
//! 2. **Listings**: verify a text listing and get diagnostics with source
//!    locations.
//!
//! # Quick Start
//!
//! ```
//! use verasm::emitter::{Emitter, Signature};
//! use verasm::types::SemanticType;
//!
//! let mut e = Emitter::new("clamp", Signature::new([SemanticType::Int32], Some(SemanticType::Int32)));
//! let keep = e.define_label(Some("keep"));
//! e.load_argument(0)?;
//! e.load_constant(0)?;
//! e.branch_if(verasm::ops::BranchCondition::GreaterOrEqual, keep)?;
//! e.load_constant(0)?;
//! e.ret()?;
//! e.mark_label(keep)?;
//! e.load_argument(0)?;
//! e.ret()?;
//! let body = e.finalize()?;
//! assert_eq!(body.max_stack, 2);
//! # Ok::<(), verasm::EmitError>(())
//! ```
//!
//! # Listings
//!
//! ```
//! use verasm::{EmitterOptionsOverride, verify_listing};
//!
//! let source = "method f() -> int32\n  ldc.i4 1\n  ldstr \"x\"\n  add\n  ret\nend\n";
//! let err = verify_listing(source, &EmitterOptionsOverride::default()).unwrap_err();
//! assert_eq!(err.diagnostics()[0].code.as_deref(), Some("V001"));
//! ```

// Error rendering utilities
pub mod error_renderer;
pub use error_renderer::{RenderConfig, render_error, render_error_to};

// Re-export public API from verasm_core
pub use verasm_core::api::{
    Diagnostic, EmitterOptions, EmitterOptionsOverride, Error, RelatedInfo, Severity,
    verify_listing,
};

pub use verasm_core::emitter::{self, Emitter, Signature, VerifiedBody};
pub use verasm_core::error::{EmitError, EmitResult, ErrorKind};
pub use verasm_core::members::{self, ConstructorRef, FieldOwner, FieldRef, MethodRef};
pub use verasm_core::ops;
pub use verasm_core::state::{Catch, Finally, Label, Local, Region};
pub use verasm_core::types::{self, ClassType, SemanticType};
