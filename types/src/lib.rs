//! Semantic types for the verifying assembler.
//!
//! This crate describes the values that can live on the abstract operand
//! stack and answers the single question the verifier keeps asking:
//! "can a value of type A be used where type B is expected?"
//!
//! # Example
//!
//! ```
//! use verasm_types::{ClassType, SemanticType, is_assignable};
//!
//! let io_error = ClassType::new("IoError", ClassType::exception());
//! let thrown = SemanticType::Object(io_error);
//!
//! assert!(is_assignable(&thrown, &SemanticType::exception()));
//! assert!(is_assignable(&SemanticType::Int32, &SemanticType::NativeInt));
//! assert!(!is_assignable(&SemanticType::Int32, &SemanticType::Int64));
//! ```

#![no_std]
extern crate alloc;

mod assign;
pub mod semantic;

pub use assign::{is_assignable, is_shape_assignable};
pub use semantic::{ClassType, FamilySet, SemanticType};
