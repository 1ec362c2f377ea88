//! Public API for verifying whole listings.
//!
//! # Example
//!
//! ```
//! use verasm_core::api::{EmitterOptionsOverride, verify_listing};
//!
//! let source = "
//! method twice(int32) -> int32
//!   ldarg 0
//!   dup
//!   add
//!   ret
//! end
//! ";
//! let bodies = verify_listing(source, &EmitterOptionsOverride::default()).unwrap();
//! assert_eq!(bodies[0].max_stack, 2);
//! ```

pub mod error;
pub mod options;

pub use crate::listing::verify_listing;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use options::{EmitterOptions, EmitterOptionsOverride};
