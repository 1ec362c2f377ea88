//! Text listings.
//!
//! A listing declares classes and methods; each method body is a sequence of
//! directives, labels and instructions that is verified with an
//! [`Emitter`](crate::emitter::Emitter):
//!
//! ```text
//! class NotFound : System.Exception
//!
//! method lookup(int32[], int32) -> int32
//!   local result int32
//!   try t
//!     ldarg 0
//!     ldarg 1
//!     ldelem int32
//!     stloc result
//!     leave done
//!   catch t NotFound
//!     pop
//!     ldc.i4 -1
//!     stloc result
//!     leave done
//!   end_catch t
//!   end_try t
//! done:
//!   ldloc result
//!   ret
//! end
//! ```
//!
//! Comments start with `//` or `;`. Labels are created on first mention.

mod driver;
mod error;
mod parser;

use core::ops::Range;

use tracing::debug;

use crate::api::{EmitterOptionsOverride, Error};
use crate::emitter::VerifiedBody;
use crate::{String, Vec};

pub use error::{PARSE, RESOLVE, emit_code};

/// Byte range in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span(pub Range<usize>);

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span(range)
    }
}

/// Parses and verifies every method in `source`.
///
/// On failure the error carries one diagnostic per rejected method (or a
/// single one if the listing does not parse).
///
/// ```
/// use verasm_core::api::{EmitterOptionsOverride, verify_listing};
///
/// let source = "method id(int64) -> int64\n  ldarg 0\n  ret\nend\n";
/// let bodies = verify_listing(source, &EmitterOptionsOverride::default()).unwrap();
/// assert_eq!(bodies[0].max_stack, 1);
/// ```
pub fn verify_listing(source: &str, overrides: &EmitterOptionsOverride) -> Result<Vec<VerifiedBody>, Error> {
    let mut options = crate::api::EmitterOptions::default();
    options.override_with(overrides);

    let lines = parser::parse(source).map_err(|err| {
        debug!("Listing failed to parse: {:?}", err);
        listing_error(Vec::from([error::parse_diagnostic(err)]), source)
    })?;
    debug!(lines = lines.len(), "Parsed listing");

    driver::Driver::new(options)
        .run(lines)
        .map_err(|diagnostics| listing_error(diagnostics, source))
}

fn listing_error(diagnostics: Vec<crate::api::Diagnostic>, source: &str) -> Error {
    Error::Listing {
        diagnostics,
        source: String::from(source),
        filename: None,
    }
}
