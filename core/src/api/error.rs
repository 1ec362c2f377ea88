//! Public error types.
//!
//! Emitter errors ([`EmitError`](crate::error::EmitError)) describe one
//! failed call. When a whole listing is verified, they are converted into
//! [`Diagnostic`]s pointing at the offending source line.

use crate::listing::Span;
use crate::{String, Vec, fmt};

/// Error returned by the listing entry points.
#[derive(Debug)]
pub enum Error {
    /// Invalid API usage.
    Api(String),

    /// The listing failed to parse or to verify.
    ///
    /// Contains one or more diagnostics with source locations and context.
    Listing {
        diagnostics: Vec<Diagnostic>,
        source: String,
        filename: Option<String>,
    },
}

impl Error {
    /// Set the filename for this error.
    pub fn with_filename(self, filename: impl Into<String>) -> Self {
        match self {
            Error::Listing {
                diagnostics,
                source,
                ..
            } => Error::Listing {
                diagnostics,
                source,
                filename: Some(filename.into()),
            },
            other => other,
        }
    }

    /// Get the filename associated with this error, if any.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Error::Listing { filename, .. } => filename.as_deref(),
            Error::Api(_) => None,
        }
    }

    /// Set the filename if provided, otherwise return self unchanged.
    pub fn with_filename_opt(self, filename: Option<&str>) -> Self {
        match filename {
            Some(f) => self.with_filename(f),
            None => self,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Listing { diagnostics, .. } => diagnostics,
            Error::Api(_) => &[],
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            Error::Listing { diagnostics, .. } => {
                let error_count = diagnostics
                    .iter()
                    .filter(|d| d.severity == Severity::Error)
                    .count();
                write!(f, "Verification failed with {} error(s)", error_count)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Help messages suggesting how to fix the issue.
    pub help: Vec<String>,

    /// Error code: `L001` parse, `V001` verification, `V002` invalid
    /// operation, `V003` argument.
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            related: Vec::new(),
            help: Vec::new(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedInfo {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - the listing is rejected.
    Error,
    /// Warning - suspicious but accepted.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "region opened here").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}
