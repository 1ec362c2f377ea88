//! Emitter configuration.
//!
//! Options come in pairs: a complete struct with defaults, and an override
//! struct whose `None` fields leave the base value alone.

/// Limits and checks applied by an [`Emitter`](crate::emitter::Emitter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterOptions {
    /// Deepest the abstract stack may grow before emission fails.
    pub max_stack: usize,
    /// Whether finalization rejects labels that were defined but never
    /// marked.
    pub require_marked_labels: bool,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            max_stack: 1024,
            require_marked_labels: true,
        }
    }
}

impl EmitterOptions {
    /// Applies every field set in `overrides`.
    pub fn override_with(&mut self, overrides: &EmitterOptionsOverride) {
        if let Some(max_stack) = overrides.max_stack {
            self.max_stack = max_stack;
        }
        if let Some(require_marked_labels) = overrides.require_marked_labels {
            self.require_marked_labels = require_marked_labels;
        }
    }
}

/// Partial [`EmitterOptions`].
///
/// ```
/// use verasm_core::api::{EmitterOptions, EmitterOptionsOverride};
///
/// let mut options = EmitterOptions::default();
/// options.override_with(&EmitterOptionsOverride {
///     max_stack: Some(8),
///     ..Default::default()
/// });
/// assert_eq!(options.max_stack, 8);
/// assert!(options.require_marked_labels);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitterOptionsOverride {
    pub max_stack: Option<usize>,
    pub require_marked_labels: Option<bool>,
}
