use verasm_types::SemanticType;

use crate::error::VerifyError;
use crate::transition::Alternative;
use crate::Vec;

/// The operand stack of one program point, bottom first.
#[derive(Clone, Debug, Default)]
pub struct AbstractStack {
    items: Vec<SemanticType>,
    max_depth: usize,
    limit: usize,
}

impl AbstractStack {
    pub fn new(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            max_depth: 0,
            limit,
        }
    }

    pub fn as_slice(&self) -> &[SemanticType] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn top(&self) -> Option<&SemanticType> {
        self.items.last()
    }

    /// Deepest the stack has been since creation.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Pops the alternative's inputs and pushes its outputs.
    ///
    /// The caller has already selected `alt` against this stack.
    pub fn apply(&mut self, instruction: &str, alt: &Alternative) -> Result<(), VerifyError> {
        let keep = self.items.len().saturating_sub(alt.arity());
        self.items.truncate(keep);
        self.items.extend(alt.outputs().iter().cloned());
        self.record_depth(instruction)
    }

    pub fn push(&mut self, instruction: &str, ty: SemanticType) -> Result<(), VerifyError> {
        self.items.push(ty);
        self.record_depth(instruction)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replaces the whole stack, as when control arrives at a label.
    pub fn replace(&mut self, instruction: &str, shape: &[SemanticType]) -> Result<(), VerifyError> {
        self.items.clear();
        self.items.extend_from_slice(shape);
        self.record_depth(instruction)
    }

    fn record_depth(&mut self, instruction: &str) -> Result<(), VerifyError> {
        let depth = self.items.len();
        if depth > self.limit {
            return Err(VerifyError::StackLimitExceeded {
                instruction: instruction.into(),
                depth,
                limit: self.limit,
            });
        }
        self.max_depth = self.max_depth.max(depth);
        Ok(())
    }
}
