//! Stack transitions: the declared effect of one instruction.
//!
//! A [`StackTransition`] is an ordered list of [`Alternative`]s. Each names
//! the operand types it consumes and the types it pushes back. Selection
//! walks the alternatives in declaration order and the first one whose
//! inputs fit the stack wins, so more specific alternatives go first.
//!
//! Inputs are written in operand order (the first operand is the deepest
//! stack entry) and are checked from the top of the stack downward.

use ecow::EcoString;
use smallvec::SmallVec;
use verasm_types::{SemanticType, is_assignable};

use crate::error::{Expectation, VerifyError};
use crate::{Vec, format};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alternative {
    inputs: SmallVec<[SemanticType; 3]>,
    outputs: SmallVec<[SemanticType; 2]>,
}

impl Alternative {
    pub fn new(
        inputs: impl IntoIterator<Item = SemanticType>,
        outputs: impl IntoIterator<Item = SemanticType>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    pub fn inputs(&self) -> &[SemanticType] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SemanticType] {
        &self.outputs
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    /// Input expected at `depth` entries below the top of the stack.
    fn input_at_depth(&self, depth: usize) -> &SemanticType {
        &self.inputs[self.inputs.len() - 1 - depth]
    }

    /// True if every input fits the corresponding entry at the top of
    /// `stack`.
    fn accepts(&self, stack: &[SemanticType]) -> bool {
        let depth = stack.len();
        self.arity() <= depth
            && (0..self.arity()).all(|slot| is_assignable(&stack[depth - 1 - slot], self.input_at_depth(slot)))
    }

    /// Net change in stack depth.
    pub fn delta(&self) -> isize {
        self.outputs.len() as isize - self.inputs.len() as isize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackTransition {
    alternatives: SmallVec<[Alternative; 2]>,
    subject: Option<EcoString>,
}

impl StackTransition {
    pub fn new(alternatives: impl IntoIterator<Item = Alternative>) -> Self {
        Self {
            alternatives: alternatives.into_iter().collect(),
            subject: None,
        }
    }

    /// A transition with exactly one alternative.
    pub fn single(
        inputs: impl IntoIterator<Item = SemanticType>,
        outputs: impl IntoIterator<Item = SemanticType>,
    ) -> Self {
        Self::new([Alternative::new(inputs, outputs)])
    }

    /// Pushes `outputs` without consuming anything.
    pub fn push(outputs: impl IntoIterator<Item = SemanticType>) -> Self {
        Self::single([], outputs)
    }

    /// Leaves the stack untouched.
    pub fn none() -> Self {
        Self::single([], [])
    }

    /// Names the operand family that chose this rule, for diagnostics
    /// ("Add with an int32 expects ...").
    pub fn with_subject(mut self, subject: impl Into<EcoString>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Picks the first alternative, in declaration order, whose inputs fit
    /// `stack`.
    ///
    /// Arity is checked before types: if the stack is shallower than every
    /// alternative the error names the smallest arity. Otherwise the error
    /// describes the first slot, from the top down, that no alternative
    /// accepts.
    pub fn select(&self, instruction: &str, stack: &[SemanticType]) -> Result<&Alternative, VerifyError> {
        let depth = stack.len();
        let min_arity = self.alternatives.iter().map(Alternative::arity).min().unwrap_or(0);
        if depth < min_arity {
            return Err(VerifyError::StackUnderflow {
                instruction: instruction.into(),
                expected: min_arity,
                found: depth,
            });
        }

        match self.alternatives.iter().find(|alt| alt.accepts(stack)) {
            Some(alt) => Ok(alt),
            None => Err(self.mismatch(instruction, stack)),
        }
    }

    /// Explains why no alternative fits `stack`.
    ///
    /// Only alternatives sharing the arity of the first one that fits on the
    /// stack are compared, so the reported position names the same operand
    /// in each of them.
    fn mismatch(&self, instruction: &str, stack: &[SemanticType]) -> VerifyError {
        let depth = stack.len();
        let arity = self
            .alternatives
            .iter()
            .map(Alternative::arity)
            .find(|&arity| arity <= depth)
            .unwrap_or(0);
        let mut alive: Vec<&Alternative> = self
            .alternatives
            .iter()
            .filter(|alt| alt.arity() == arity)
            .collect();

        for slot in 0..arity {
            let found = &stack[depth - 1 - slot];
            let survivors: Vec<&Alternative> = alive
                .iter()
                .copied()
                .filter(|alt| is_assignable(found, alt.input_at_depth(slot)))
                .collect();
            if survivors.is_empty() {
                return VerifyError::TypeMismatch {
                    instruction: instruction.into(),
                    subject: self.subject.clone(),
                    position: arity - slot,
                    expected: Expectation::from_slots(alive.iter().map(|alt| alt.input_at_depth(slot))),
                    found: found.clone(),
                };
            }
            alive = survivors;
        }

        // Only reachable for a transition with no alternatives.
        VerifyError::StackUnderflow {
            instruction: instruction.into(),
            expected: arity,
            found: depth,
        }
    }
}

impl core::fmt::Display for Alternative {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let list = |types: &[SemanticType]| {
            types
                .iter()
                .map(|ty| format!("{ty}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "[{}] -> [{}]", list(&self.inputs), list(&self.outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Expectation;
    use pretty_assertions::assert_eq;
    use verasm_types::FamilySet;

    fn numeric_negate() -> StackTransition {
        StackTransition::new([
            Alternative::new([SemanticType::Int32], [SemanticType::Int32]),
            Alternative::new([SemanticType::Int64], [SemanticType::Int64]),
            Alternative::new([SemanticType::Float64], [SemanticType::Float64]),
        ])
    }

    #[test]
    fn test_first_matching_alternative_wins() {
        let transition = StackTransition::new([
            Alternative::new([SemanticType::Int32], [SemanticType::Int32]),
            Alternative::new([SemanticType::NativeInt], [SemanticType::NativeInt]),
        ]);
        // int32 also fits the native int alternative; declaration order decides.
        let alt = transition.select("Op", &[SemanticType::Int32]).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Int32]);
    }

    #[test]
    fn test_declaration_order_wins_across_arities() {
        let transition = StackTransition::new([
            Alternative::new([SemanticType::Int32, SemanticType::Int32], [SemanticType::Int64]),
            Alternative::new([SemanticType::Int32], [SemanticType::Float64]),
        ]);
        let alt = transition
            .select("Op", &[SemanticType::Int32, SemanticType::Int32])
            .unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Int64]);

        // The longer alternative fails on its deeper operand; the shorter fits.
        let alt = transition
            .select("Op", &[SemanticType::string(), SemanticType::Int32])
            .unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Float64]);

        let err = transition
            .select("Op", &[SemanticType::Int32, SemanticType::string()])
            .unwrap_err();
        assert_eq!(
            err,
            VerifyError::TypeMismatch {
                instruction: "Op".into(),
                subject: None,
                position: 2,
                expected: Expectation::Families(FamilySet::INT32),
                found: SemanticType::string(),
            }
        );
    }

    #[test]
    fn test_arity_checked_before_types() {
        let transition = StackTransition::single(
            [SemanticType::Int32, SemanticType::Int32],
            [SemanticType::Int32],
        );
        let err = transition
            .select("Op", &[SemanticType::string()])
            .unwrap_err();
        assert_eq!(
            err,
            VerifyError::StackUnderflow {
                instruction: "Op".into(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_mismatch_lists_families_of_all_alternatives() {
        let err = numeric_negate()
            .select("Negate", &[SemanticType::string()])
            .unwrap_err();
        assert_eq!(
            err,
            VerifyError::TypeMismatch {
                instruction: "Negate".into(),
                subject: None,
                position: 1,
                expected: Expectation::Families(
                    FamilySet::INT32 | FamilySet::INT64 | FamilySet::FLOAT64
                ),
                found: SemanticType::string(),
            }
        );
    }

    #[test]
    fn test_mismatch_reported_top_down() {
        let transition = StackTransition::single(
            [SemanticType::Int64, SemanticType::string()],
            [],
        );
        // Both slots are wrong; the top of the stack is checked first.
        let err = transition
            .select("Op", &[SemanticType::Int32, SemanticType::Int32])
            .unwrap_err();
        let VerifyError::TypeMismatch { position, .. } = err else {
            panic!("expected a type mismatch, got {err:?}");
        };
        assert_eq!(position, 2);
    }

    #[test]
    fn test_extra_stack_entries_are_ignored() {
        let stack = [SemanticType::string(), SemanticType::Int64];
        let transition = numeric_negate();
        let alt = transition.select("Negate", &stack).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Int64]);
    }

    #[test]
    fn test_empty_transition_always_matches() {
        let transition = StackTransition::none();
        let alt = transition.select("Nop", &[]).unwrap();
        assert_eq!(alt.delta(), 0);
    }

    #[test]
    fn test_display() {
        let alt = Alternative::new([SemanticType::Int32, SemanticType::NativeInt], [SemanticType::NativeInt]);
        assert_eq!(alt.to_string(), "[System.Int32, System.IntPtr] -> [System.IntPtr]");
    }
}
