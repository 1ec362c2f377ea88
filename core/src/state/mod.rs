//! Verification state of one emitter session.
//!
//! Everything the emitter mutates lives here: the abstract stack, whether the
//! current point is reachable, the chain of open region bodies, and the
//! region, handler, label, branch and local tables that handles index into.

mod handles;
mod label;
mod region;
mod stack;

pub use handles::{Catch, EmitterId, Finally, Label, Local, Region};
pub use label::{Arrival, BranchKind, BranchRecord, LabelRecord, LocalRecord};
pub use region::{
    BlockEntry, BlockPath, Body, HandlerRecord, HandlerSort, RegionPhase, RegionRecord,
    describe_region,
};
pub use stack::AbstractStack;

use ecow::EcoString;
use verasm_types::{SemanticType, is_shape_assignable};

use crate::error::{ArgumentError, HandlerKind, VerifyError};
use crate::{ToString, Vec};

#[derive(Debug)]
pub struct VerificationState {
    owner: EmitterId,
    pub stack: AbstractStack,
    /// False after an unconditional transfer until a label is marked.
    pub reachable: bool,
    pub blocks: BlockPath,
    pub regions: Vec<RegionRecord>,
    pub handlers: Vec<HandlerRecord>,
    pub labels: Vec<LabelRecord>,
    pub branches: Vec<BranchRecord>,
    pub locals: Vec<LocalRecord>,
}

fn fits_label(
    instruction: &str,
    label: EcoString,
    expected: &[SemanticType],
    found: &[SemanticType],
) -> Result<(), VerifyError> {
    if is_shape_assignable(found, expected) {
        Ok(())
    } else {
        Err(VerifyError::LabelShapeMismatch {
            instruction: instruction.into(),
            label,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

fn check_owner(owner: EmitterId, expected: EmitterId, handle: impl ToString) -> Result<(), ArgumentError> {
    if owner == expected {
        Ok(())
    } else {
        Err(ArgumentError::ForeignHandle {
            handle: handle.to_string().into(),
        })
    }
}

impl VerificationState {
    pub fn new(max_stack: usize) -> Self {
        Self {
            owner: EmitterId::fresh(),
            stack: AbstractStack::new(max_stack),
            reachable: true,
            blocks: BlockPath::new(),
            regions: Vec::new(),
            handlers: Vec::new(),
            labels: Vec::new(),
            branches: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn owner(&self) -> EmitterId {
        self.owner
    }

    pub fn region(&self, handle: Region) -> Result<u32, ArgumentError> {
        check_owner(handle.owner, self.owner, handle)?;
        Ok(handle.index)
    }

    pub fn catch(&self, handle: Catch) -> Result<u32, ArgumentError> {
        check_owner(handle.owner, self.owner, handle)?;
        Ok(handle.index)
    }

    pub fn finally(&self, handle: Finally) -> Result<u32, ArgumentError> {
        check_owner(handle.owner, self.owner, handle)?;
        Ok(handle.index)
    }

    pub fn label(&self, handle: Label) -> Result<u32, ArgumentError> {
        check_owner(handle.owner, self.owner, handle)?;
        Ok(handle.index)
    }

    pub fn local(&self, handle: Local) -> Result<u32, ArgumentError> {
        check_owner(handle.owner, self.owner, handle)?;
        Ok(handle.index)
    }

    pub fn describe_label(&self, index: u32) -> EcoString {
        self.labels[index as usize].describe(index as usize)
    }

    /// The innermost open region, if any.
    pub fn innermost_region(&self) -> Option<u32> {
        self.blocks.last().map(|entry| entry.region)
    }

    /// Replaces the body of the innermost block, which must belong to
    /// `region`.
    pub fn set_body(&mut self, region: u32, body: Body) {
        if let Some(entry) = self.blocks.last_mut() {
            debug_assert_eq!(entry.region, region);
            entry.body = body;
        }
    }

    /// True if the innermost handler enclosing this point is a catch.
    pub fn in_catch(&self) -> bool {
        self.blocks
            .iter()
            .rev()
            .find_map(|entry| match entry.body {
                Body::Handler(h) => Some(self.handlers[h as usize].sort.kind() == HandlerKind::Catch),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Records control reaching `label` with `shape` on the stack.
    ///
    /// Before the label is marked the arrival is held until [`Self::settle`];
    /// afterwards it must fit the marked shape.
    pub fn arrive(&mut self, instruction: &str, label: u32, shape: &[SemanticType]) -> Result<(), VerifyError> {
        let record = &mut self.labels[label as usize];
        match &record.shape {
            None => {
                record.pending.push(Arrival {
                    instruction: instruction.into(),
                    shape: shape.to_vec(),
                });
                Ok(())
            }
            Some(expected) => fits_label(instruction, record.describe(label as usize), expected, shape),
        }
    }

    /// Fixes the entry shape of `label` as it is marked and checks the
    /// arrivals held so far against it.
    ///
    /// `fallthrough` is the stack control falls in with. When nothing falls
    /// through, the first arrival supplies the shape, or an empty stack if
    /// there was none.
    pub fn settle(
        &mut self,
        label: u32,
        fallthrough: Option<&[SemanticType]>,
    ) -> Result<Vec<SemanticType>, VerifyError> {
        let record = &mut self.labels[label as usize];
        let pending = core::mem::take(&mut record.pending);
        let shape = match fallthrough {
            Some(stack) => stack.to_vec(),
            None => pending
                .first()
                .map(|arrival| arrival.shape.clone())
                .unwrap_or_default(),
        };
        let description = record.describe(label as usize);
        for arrival in &pending {
            fits_label(&arrival.instruction, description.clone(), &shape, &arrival.shape)?;
        }
        record.shape = Some(shape.clone());
        Ok(shape)
    }

    /// Ends the current flow: nothing follows until a label is marked.
    pub fn terminate(&mut self) {
        self.reachable = false;
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_foreign_handles_are_rejected() {
        let a = VerificationState::new(16);
        let b = VerificationState::new(16);
        let label = Label::new(a.owner(), 0);
        assert_eq!(a.label(label), Ok(0));
        assert_eq!(
            b.label(label),
            Err(ArgumentError::ForeignHandle {
                handle: "Label #0".into()
            })
        );
    }

    #[test]
    fn test_arrivals_are_checked_against_marked_shape() {
        let mut state = VerificationState::new(16);
        state.labels.push(LabelRecord::new(Some("done".into())));
        state.arrive("Branch", 0, &[SemanticType::string()]).unwrap();
        state.arrive("Leave", 0, &[SemanticType::Null]).unwrap();

        let shape = state.settle(0, Some(&[SemanticType::object()])).unwrap();
        assert_eq!(shape, vec![SemanticType::object()]);
        state.arrive("Branch", 0, &[SemanticType::string()]).unwrap();

        let err = state
            .arrive("Branch", 0, &[SemanticType::Int64])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Branch reaches Label 'done' with stack [System.Int64], but the label expects [System.Object]"
        );
    }

    #[test]
    fn test_pending_arrival_rejected_when_settled() {
        let mut state = VerificationState::new(16);
        state.labels.push(LabelRecord::new(None));
        state.arrive("BranchIfTrue", 0, &[]).unwrap();

        let err = state.settle(0, Some(&[SemanticType::Int32])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "BranchIfTrue reaches Label #0 with stack [], but the label expects [System.Int32]"
        );
    }

    #[test]
    fn test_unreachable_mark_takes_first_arrival() {
        let mut state = VerificationState::new(16);
        state.labels.push(LabelRecord::new(None));
        assert_eq!(state.settle(0, None).unwrap(), Vec::<SemanticType>::new());

        state.labels.push(LabelRecord::new(None));
        state.arrive("Branch", 1, &[SemanticType::object()]).unwrap();
        state.arrive("Branch", 1, &[SemanticType::string()]).unwrap();
        assert_eq!(state.settle(1, None).unwrap(), vec![SemanticType::object()]);
    }
}
