//! The instruction emitter.
//!
//! Every instruction goes through the same steps: its family builds a
//! [`StackTransition`] against the current stack, the transition selects an
//! alternative (or fails), and the stack is updated before the instruction is
//! recorded. Errors are returned at the call that caused them, and the
//! emitter must be discarded afterwards.

mod finalize;
mod regions;
mod surface;

pub use crate::members::Signature;
pub use finalize::VerifiedBody;

use ecow::EcoString;
use tracing::{debug, trace};
use verasm_types::{SemanticType, is_shape_assignable};

use crate::api::EmitterOptions;
use crate::error::{ArgumentError, EmitResult, InvalidOperationError, VerifyError};
use crate::instruction::Instruction;
use crate::ops::{AccessKind, ArgOp, BranchCondition, ControlOp, LocalOp, Operation};
use crate::state::{
    BlockEntry, Body, BranchKind, BranchRecord, Label, LabelRecord, Local, LocalRecord,
    VerificationState, describe_region,
};
use crate::transition::StackTransition;
use crate::Vec;

/// Builds and verifies the body of one method.
///
/// Handles returned by an emitter (labels, regions, handlers, locals) may
/// only be passed back to that same emitter.
#[derive(Debug)]
pub struct Emitter {
    name: EcoString,
    signature: Signature,
    options: EmitterOptions,
    state: VerificationState,
    instructions: Vec<Instruction>,
    /// Stack depth after each recorded instruction.
    depths: Vec<usize>,
}

static_assertions::assert_impl_all!(Emitter: Send);

impl Emitter {
    pub fn new(name: impl Into<EcoString>, signature: Signature) -> Self {
        Self::with_options(name, signature, EmitterOptions::default())
    }

    pub fn with_options(name: impl Into<EcoString>, signature: Signature, options: EmitterOptions) -> Self {
        let name = name.into();
        debug!(method = %name, max_stack = options.max_stack, "Creating emitter");
        Self {
            name,
            signature,
            state: VerificationState::new(options.max_stack),
            options,
            instructions: Vec::new(),
            depths: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn options(&self) -> &EmitterOptions {
        &self.options
    }

    /// The abstract stack at the current point, bottom first.
    pub fn stack(&self) -> &[SemanticType] {
        self.state.stack.as_slice()
    }

    /// False right after an unconditional transfer, until a label is marked.
    pub fn is_reachable(&self) -> bool {
        self.state.reachable
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Checks `transition` against the stack and records it under
    /// `instruction`.
    ///
    /// This is the hook every instruction funnels through; it is public so
    /// that instructions without a dedicated method can still be verified.
    pub fn apply(&mut self, instruction: &str, transition: &StackTransition) -> EmitResult<()> {
        self.check(instruction, transition)?;
        self.record(Instruction::Custom {
            name: instruction.into(),
            transition: transition.clone(),
        });
        Ok(())
    }

    fn check(&mut self, instruction: &str, transition: &StackTransition) -> Result<(), VerifyError> {
        let alt = transition.select(instruction, self.state.stack.as_slice())?;
        self.state.stack.apply(instruction, alt)?;
        trace!(instruction, depth = self.state.stack.len(), "Applied");
        Ok(())
    }

    fn record(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.depths.push(self.state.stack.len());
    }

    pub(crate) fn emit(&mut self, op: Operation) -> EmitResult<()> {
        let name = op.name();
        let transition = op.transition(self.state.stack.as_slice())?;
        self.check(&name, &transition)?;
        let terminates = op.terminates();
        self.record(Instruction::Op(op));
        if terminates {
            self.state.terminate();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Labels and branches
    // ------------------------------------------------------------------

    /// Creates an unmarked label.
    pub fn define_label(&mut self, name: Option<&str>) -> Label {
        let index = self.state.labels.len();
        self.state.labels.push(LabelRecord::new(name.map(EcoString::from)));
        Label::new(self.state.owner(), index)
    }

    /// Fixes `label` at the current position.
    ///
    /// If control falls through to here, the current stack becomes the
    /// label's shape and every branch that already targets the label must
    /// fit it. Otherwise (the previous instruction was an unconditional
    /// transfer) the first branch supplies the shape, or an empty stack if
    /// nothing has branched here yet.
    pub fn mark_label(&mut self, label: Label) -> EmitResult<()> {
        let index = self.state.label(label)?;
        if self.state.labels[index as usize].is_marked() {
            return Err(InvalidOperationError::LabelAlreadyMarked {
                label: self.state.describe_label(index),
            }
            .into());
        }
        if let Some(BlockEntry {
            region,
            body: Body::Between,
        }) = self.state.blocks.last().copied()
        {
            return Err(InvalidOperationError::LabelBetweenBlocks {
                label: self.state.describe_label(index),
                region: describe_region(region),
            }
            .into());
        }

        let fallthrough = self
            .state
            .reachable
            .then(|| self.state.stack.as_slice().to_vec());
        let shape = self.state.settle(index, fallthrough.as_deref())?;
        self.state.stack.replace("MarkLabel", &shape)?;
        self.state.reachable = true;

        let position = self.instructions.len();
        let record = &mut self.state.labels[index as usize];
        record.position = Some(position);
        record.path = Some(self.state.blocks.clone());
        debug!(
            label = %self.state.describe_label(index),
            position,
            depth = shape.len(),
            "Marked label"
        );
        self.record(Instruction::MarkLabel(label));
        Ok(())
    }

    /// Unconditional branch. Nothing after it is reachable until a label is
    /// marked.
    pub fn branch(&mut self, label: Label) -> EmitResult<()> {
        let index = self.state.label(label)?;
        let shape = self.state.stack.as_slice().to_vec();
        self.state.arrive("Branch", index, &shape)?;
        self.record_branch(index, BranchKind::Jump);
        self.record(Instruction::Branch {
            condition: None,
            label,
        });
        self.state.terminate();
        Ok(())
    }

    /// Conditional branch: pops the condition's operands, then arrives at
    /// `label` with what remains.
    pub fn branch_if(&mut self, condition: BranchCondition, label: Label) -> EmitResult<()> {
        let index = self.state.label(label)?;
        let name = condition.name();
        let transition = condition.transition(self.state.stack.as_slice());
        self.check(name, &transition)?;
        let shape = self.state.stack.as_slice().to_vec();
        self.state.arrive(name, index, &shape)?;
        self.record_branch(index, BranchKind::Jump);
        self.record(Instruction::Branch {
            condition: Some(condition),
            label,
        });
        Ok(())
    }

    /// Empties the stack and transfers to `label`, which may be outside any
    /// number of enclosing exception blocks.
    pub fn leave(&mut self, label: Label) -> EmitResult<()> {
        let index = self.state.label(label)?;
        self.state.stack.clear();
        self.state.arrive("Leave", index, &[])?;
        self.record_branch(index, BranchKind::Leave);
        self.record(Instruction::Leave(label));
        self.state.terminate();
        Ok(())
    }

    fn record_branch(&mut self, label: u32, kind: BranchKind) {
        self.state.branches.push(BranchRecord {
            site: self.instructions.len(),
            label,
            kind,
            path: self.state.blocks.clone(),
        });
    }

    // ------------------------------------------------------------------
    // Locals and arguments
    // ------------------------------------------------------------------

    pub fn declare_local(&mut self, ty: SemanticType, name: Option<&str>) -> EmitResult<Local> {
        if let Some(name) = name {
            let taken = self
                .state
                .locals
                .iter()
                .any(|local| local.live && local.name.as_deref() == Some(name));
            if taken {
                return Err(ArgumentError::DuplicateLocal { name: name.into() }.into());
            }
        }
        let index = self.state.locals.len();
        self.state.locals.push(LocalRecord {
            ty,
            name: name.map(EcoString::from),
            live: true,
        });
        Ok(Local::new(self.state.owner(), index))
    }

    /// Ends the scope of `local`. Its name may be declared again.
    pub fn release_local(&mut self, local: Local) -> EmitResult<()> {
        let (index, _) = self.live_local(local)?;
        let record = &mut self.state.locals[index as usize];
        record.live = false;
        debug!(local = %record.describe(index as usize), "Released local");
        Ok(())
    }

    fn live_local(&self, local: Local) -> EmitResult<(u32, SemanticType)> {
        let index = self.state.local(local)?;
        let record = &self.state.locals[index as usize];
        if !record.live {
            return Err(InvalidOperationError::LocalReleased {
                local: record.describe(index as usize),
            }
            .into());
        }
        Ok((index, record.ty.clone()))
    }

    fn local_access(&mut self, kind: AccessKind, local: Local) -> EmitResult<()> {
        let (_, ty) = self.live_local(local)?;
        self.emit(Operation::LocalAccess(LocalOp { kind, local, ty }))
    }

    pub fn load_local(&mut self, local: Local) -> EmitResult<()> {
        self.local_access(AccessKind::Load, local)
    }

    pub fn store_local(&mut self, local: Local) -> EmitResult<()> {
        self.local_access(AccessKind::Store, local)
    }

    pub fn load_local_address(&mut self, local: Local) -> EmitResult<()> {
        self.local_access(AccessKind::LoadAddress, local)
    }

    pub fn argument(&mut self, kind: AccessKind, index: u16) -> EmitResult<()> {
        let op = ArgOp {
            kind,
            index,
            ty: SemanticType::Any,
        };
        let count = self.signature.params.len();
        let Some(ty) = self.signature.params.get(usize::from(index)).cloned() else {
            return Err(ArgumentError::ArgumentOutOfRange {
                instruction: op.name().into(),
                index,
                count,
            }
            .into());
        };
        self.emit(Operation::ArgumentAccess(ArgOp { ty, ..op }))
    }

    pub fn load_argument(&mut self, index: u16) -> EmitResult<()> {
        self.argument(AccessKind::Load, index)
    }

    pub fn store_argument(&mut self, index: u16) -> EmitResult<()> {
        self.argument(AccessKind::Store, index)
    }

    pub fn load_argument_address(&mut self, index: u16) -> EmitResult<()> {
        self.argument(AccessKind::LoadAddress, index)
    }

    // ------------------------------------------------------------------
    // Leaving the method
    // ------------------------------------------------------------------

    /// Returns from the method. The stack must hold exactly the declared
    /// return value, and no exception block may be open.
    pub fn ret(&mut self) -> EmitResult<()> {
        if let Some(BlockEntry { region, .. }) = self.state.blocks.last() {
            return Err(InvalidOperationError::ExitInsideRegion {
                instruction: "Return",
                region: describe_region(*region),
            }
            .into());
        }
        let expected = self.signature.ret.clone();
        let shape: Vec<SemanticType> = expected.iter().cloned().collect();
        if !is_shape_assignable(self.state.stack.as_slice(), &shape) {
            return Err(VerifyError::ReturnMismatch {
                expected,
                found: self.state.stack.as_slice().to_vec(),
            }
            .into());
        }
        self.emit(Operation::ExceptionControl(ControlOp::Return(expected)))
    }

    /// Throws the exception on top of the stack.
    pub fn throw(&mut self) -> EmitResult<()> {
        self.emit(Operation::ExceptionControl(ControlOp::Throw))
    }

    /// Rethrows the exception being handled. Only legal inside a catch.
    pub fn rethrow(&mut self) -> EmitResult<()> {
        if !self.state.in_catch() {
            return Err(InvalidOperationError::RethrowOutsideCatch.into());
        }
        self.emit(Operation::ExceptionControl(ControlOp::Rethrow))
    }
}

#[cfg(test)]
mod regions_test;
