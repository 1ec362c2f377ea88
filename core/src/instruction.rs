//! The recorded instruction stream.

use ecow::EcoString;
use verasm_types::SemanticType;

use crate::fmt;
use crate::ops::{BranchCondition, Operation};
use crate::state::{Catch, Finally, Label, Region};
use crate::transition::StackTransition;

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Op(Operation),
    /// `Branch` when `condition` is `None`.
    Branch {
        condition: Option<BranchCondition>,
        label: Label,
    },
    Leave(Label),
    MarkLabel(Label),
    BeginExceptionBlock(Region),
    BeginCatch {
        region: Region,
        catch: Catch,
        /// `None` for a catch-all.
        exception: Option<SemanticType>,
    },
    EndCatch(Catch),
    BeginFinally {
        region: Region,
        finally: Finally,
    },
    EndFinally(Finally),
    EndExceptionBlock(Region),
    /// An instruction applied through the generic hook.
    Custom {
        name: EcoString,
        transition: StackTransition,
    },
}

impl Instruction {
    /// Name used in diagnostics.
    pub fn name(&self) -> EcoString {
        match self {
            Instruction::Op(op) => op.name(),
            Instruction::Branch {
                condition: Some(condition),
                ..
            } => condition.name().into(),
            Instruction::Branch { condition: None, .. } => "Branch".into(),
            Instruction::Leave(_) => "Leave".into(),
            Instruction::MarkLabel(_) => "MarkLabel".into(),
            Instruction::BeginExceptionBlock(_) => "BeginExceptionBlock".into(),
            Instruction::BeginCatch { exception: None, .. } => "BeginCatchAllBlock".into(),
            Instruction::BeginCatch { .. } => "BeginCatchBlock".into(),
            Instruction::EndCatch(_) => "EndCatchBlock".into(),
            Instruction::BeginFinally { .. } => "BeginFinallyBlock".into(),
            Instruction::EndFinally(_) => "EndFinallyBlock".into(),
            Instruction::EndExceptionBlock(_) => "EndExceptionBlock".into(),
            Instruction::Custom { name, .. } => name.clone(),
        }
    }

    /// Markers delimit regions and labels; they emit no code of their own.
    pub fn is_marker(&self) -> bool {
        !matches!(
            self,
            Instruction::Op(_)
                | Instruction::Branch { .. }
                | Instruction::Leave(_)
                | Instruction::Custom { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "{op}"),
            Instruction::Branch {
                condition: Some(condition),
                label,
            } => write!(f, "{} {}", condition.mnemonic(), label.index()),
            Instruction::Branch {
                condition: None,
                label,
            } => write!(f, "br {}", label.index()),
            Instruction::Leave(label) => write!(f, "leave {}", label.index()),
            Instruction::MarkLabel(label) => write!(f, "{}:", label.index()),
            Instruction::BeginExceptionBlock(region) => write!(f, ".try {}", region.index()),
            Instruction::BeginCatch {
                region,
                exception: Some(exception),
                ..
            } => write!(f, ".catch {} {exception}", region.index()),
            Instruction::BeginCatch { region, .. } => write!(f, ".catch_all {}", region.index()),
            Instruction::EndCatch(catch) => write!(f, ".end_catch {}", catch.index()),
            Instruction::BeginFinally { region, .. } => write!(f, ".finally {}", region.index()),
            Instruction::EndFinally(finally) => write!(f, ".end_finally {}", finally.index()),
            Instruction::EndExceptionBlock(region) => write!(f, ".end_try {}", region.index()),
            Instruction::Custom { name, .. } => f.write_str(name),
        }
    }
}
