//! Finalization: the checks that can only run once the stream is complete.

use ecow::EcoString;
use tracing::debug;

use super::{Emitter, Signature};
use crate::error::{EmitResult, InvalidOperationError, VerifyError};
use crate::instruction::Instruction;
use crate::ops::Operation;
use crate::state::{
    BlockPath, BranchKind, BranchRecord, HandlerRecord, LabelRecord, LocalRecord, RegionRecord,
    VerificationState, describe_region,
};
use crate::{String, Vec, fmt};

/// A verified method body.
#[derive(Clone, Debug)]
pub struct VerifiedBody {
    pub name: EcoString,
    pub signature: Signature,
    pub instructions: Vec<Instruction>,
    /// Stack depth after each instruction.
    pub depths: Vec<usize>,
    pub locals: Vec<LocalRecord>,
    pub labels: Vec<LabelRecord>,
    pub regions: Vec<RegionRecord>,
    pub handlers: Vec<HandlerRecord>,
    pub max_stack: usize,
}

impl VerifiedBody {
    /// Instruction index each label was marked at, `None` if it never was.
    pub fn label_positions(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.labels.iter().map(|label| label.position)
    }

    /// Renders the body as a listing, one instruction per line, prefixed by
    /// the stack depth after it.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_listing(&mut out);
        out
    }

    fn write_listing(&self, out: &mut String) -> fmt::Result {
        use fmt::Write;

        let label = |index: usize| self.labels[index].describe(index);
        let local = |index: usize| self.locals[index].describe(index);
        writeln!(out, ".method {} (max stack {})", self.name, self.max_stack)?;
        for (instruction, depth) in self.instructions.iter().zip(&self.depths) {
            match instruction {
                Instruction::MarkLabel(l) => {
                    writeln!(out, "{}:", label(l.index()))?;
                    continue;
                }
                Instruction::Branch { condition, label: l } => {
                    let mnemonic = condition.map(|c| c.mnemonic()).unwrap_or("br");
                    writeln!(out, "  [{depth:>2}] {mnemonic} {}", label(l.index()))?;
                }
                Instruction::Leave(l) => {
                    writeln!(out, "  [{depth:>2}] leave {}", label(l.index()))?;
                }
                Instruction::Op(Operation::LocalAccess(op)) => {
                    writeln!(out, "  [{depth:>2}] {} {}", op.mnemonic(), local(op.local.index()))?;
                }
                other if other.is_marker() => writeln!(out, "  {other}")?,
                other => writeln!(out, "  [{depth:>2}] {other}")?,
            }
        }
        Ok(())
    }
}

impl Emitter {
    /// Completes the body.
    ///
    /// Fails if a region is still open, a label was never marked, a branch
    /// crosses a region boundary, or the last instruction lets control fall
    /// off the end.
    pub fn finalize(self) -> EmitResult<VerifiedBody> {
        let state = &self.state;

        if let Some(index) = state.regions.iter().position(|region| !region.is_closed()) {
            return Err(InvalidOperationError::UnclosedRegion {
                region: describe_region(index as u32),
            }
            .into());
        }

        for (index, label) in state.labels.iter().enumerate() {
            let referenced = state.branches.iter().any(|b| b.label as usize == index);
            if !label.is_marked() && (referenced || self.options.require_marked_labels) {
                return Err(InvalidOperationError::UnmarkedLabel {
                    label: label.describe(index),
                }
                .into());
            }
        }

        for branch in &state.branches {
            check_crossing(state, branch)?;
        }

        if state.reachable {
            return Err(VerifyError::FallsOffEnd {
                method: self.name.clone(),
            }
            .into());
        }

        let max_stack = state.stack.max_depth();
        debug!(
            method = %self.name,
            instructions = self.instructions.len(),
            max_stack,
            "Finalized"
        );
        let VerificationState {
            locals,
            labels,
            regions,
            handlers,
            ..
        } = self.state;
        Ok(VerifiedBody {
            name: self.name,
            signature: self.signature,
            instructions: self.instructions,
            depths: self.depths,
            locals,
            labels,
            regions,
            handlers,
            max_stack,
        })
    }
}

/// A branch must stay in its block; `Leave` may also target any enclosing
/// block.
fn check_crossing(state: &VerificationState, branch: &BranchRecord) -> Result<(), InvalidOperationError> {
    let empty = BlockPath::new();
    let target = state.labels[branch.label as usize]
        .path
        .as_ref()
        .unwrap_or(&empty);
    let site = &branch.path;
    let common = site
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let legal = match branch.kind {
        BranchKind::Jump => common == site.len() && common == target.len(),
        BranchKind::Leave => common == target.len(),
    };
    if legal {
        return Ok(());
    }
    if branch.kind == BranchKind::Jump && common < site.len() {
        Err(InvalidOperationError::BranchOutOfRegion {
            region: describe_region(site[common].region),
        })
    } else {
        Err(InvalidOperationError::BranchIntoRegion {
            region: describe_region(target[common].region),
        })
    }
}
