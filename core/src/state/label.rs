use ecow::EcoString;
use verasm_types::SemanticType;

use super::region::BlockPath;
use crate::{Vec, format};

/// A branch that reached a label before it was marked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrival {
    pub instruction: EcoString,
    pub shape: Vec<SemanticType>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelRecord {
    pub name: Option<EcoString>,
    /// Instruction index the label was marked at.
    pub position: Option<usize>,
    /// Entry shape, fixed when the label is marked.
    pub shape: Option<Vec<SemanticType>>,
    /// Arrivals waiting for the label to be marked.
    pub pending: Vec<Arrival>,
    /// Enclosing region bodies where the label was marked.
    pub path: Option<BlockPath>,
}

impl LabelRecord {
    pub fn new(name: Option<EcoString>) -> Self {
        Self {
            name,
            position: None,
            shape: None,
            pending: Vec::new(),
            path: None,
        }
    }

    pub fn is_marked(&self) -> bool {
        self.position.is_some()
    }

    pub fn describe(&self, index: usize) -> EcoString {
        match &self.name {
            Some(name) => format!("Label '{name}'").into(),
            None => format!("Label #{index}").into(),
        }
    }
}

/// How a branch transfers control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchKind {
    /// `Branch` or a conditional branch: source and target must share a
    /// block.
    Jump,
    /// `Leave`: the target may be in any enclosing block.
    Leave,
}

/// A branch, kept until finalization so forward references can be checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    pub site: usize,
    pub label: u32,
    pub kind: BranchKind,
    pub path: BlockPath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalRecord {
    pub ty: SemanticType,
    pub name: Option<EcoString>,
    pub live: bool,
}

impl LocalRecord {
    pub fn describe(&self, index: usize) -> EcoString {
        match &self.name {
            Some(name) => format!("Local '{name}'").into(),
            None => format!("Local #{index}").into(),
        }
    }
}
