//! Errors raised while building an instruction stream.
//!
//! There are three kinds, and every one of them is fatal to the emitter
//! that raised it:
//!
//! - [`ArgumentError`]: a caller-supplied argument violates a precondition.
//! - [`InvalidOperationError`]: the emitter's state forbids the operation.
//! - [`VerifyError`]: the abstract stack or type rules are violated.

use ecow::EcoString;
use thiserror::Error;
use verasm_types::{FamilySet, SemanticType};

use crate::{String, ToString, Vec, fmt, format};

/// The three error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    InvalidOperation,
    Verification,
}

/// Any error raised by an [`Emitter`](crate::emitter::Emitter).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
    #[error(transparent)]
    Verification(#[from] VerifyError),
}

impl EmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmitError::Argument(_) => ErrorKind::Argument,
            EmitError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            EmitError::Verification(_) => ErrorKind::Verification,
        }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("{handle} is not owned by this emitter, and thus cannot be used")]
    ForeignHandle { handle: EcoString },

    #[error("{parameter} must derive from System.Exception; found {found}")]
    NotAnException {
        parameter: &'static str,
        found: SemanticType,
    },

    #[error("{instruction} refers to argument {index}, but the signature declares {count}")]
    ArgumentOutOfRange {
        instruction: EcoString,
        index: u16,
        count: usize,
    },

    #[error("a local named '{name}' is already in scope")]
    DuplicateLocal { name: EcoString },
}

/// Kind of handler body inside an exception region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    Catch,
    Finally,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Catch => f.write_str("catch"),
            HandlerKind::Finally => f.write_str("finally"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidOperationError {
    #[error("Cannot start a new {requested} block, {region} already has an open {open} block")]
    HandlerAlreadyOpen {
        requested: HandlerKind,
        region: EcoString,
        open: HandlerKind,
    },

    #[error("{operation} expects an unclosed exception block, but {region} is already closed")]
    RegionClosed {
        operation: &'static str,
        region: EcoString,
    },

    #[error("Cannot start {operation} on {region} while inner {inner} is still open")]
    InnerRegionOpen {
        operation: &'static str,
        region: EcoString,
        inner: EcoString,
    },

    #[error("{region} already has a finally block")]
    DuplicateFinally { region: EcoString },

    #[error("Cannot end {handler}, it is not the open block of its exception block")]
    HandlerNotOpen { handler: EcoString },

    #[error("Cannot end {region}, it still has an open {open} block")]
    RegionHasOpenHandler { region: EcoString, open: HandlerKind },

    #[error("Cannot end {region}, it has no catch or finally blocks")]
    RegionWithoutHandlers { region: EcoString },

    #[error("{region} was never closed")]
    UnclosedRegion { region: EcoString },

    #[error("{label} has already been marked")]
    LabelAlreadyMarked { label: EcoString },

    #[error("{label} was never marked")]
    UnmarkedLabel { label: EcoString },

    #[error("Cannot mark {label} between the blocks of {region}")]
    LabelBetweenBlocks { label: EcoString, region: EcoString },

    #[error("Cannot branch from inside {region} to outside, exit the ExceptionBlock first")]
    BranchOutOfRegion { region: EcoString },

    #[error("Cannot branch into {region} from outside")]
    BranchIntoRegion { region: EcoString },

    #[error("Cannot {instruction} from inside {region}, leave the ExceptionBlock first")]
    ExitInsideRegion {
        instruction: &'static str,
        region: EcoString,
    },

    #[error("Rethrow is only legal inside a catch block")]
    RethrowOutsideCatch,

    #[error("{local} has been released and cannot be used")]
    LocalReleased { local: EcoString },
}

/// What an operand slot would have accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// Any member of these families.
    Families(FamilySet),
    /// One of these specific types.
    Types(Vec<SemanticType>),
}

impl Expectation {
    /// Summarizes the types accepted by a slot across several alternatives.
    ///
    /// Slots made only of family-wide types (the primitives, `T&` and `T*`
    /// of anything, `System.Object`) are described by family.
    pub fn from_slots<'a>(slots: impl IntoIterator<Item = &'a SemanticType>) -> Self {
        let mut families = FamilySet::empty();
        let mut types: Vec<SemanticType> = Vec::new();
        let mut by_family = true;
        for ty in slots {
            by_family &= is_family_wide(ty);
            families |= ty.family();
            if !types.contains(ty) {
                types.push(ty.clone());
            }
        }
        if by_family {
            Expectation::Families(families)
        } else {
            Expectation::Types(types)
        }
    }
}

fn is_family_wide(ty: &SemanticType) -> bool {
    match ty {
        SemanticType::Int32
        | SemanticType::Int64
        | SemanticType::NativeInt
        | SemanticType::Float32
        | SemanticType::Float64 => true,
        SemanticType::ByRef(target) | SemanticType::Pointer(target) => {
            **target == SemanticType::Any
        }
        SemanticType::Object(class) => class.is_object(),
        _ => false,
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Families(families) => f.write_str(&families.describe()),
            Expectation::Types(types) => {
                let names: Vec<String> = types.iter().map(describe_type).collect();
                match names.as_slice() {
                    [] => f.write_str("nothing"),
                    [one] => f.write_str(one),
                    [init @ .., last] => write!(f, "{} or {}", init.join(", "), last),
                }
            }
        }
    }
}

fn describe_type(ty: &SemanticType) -> String {
    match ty {
        SemanticType::Array(element) if **element == SemanticType::Any => "an array".to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{instruction} expects {} on the stack, found {found}", arguments(.expected))]
    StackUnderflow {
        instruction: EcoString,
        expected: usize,
        found: usize,
    },

    #[error(
        "{instruction}{} expects {expected} as {} value; found {found}",
        subject_clause(.subject),
        ordinal(.position)
    )]
    TypeMismatch {
        instruction: EcoString,
        /// Family of an earlier operand that selected the rule, e.g. "an int32".
        subject: Option<EcoString>,
        /// 1-based operand position; the first operand is the deepest.
        position: usize,
        expected: Expectation,
        found: SemanticType,
    },

    #[error("{instruction} expects the value to be shifted to be an int32, int64, or native int; found {found}")]
    ShiftValue {
        instruction: EcoString,
        found: SemanticType,
    },

    #[error("{instruction} expects the shift to be an int32 or native int; found {found}")]
    ShiftAmount {
        instruction: EcoString,
        found: SemanticType,
    },

    #[error("Stack should be empty when {operation} is called")]
    StackNotEmpty {
        operation: &'static str,
        depth: usize,
    },

    #[error(
        "{instruction} reaches {label} with stack {}, but the label expects {}",
        shape(.found),
        shape(.expected)
    )]
    LabelShapeMismatch {
        instruction: EcoString,
        label: EcoString,
        expected: Vec<SemanticType>,
        found: Vec<SemanticType>,
    },

    #[error("Return expects {}; found {}", return_shape(.expected), shape(.found))]
    ReturnMismatch {
        expected: Option<SemanticType>,
        found: Vec<SemanticType>,
    },

    #[error("{instruction} would grow the stack to {depth} values, beyond the limit of {limit}")]
    StackLimitExceeded {
        instruction: EcoString,
        depth: usize,
        limit: usize,
    },

    #[error("{method} does not end with a return, throw, or unconditional branch")]
    FallsOffEnd { method: EcoString },
}

fn arguments(n: &usize) -> String {
    match n {
        1 => "1 argument".to_string(),
        n => format!("{n} arguments"),
    }
}

fn ordinal(position: &usize) -> String {
    match position {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        n => format!("{n}th"),
    }
}

fn subject_clause(subject: &Option<EcoString>) -> String {
    match subject {
        Some(subject) => format!(" with {subject}"),
        None => String::new(),
    }
}

fn shape(types: &[SemanticType]) -> String {
    let names: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

fn return_shape(expected: &Option<SemanticType>) -> String {
    match expected {
        Some(ty) => format!("a single {ty} on the stack"),
        None => "an empty stack".to_string(),
    }
}
