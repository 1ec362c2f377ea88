//! Comparisons and conditional branches.
//!
//! `Compare*` instructions and two-operand conditional branches share one
//! operand table. Comparisons push an int32; branches push nothing.

use verasm_types::{FamilySet, SemanticType};

use crate::transition::{Alternative, StackTransition};
use crate::{Vec, vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    Greater,
    GreaterUnsigned,
    Less,
    LessUnsigned,
}

impl CompareOp {
    pub const ALL: [CompareOp; 5] = [
        CompareOp::Equal,
        CompareOp::Greater,
        CompareOp::GreaterUnsigned,
        CompareOp::Less,
        CompareOp::LessUnsigned,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Equal => "CompareEqual",
            CompareOp::Greater => "CompareGreaterThan",
            CompareOp::GreaterUnsigned => "UnsignedCompareGreaterThan",
            CompareOp::Less => "CompareLessThan",
            CompareOp::LessUnsigned => "UnsignedCompareLessThan",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            CompareOp::Equal => "ceq",
            CompareOp::Greater => "cgt",
            CompareOp::GreaterUnsigned => "cgt.un",
            CompareOp::Less => "clt",
            CompareOp::LessUnsigned => "clt.un",
        }
    }

    fn accepts_objects(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::GreaterUnsigned)
    }

    pub fn transition(self, stack: &[SemanticType]) -> StackTransition {
        binary_comparison(stack, self.accepts_objects(), Some(SemanticType::Int32))
    }
}

/// Condition of a conditional branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchCondition {
    True,
    False,
    Equal,
    NotEqualUnsigned,
    GreaterOrEqual,
    GreaterOrEqualUnsigned,
    Greater,
    GreaterUnsigned,
    LessOrEqual,
    LessOrEqualUnsigned,
    Less,
    LessUnsigned,
}

impl BranchCondition {
    pub const ALL: [BranchCondition; 12] = [
        BranchCondition::True,
        BranchCondition::False,
        BranchCondition::Equal,
        BranchCondition::NotEqualUnsigned,
        BranchCondition::GreaterOrEqual,
        BranchCondition::GreaterOrEqualUnsigned,
        BranchCondition::Greater,
        BranchCondition::GreaterUnsigned,
        BranchCondition::LessOrEqual,
        BranchCondition::LessOrEqualUnsigned,
        BranchCondition::Less,
        BranchCondition::LessUnsigned,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BranchCondition::True => "BranchIfTrue",
            BranchCondition::False => "BranchIfFalse",
            BranchCondition::Equal => "BranchIfEqual",
            BranchCondition::NotEqualUnsigned => "UnsignedBranchIfNotEqual",
            BranchCondition::GreaterOrEqual => "BranchIfGreaterOrEqual",
            BranchCondition::GreaterOrEqualUnsigned => "UnsignedBranchIfGreaterOrEqual",
            BranchCondition::Greater => "BranchIfGreater",
            BranchCondition::GreaterUnsigned => "UnsignedBranchIfGreater",
            BranchCondition::LessOrEqual => "BranchIfLessOrEqual",
            BranchCondition::LessOrEqualUnsigned => "UnsignedBranchIfLessOrEqual",
            BranchCondition::Less => "BranchIfLess",
            BranchCondition::LessUnsigned => "UnsignedBranchIfLess",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BranchCondition::True => "brtrue",
            BranchCondition::False => "brfalse",
            BranchCondition::Equal => "beq",
            BranchCondition::NotEqualUnsigned => "bne.un",
            BranchCondition::GreaterOrEqual => "bge",
            BranchCondition::GreaterOrEqualUnsigned => "bge.un",
            BranchCondition::Greater => "bgt",
            BranchCondition::GreaterUnsigned => "bgt.un",
            BranchCondition::LessOrEqual => "ble",
            BranchCondition::LessOrEqualUnsigned => "ble.un",
            BranchCondition::Less => "blt",
            BranchCondition::LessUnsigned => "blt.un",
        }
    }

    pub fn transition(self, stack: &[SemanticType]) -> StackTransition {
        match self {
            BranchCondition::True | BranchCondition::False => StackTransition::new(
                [
                    SemanticType::Int32,
                    SemanticType::Int64,
                    SemanticType::NativeInt,
                    SemanticType::object(),
                    SemanticType::by_ref(SemanticType::Any),
                    SemanticType::pointer(SemanticType::Any),
                ]
                .into_iter()
                .map(|ty| Alternative::new([ty], [])),
            ),
            BranchCondition::Equal
            | BranchCondition::NotEqualUnsigned
            | BranchCondition::GreaterUnsigned => binary_comparison(stack, true, None),
            _ => binary_comparison(stack, false, None),
        }
    }
}

fn binary_comparison(
    stack: &[SemanticType],
    objects: bool,
    result: Option<SemanticType>,
) -> StackTransition {
    use SemanticType::*;

    let out: Vec<SemanticType> = result.into_iter().collect();
    let pair = |a: SemanticType, b: SemanticType| Alternative::new([a, b], out.iter().cloned());

    let first = stack.len().checked_sub(2).map(|i| &stack[i]);
    let alternatives = match first {
        Some(Int32) => vec![pair(Int32, Int32), pair(Int32, NativeInt)],
        Some(Int64) => vec![pair(Int64, Int64)],
        Some(NativeInt) => vec![pair(NativeInt, Int32), pair(NativeInt, NativeInt)],
        Some(Float32) => vec![pair(Float32, Float32)],
        Some(Float64) => vec![pair(Float64, Float64)],
        Some(ByRef(_)) => vec![pair(
            SemanticType::by_ref(Any),
            SemanticType::by_ref(Any),
        )],
        Some(Pointer(_)) => vec![pair(
            SemanticType::pointer(Any),
            SemanticType::pointer(Any),
        )],
        Some(ty) if objects && ty.is_object_reference() => {
            vec![pair(SemanticType::object(), SemanticType::object())]
        }
        _ => {
            // The first operand is missing or unsupported; report it against
            // every accepted family.
            let mut families = FamilySet::NUMERIC | FamilySet::ADDRESS;
            if objects {
                families |= FamilySet::OBJECT;
            }
            let firsts = [
                Int32,
                Int64,
                NativeInt,
                Float32,
                Float64,
                SemanticType::by_ref(Any),
                SemanticType::pointer(Any),
                SemanticType::object(),
            ];
            return StackTransition::new(
                firsts
                    .into_iter()
                    .filter(|ty| families.contains(ty.family()))
                    .map(|ty| Alternative::new([ty, Any], out.iter().cloned())),
            );
        }
    };
    let subject = first.map(|ty| ty.family().describe());
    let transition = StackTransition::new(alternatives);
    match subject {
        Some(subject) => transition.with_subject(subject),
        None => transition,
    }
}
