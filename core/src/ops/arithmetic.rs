//! Arithmetic, bitwise and shift instructions.
//!
//! Binary operators are checked in two stages. The family of the first
//! operand picks a rule; the rule then fixes what the second operand may be
//! and what is pushed. A first operand that no rule covers is reported
//! against the union of every family the operator accepts.

use verasm_types::{FamilySet, SemanticType};

use crate::error::VerifyError;
use crate::transition::{Alternative, StackTransition};
use crate::{Vec, vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    AddOverflow,
    AddOverflowUnsigned,
    Subtract,
    SubtractOverflow,
    SubtractOverflowUnsigned,
    Multiply,
    MultiplyOverflow,
    MultiplyOverflowUnsigned,
    Divide,
    DivideUnsigned,
    Remainder,
    RemainderUnsigned,
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Class {
    /// Numbers and pointer arithmetic.
    Additive,
    /// Numbers only.
    Multiplicative,
    /// Integers only.
    Integral,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::AddOverflow,
        BinaryOp::AddOverflowUnsigned,
        BinaryOp::Subtract,
        BinaryOp::SubtractOverflow,
        BinaryOp::SubtractOverflowUnsigned,
        BinaryOp::Multiply,
        BinaryOp::MultiplyOverflow,
        BinaryOp::MultiplyOverflowUnsigned,
        BinaryOp::Divide,
        BinaryOp::DivideUnsigned,
        BinaryOp::Remainder,
        BinaryOp::RemainderUnsigned,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "Add",
            BinaryOp::AddOverflow => "AddOverflow",
            BinaryOp::AddOverflowUnsigned => "UnsignedAddOverflow",
            BinaryOp::Subtract => "Subtract",
            BinaryOp::SubtractOverflow => "SubtractOverflow",
            BinaryOp::SubtractOverflowUnsigned => "UnsignedSubtractOverflow",
            BinaryOp::Multiply => "Multiply",
            BinaryOp::MultiplyOverflow => "MultiplyOverflow",
            BinaryOp::MultiplyOverflowUnsigned => "UnsignedMultiplyOverflow",
            BinaryOp::Divide => "Divide",
            BinaryOp::DivideUnsigned => "UnsignedDivide",
            BinaryOp::Remainder => "Remainder",
            BinaryOp::RemainderUnsigned => "UnsignedRemainder",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Xor => "Xor",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::AddOverflow => "add.ovf",
            BinaryOp::AddOverflowUnsigned => "add.ovf.un",
            BinaryOp::Subtract => "sub",
            BinaryOp::SubtractOverflow => "sub.ovf",
            BinaryOp::SubtractOverflowUnsigned => "sub.ovf.un",
            BinaryOp::Multiply => "mul",
            BinaryOp::MultiplyOverflow => "mul.ovf",
            BinaryOp::MultiplyOverflowUnsigned => "mul.ovf.un",
            BinaryOp::Divide => "div",
            BinaryOp::DivideUnsigned => "div.un",
            BinaryOp::Remainder => "rem",
            BinaryOp::RemainderUnsigned => "rem.un",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    fn class(self) -> Class {
        match self {
            BinaryOp::Add
            | BinaryOp::AddOverflow
            | BinaryOp::AddOverflowUnsigned
            | BinaryOp::Subtract
            | BinaryOp::SubtractOverflow
            | BinaryOp::SubtractOverflowUnsigned => Class::Additive,
            BinaryOp::Multiply
            | BinaryOp::MultiplyOverflow
            | BinaryOp::MultiplyOverflowUnsigned
            | BinaryOp::Divide
            | BinaryOp::Remainder => Class::Multiplicative,
            BinaryOp::DivideUnsigned
            | BinaryOp::RemainderUnsigned
            | BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Xor => Class::Integral,
        }
    }

    /// Families accepted as the first operand.
    pub fn first_operand_families(self) -> FamilySet {
        match self.class() {
            Class::Additive => FamilySet::NUMERIC | FamilySet::ADDRESS,
            Class::Multiplicative => FamilySet::NUMERIC,
            Class::Integral => FamilySet::INTEGER,
        }
    }

    pub fn transition(self, stack: &[SemanticType]) -> StackTransition {
        let first = stack.len().checked_sub(2).map(|i| &stack[i]);
        let second = stack.last();
        match first.zip(second) {
            Some((first, second)) => match self.rule(first, second) {
                Some(alternatives) => {
                    StackTransition::new(alternatives).with_subject(first.family().describe())
                }
                None => self.first_operand_gate(),
            },
            None => self.first_operand_gate(),
        }
    }

    /// One alternative per accepted first-operand family, with any second
    /// operand. Only ever selected to produce an error.
    fn first_operand_gate(self) -> StackTransition {
        let accepted = self.first_operand_families();
        let firsts = [
            (FamilySet::INT32, SemanticType::Int32),
            (FamilySet::INT64, SemanticType::Int64),
            (FamilySet::NATIVE_INT, SemanticType::NativeInt),
            (FamilySet::FLOAT32, SemanticType::Float32),
            (FamilySet::FLOAT64, SemanticType::Float64),
            (FamilySet::REFERENCE, SemanticType::by_ref(SemanticType::Any)),
            (FamilySet::POINTER, SemanticType::pointer(SemanticType::Any)),
        ];
        StackTransition::new(
            firsts
                .into_iter()
                .filter(|(family, _)| accepted.contains(*family))
                .map(|(_, ty)| Alternative::new([ty.clone(), SemanticType::Any], [ty])),
        )
    }

    /// The alternatives governing the second operand, given the first.
    fn rule(self, first: &SemanticType, second: &SemanticType) -> Option<Vec<Alternative>> {
        use SemanticType::*;

        let class = self.class();
        let binary = |a: SemanticType, b: SemanticType, out: SemanticType| Alternative::new([a, b], [out]);
        // Pointer arithmetic keeps the address operand's own type.
        let by_ref = match second {
            ByRef(_) => second.clone(),
            _ => SemanticType::by_ref(Any),
        };
        let pointer = match second {
            Pointer(_) => second.clone(),
            _ => SemanticType::pointer(Any),
        };
        let any_ref = SemanticType::by_ref(Any);
        let any_ptr = SemanticType::pointer(Any);

        let alternatives = match first {
            Int32 | NativeInt => {
                let lhs = first.clone();
                let narrow_out = if *first == Int32 { Int32 } else { NativeInt };
                let mut alts = vec![
                    binary(lhs.clone(), Int32, narrow_out),
                    binary(lhs.clone(), NativeInt, NativeInt),
                ];
                if class == Class::Additive {
                    alts.push(binary(lhs.clone(), any_ref, by_ref));
                    alts.push(binary(lhs, any_ptr, pointer));
                }
                alts
            }
            Int64 => vec![binary(Int64, Int64, Int64)],
            Float32 if class != Class::Integral => vec![binary(Float32, Float32, Float32)],
            Float64 if class != Class::Integral => vec![binary(Float64, Float64, Float64)],
            ByRef(_) | Pointer(_) if class == Class::Additive => {
                let lhs = if matches!(first, ByRef(_)) { any_ref } else { any_ptr };
                vec![
                    binary(lhs.clone(), Int32, first.clone()),
                    binary(lhs, NativeInt, first.clone()),
                ]
            }
            _ => return None,
        };
        Some(alternatives)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 2] = [UnaryOp::Negate, UnaryOp::Not];

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "Negate",
            UnaryOp::Not => "Not",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Negate => "neg",
            UnaryOp::Not => "not",
        }
    }

    pub fn transition(self) -> StackTransition {
        let mut types = vec![SemanticType::Int32, SemanticType::Int64, SemanticType::NativeInt];
        if self == UnaryOp::Negate {
            types.push(SemanticType::Float32);
            types.push(SemanticType::Float64);
        }
        StackTransition::new(types.into_iter().map(|ty| Alternative::new([ty.clone()], [ty])))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
}

impl ShiftOp {
    pub const ALL: [ShiftOp; 3] = [
        ShiftOp::ShiftLeft,
        ShiftOp::ShiftRight,
        ShiftOp::ShiftRightUnsigned,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShiftOp::ShiftLeft => "ShiftLeft",
            ShiftOp::ShiftRight => "ShiftRight",
            ShiftOp::ShiftRightUnsigned => "UnsignedShiftRight",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            ShiftOp::ShiftLeft => "shl",
            ShiftOp::ShiftRight => "shr",
            ShiftOp::ShiftRightUnsigned => "shr.un",
        }
    }

    /// The shifted value must be an integer and the amount an int32 or
    /// native int; each has its own error.
    pub fn transition(self, stack: &[SemanticType]) -> Result<StackTransition, VerifyError> {
        let [.., value, amount] = stack else {
            return Ok(StackTransition::single(
                [SemanticType::Any, SemanticType::Any],
                [],
            ));
        };
        if !FamilySet::INTEGER.contains(value.family()) {
            return Err(VerifyError::ShiftValue {
                instruction: self.name().into(),
                found: value.clone(),
            });
        }
        if !(FamilySet::INT32 | FamilySet::NATIVE_INT).contains(amount.family()) {
            return Err(VerifyError::ShiftAmount {
                instruction: self.name().into(),
                found: amount.clone(),
            });
        }
        Ok(StackTransition::single(
            [value.clone(), amount.clone()],
            [value.clone()],
        ))
    }
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod arithmetic_test;
