//! Tests for the arithmetic operand tables.

use super::{BinaryOp, ShiftOp, UnaryOp};
use crate::error::VerifyError;
use crate::{ToString, vec};
use pretty_assertions::assert_eq;
use verasm_types::SemanticType;

fn mismatch(op: BinaryOp, stack: &[SemanticType]) -> crate::String {
    op.transition(stack)
        .select(op.name(), stack)
        .unwrap_err()
        .to_string()
}

fn result(op: BinaryOp, stack: &[SemanticType]) -> Vec<SemanticType> {
    op.transition(stack)
        .select(op.name(), stack)
        .unwrap()
        .outputs()
        .to_vec()
}

#[test]
fn test_second_operand_rule_follows_first_family() {
    let string = SemanticType::string();
    let cases = [
        (
            SemanticType::Int32,
            "Add with an int32 expects an int32, native int, reference, or pointer as second value; found System.String",
        ),
        (
            SemanticType::Int64,
            "Add with an int64 expects an int64 as second value; found System.String",
        ),
        (
            SemanticType::NativeInt,
            "Add with a native int expects an int32, native int, reference, or pointer as second value; found System.String",
        ),
        (
            SemanticType::Float32,
            "Add with a float32 expects a float32 as second value; found System.String",
        ),
        (
            SemanticType::Float64,
            "Add with a float64 expects a float64 as second value; found System.String",
        ),
        (
            SemanticType::by_ref(SemanticType::Int32),
            "Add with a reference expects an int32 or native int as second value; found System.String",
        ),
        (
            SemanticType::pointer(SemanticType::Int32),
            "Add with a pointer expects an int32 or native int as second value; found System.String",
        ),
    ];
    for (first, message) in cases {
        assert_eq!(mismatch(BinaryOp::Add, &[first, string.clone()]), message);
    }
}

#[test]
fn test_bad_first_operand() {
    let stack = [SemanticType::string(), SemanticType::Int32];
    assert_eq!(
        mismatch(BinaryOp::Add, &stack),
        "Add expects an int32, int64, native int, float, reference, or pointer as first value; found System.String"
    );
    assert_eq!(
        mismatch(BinaryOp::Multiply, &stack),
        "Multiply expects an int32, int64, native int, or float as first value; found System.String"
    );
    assert_eq!(
        mismatch(BinaryOp::Xor, &[SemanticType::Float64, SemanticType::Int32]),
        "Xor expects an int32, int64, or native int as first value; found System.Double"
    );
}

#[test]
fn test_multiplication_has_no_pointer_arithmetic() {
    let stack = [SemanticType::Int32, SemanticType::string()];
    assert_eq!(
        mismatch(BinaryOp::Multiply, &stack),
        "Multiply with an int32 expects an int32 or native int as second value; found System.String"
    );
    let stack = [SemanticType::pointer(SemanticType::Int32), SemanticType::Int32];
    assert_eq!(
        mismatch(BinaryOp::Multiply, &stack),
        "Multiply expects an int32, int64, native int, or float as first value; found System.Int32*"
    );
}

#[test]
fn test_underflow_cites_two_arguments() {
    for op in BinaryOp::ALL {
        for stack in [vec![], vec![SemanticType::Int32]] {
            let err = op.transition(&stack).select(op.name(), &stack).unwrap_err();
            assert_eq!(
                err,
                VerifyError::StackUnderflow {
                    instruction: op.name().into(),
                    expected: 2,
                    found: stack.len(),
                }
            );
        }
    }
}

#[test]
fn test_results() {
    use SemanticType::*;

    assert_eq!(result(BinaryOp::Add, &[Int32, Int32]), vec![Int32]);
    assert_eq!(result(BinaryOp::Add, &[Int32, NativeInt]), vec![NativeInt]);
    assert_eq!(result(BinaryOp::Add, &[NativeInt, Int32]), vec![NativeInt]);
    assert_eq!(result(BinaryOp::Divide, &[Float32, Float32]), vec![Float32]);

    let int_ref = SemanticType::by_ref(Int32);
    assert_eq!(result(BinaryOp::Add, &[Int32, int_ref.clone()]), vec![int_ref.clone()]);
    assert_eq!(result(BinaryOp::Subtract, &[int_ref.clone(), NativeInt]), vec![int_ref]);

    let ptr = SemanticType::pointer(Float64);
    assert_eq!(result(BinaryOp::Add, &[ptr.clone(), Int32]), vec![ptr]);
}

#[test]
fn test_floats_do_not_mix() {
    let stack = [SemanticType::Float32, SemanticType::Float64];
    assert_eq!(
        mismatch(BinaryOp::Add, &stack),
        "Add with a float32 expects a float32 as second value; found System.Double"
    );
}

#[test]
fn test_int64_does_not_accept_int32() {
    let stack = [SemanticType::Int64, SemanticType::Int32];
    assert_eq!(
        mismatch(BinaryOp::Remainder, &stack),
        "Remainder with an int64 expects an int64 as second value; found System.Int32"
    );
}

#[test]
fn test_unary() {
    let stack = [SemanticType::Float32];
    let transition = UnaryOp::Negate.transition();
    let alt = transition.select("Negate", &stack).unwrap();
    assert_eq!(alt.outputs(), &[SemanticType::Float32]);

    let err = UnaryOp::Not.transition().select("Not", &stack).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Not expects an int32, int64, or native int as first value; found System.Single"
    );
}

#[test]
fn test_shift_value_and_amount_errors_differ() {
    let bad_value = [SemanticType::Float64, SemanticType::Int32];
    let err = ShiftOp::ShiftLeft.transition(&bad_value).unwrap_err();
    assert_eq!(
        err.to_string(),
        "ShiftLeft expects the value to be shifted to be an int32, int64, or native int; found System.Double"
    );

    let bad_amount = [SemanticType::Int64, SemanticType::Int64];
    let err = ShiftOp::ShiftRight.transition(&bad_amount).unwrap_err();
    assert_eq!(
        err.to_string(),
        "ShiftRight expects the shift to be an int32 or native int; found System.Int64"
    );
}

#[test]
fn test_shift_keeps_value_type() {
    let stack = [SemanticType::Int64, SemanticType::Int32];
    let transition = ShiftOp::ShiftRightUnsigned.transition(&stack).unwrap();
    let alt = transition.select("UnsignedShiftRight", &stack).unwrap();
    assert_eq!(alt.outputs(), &[SemanticType::Int64]);
}

#[test]
fn test_shift_underflow() {
    let stack = [SemanticType::Int32];
    let err = ShiftOp::ShiftLeft
        .transition(&stack)
        .unwrap()
        .select("ShiftLeft", &stack)
        .unwrap_err();
    assert_eq!(err.to_string(), "ShiftLeft expects 2 arguments on the stack, found 1");
}
