//! Assignment compatibility between semantic types.
//!
//! This is not a general subtyping lattice. The integer rules in particular
//! are asymmetric: an int32 may stand in for a native int, but a native int
//! never stands in for an int32, and neither ever stands in for an int64.

use crate::semantic::SemanticType;

/// Returns true if a value of type `actual` may be used where `expected` is
/// required.
///
/// Pure and total; the rules are:
///
/// - identical types are compatible, and `Any` accepts everything;
/// - an int32 is accepted where a native int, reference or pointer is
///   expected, but never where an int64 is;
/// - a native int is accepted only where a native int is expected;
/// - float32 and float64 never convert into each other;
/// - references and pointers never convert into each other;
/// - null is accepted by every object reference and array type;
/// - a class is accepted by any of its ancestors, an array by
///   `System.Array` and `System.Object`;
/// - references, pointers and arrays otherwise require an identical
///   target, unless the expected target is `Any`.
pub fn is_assignable(actual: &SemanticType, expected: &SemanticType) -> bool {
    use SemanticType::*;

    if actual == expected {
        return true;
    }

    match (actual, expected) {
        (_, Any) => true,
        (Int32, NativeInt | ByRef(_) | Pointer(_)) => true,
        (Null, Object(_) | Array(_)) => true,
        (Object(actual), Object(expected)) => actual.derives_from(expected),
        (Array(_), Object(expected)) => expected.is_object() || expected.is_array_base(),
        (Array(actual), Array(expected))
        | (ByRef(actual), ByRef(expected))
        | (Pointer(actual), Pointer(expected)) => **expected == Any || actual == expected,
        _ => false,
    }
}

/// Returns true if a stack shape may flow into a point that recorded
/// `expected`: same depth, and every slot assignable.
pub fn is_shape_assignable(actual: &[SemanticType], expected: &[SemanticType]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(actual, expected)| is_assignable(actual, expected))
}
