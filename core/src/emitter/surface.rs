//! One method per instruction.
//!
//! Each method wraps its operation and hands it to the emitter; none of
//! them add checks of their own. The family methods (`binary`, `compare`,
//! `convert`, ...) take the operation as a value, for callers that pick the
//! instruction at run time.

use ecow::EcoString;
use verasm_types::SemanticType;

use super::Emitter;
use crate::error::EmitResult;
use crate::members::{ConstructorRef, FieldRef, MethodRef};
use crate::ops::{
    AccessKind, ArrayOp, BinaryOp, CallOp, CompareOp, Constant, Conversion, ConversionTarget,
    FieldOp, Operation, ShiftOp, StackOp, UnaryOp,
};

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $method:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $method(&mut self) -> EmitResult<()> {
                self.binary(BinaryOp::$op)
            }
        )*
    };
}

impl Emitter {
    // Arithmetic

    pub fn binary(&mut self, op: BinaryOp) -> EmitResult<()> {
        self.emit(Operation::Arithmetic(op))
    }

    binary_ops! {
        /// Adds two numbers, or an integer to a reference or pointer.
        add => Add,
        add_overflow => AddOverflow,
        unsigned_add_overflow => AddOverflowUnsigned,
        subtract => Subtract,
        subtract_overflow => SubtractOverflow,
        unsigned_subtract_overflow => SubtractOverflowUnsigned,
        multiply => Multiply,
        multiply_overflow => MultiplyOverflow,
        unsigned_multiply_overflow => MultiplyOverflowUnsigned,
        divide => Divide,
        unsigned_divide => DivideUnsigned,
        remainder => Remainder,
        unsigned_remainder => RemainderUnsigned,
        and => And,
        or => Or,
        xor => Xor,
    }

    pub fn unary(&mut self, op: UnaryOp) -> EmitResult<()> {
        self.emit(Operation::Unary(op))
    }

    pub fn negate(&mut self) -> EmitResult<()> {
        self.unary(UnaryOp::Negate)
    }

    pub fn not(&mut self) -> EmitResult<()> {
        self.unary(UnaryOp::Not)
    }

    pub fn shift(&mut self, op: ShiftOp) -> EmitResult<()> {
        self.emit(Operation::Shift(op))
    }

    pub fn shift_left(&mut self) -> EmitResult<()> {
        self.shift(ShiftOp::ShiftLeft)
    }

    pub fn shift_right(&mut self) -> EmitResult<()> {
        self.shift(ShiftOp::ShiftRight)
    }

    pub fn unsigned_shift_right(&mut self) -> EmitResult<()> {
        self.shift(ShiftOp::ShiftRightUnsigned)
    }

    // Comparison

    /// Pops two operands and pushes an int32.
    pub fn compare(&mut self, op: CompareOp) -> EmitResult<()> {
        self.emit(Operation::Comparison(op))
    }

    pub fn compare_equal(&mut self) -> EmitResult<()> {
        self.compare(CompareOp::Equal)
    }

    pub fn compare_greater_than(&mut self) -> EmitResult<()> {
        self.compare(CompareOp::Greater)
    }

    pub fn unsigned_compare_greater_than(&mut self) -> EmitResult<()> {
        self.compare(CompareOp::GreaterUnsigned)
    }

    pub fn compare_less_than(&mut self) -> EmitResult<()> {
        self.compare(CompareOp::Less)
    }

    pub fn unsigned_compare_less_than(&mut self) -> EmitResult<()> {
        self.compare(CompareOp::LessUnsigned)
    }

    // Conversion

    pub fn convert(&mut self, conversion: Conversion) -> EmitResult<()> {
        self.emit(Operation::Conversion(conversion))
    }

    pub fn convert_to(&mut self, target: ConversionTarget) -> EmitResult<()> {
        self.convert(Conversion::new(target))
    }

    pub fn convert_overflow(&mut self, target: ConversionTarget) -> EmitResult<()> {
        self.convert(Conversion::checked(target, false))
    }

    pub fn unsigned_convert_overflow(&mut self, target: ConversionTarget) -> EmitResult<()> {
        self.convert(Conversion::checked(target, true))
    }

    // Fields

    pub fn field(&mut self, kind: AccessKind, field: FieldRef) -> EmitResult<()> {
        self.emit(Operation::FieldAccess(FieldOp { kind, field }))
    }

    pub fn load_field(&mut self, field: FieldRef) -> EmitResult<()> {
        self.field(AccessKind::Load, field)
    }

    pub fn store_field(&mut self, field: FieldRef) -> EmitResult<()> {
        self.field(AccessKind::Store, field)
    }

    pub fn load_field_address(&mut self, field: FieldRef) -> EmitResult<()> {
        self.field(AccessKind::LoadAddress, field)
    }

    // Arrays

    pub fn array(&mut self, op: ArrayOp) -> EmitResult<()> {
        self.emit(Operation::ArrayAccess(op))
    }

    /// Pops a length and pushes a new `element[]`.
    pub fn new_array(&mut self, element: SemanticType) -> EmitResult<()> {
        self.array(ArrayOp::New(element))
    }

    pub fn load_element(&mut self, element: SemanticType) -> EmitResult<()> {
        self.array(ArrayOp::LoadElement(element))
    }

    pub fn store_element(&mut self, element: SemanticType) -> EmitResult<()> {
        self.array(ArrayOp::StoreElement(element))
    }

    pub fn load_element_address(&mut self, element: SemanticType) -> EmitResult<()> {
        self.array(ArrayOp::LoadElementAddress(element))
    }

    pub fn load_length(&mut self) -> EmitResult<()> {
        self.array(ArrayOp::LoadLength)
    }

    // Stack

    pub fn load_constant(&mut self, constant: impl Into<Constant>) -> EmitResult<()> {
        self.emit(Operation::Stack(StackOp::LoadConstant(constant.into())))
    }

    pub fn load_null(&mut self) -> EmitResult<()> {
        self.load_constant(Constant::Null)
    }

    pub fn pop(&mut self) -> EmitResult<()> {
        self.emit(Operation::Stack(StackOp::Pop))
    }

    pub fn duplicate(&mut self) -> EmitResult<()> {
        self.emit(Operation::Stack(StackOp::Duplicate))
    }

    /// Zero-initializes the value type `name` behind the address on the
    /// stack.
    pub fn initialize_object(&mut self, name: impl Into<EcoString>) -> EmitResult<()> {
        self.emit(Operation::Stack(StackOp::InitializeObject(name.into())))
    }

    // Calls

    pub fn call(&mut self, method: MethodRef) -> EmitResult<()> {
        self.emit(Operation::Call(CallOp::Call(method)))
    }

    pub fn new_object(&mut self, constructor: ConstructorRef) -> EmitResult<()> {
        self.emit(Operation::Call(CallOp::NewObject(constructor)))
    }
}
