//! Instruction families.
//!
//! [`Operation`] is a closed set of tagged variants. Each family knows how to
//! build its [`StackTransition`] from the stack it is about to run against,
//! so the emitter dispatches on the tag and never on open-ended callbacks.

mod access;
mod arithmetic;
mod compare;
mod convert;

pub use access::{AccessKind, ArgOp, ArrayOp, FieldOp, LocalOp};
pub use arithmetic::{BinaryOp, ShiftOp, UnaryOp};
pub use compare::{BranchCondition, CompareOp};
pub use convert::{Conversion, ConversionTarget};

use ecow::EcoString;
use verasm_types::SemanticType;

use crate::error::VerifyError;
use crate::members::{ConstructorRef, MethodRef};
use crate::transition::{Alternative, StackTransition};
use crate::fmt;

/// A constant pushed by `LoadConstant`.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(EcoString),
    Null,
}

impl Constant {
    pub fn ty(&self) -> SemanticType {
        match self {
            Constant::Int32(_) => SemanticType::Int32,
            Constant::Int64(_) => SemanticType::Int64,
            Constant::Float32(_) => SemanticType::Float32,
            Constant::Float64(_) => SemanticType::Float64,
            Constant::String(_) => SemanticType::string(),
            Constant::Null => SemanticType::Null,
        }
    }
}

impl From<i32> for Constant {
    fn from(value: i32) -> Self {
        Constant::Int32(value)
    }
}

impl From<i64> for Constant {
    fn from(value: i64) -> Self {
        Constant::Int64(value)
    }
}

impl From<f32> for Constant {
    fn from(value: f32) -> Self {
        Constant::Float32(value)
    }
}

impl From<f64> for Constant {
    fn from(value: f64) -> Self {
        Constant::Float64(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::String(value.into())
    }
}

impl From<EcoString> for Constant {
    fn from(value: EcoString) -> Self {
        Constant::String(value)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int32(v) => write!(f, "ldc.i4 {v}"),
            Constant::Int64(v) => write!(f, "ldc.i8 {v}"),
            Constant::Float32(v) => write!(f, "ldc.r4 {v:?}"),
            Constant::Float64(v) => write!(f, "ldc.r8 {v:?}"),
            Constant::String(v) => write!(f, "ldstr {v:?}"),
            Constant::Null => f.write_str("ldnull"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StackOp {
    LoadConstant(Constant),
    Pop,
    Duplicate,
    /// Zero-initializes the value type behind an address.
    InitializeObject(EcoString),
}

impl StackOp {
    pub fn name(&self) -> &'static str {
        match self {
            StackOp::LoadConstant(Constant::Null) => "LoadNull",
            StackOp::LoadConstant(_) => "LoadConstant",
            StackOp::Pop => "Pop",
            StackOp::Duplicate => "Duplicate",
            StackOp::InitializeObject(_) => "InitializeObject",
        }
    }

    pub fn transition(&self, stack: &[SemanticType]) -> StackTransition {
        match self {
            StackOp::LoadConstant(constant) => StackTransition::push([constant.ty()]),
            StackOp::Pop => StackTransition::single([SemanticType::Any], []),
            StackOp::Duplicate => match stack.last() {
                Some(top) => StackTransition::single([top.clone()], [top.clone(), top.clone()]),
                None => StackTransition::single([SemanticType::Any], []),
            },
            StackOp::InitializeObject(name) => {
                let value = SemanticType::value_type(name.clone());
                StackTransition::new([
                    Alternative::new([SemanticType::NativeInt], []),
                    Alternative::new([SemanticType::pointer(value.clone())], []),
                    Alternative::new([SemanticType::by_ref(value)], []),
                ])
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOp {
    Call(MethodRef),
    NewObject(ConstructorRef),
}

impl CallOp {
    pub fn name(&self) -> &'static str {
        match self {
            CallOp::Call(_) => "Call",
            CallOp::NewObject(_) => "NewObject",
        }
    }

    /// The receiver (if any) and parameters in declaration order, replaced
    /// by the return value or the new object.
    pub fn transition(&self) -> StackTransition {
        match self {
            CallOp::Call(method) => {
                let this = method.this.clone().map(SemanticType::Object);
                StackTransition::single(
                    this.into_iter().chain(method.params.iter().cloned()),
                    method.ret.clone(),
                )
            }
            CallOp::NewObject(ctor) => StackTransition::single(
                ctor.params.iter().cloned(),
                [SemanticType::Object(ctor.class.clone())],
            ),
        }
    }
}

/// Instructions that end the current flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlOp {
    Return(Option<SemanticType>),
    Throw,
    Rethrow,
}

impl ControlOp {
    pub fn name(&self) -> &'static str {
        match self {
            ControlOp::Return(_) => "Return",
            ControlOp::Throw => "Throw",
            ControlOp::Rethrow => "ReThrow",
        }
    }

    pub fn transition(&self) -> StackTransition {
        match self {
            ControlOp::Return(ret) => StackTransition::single(ret.clone(), []),
            ControlOp::Throw => StackTransition::single([SemanticType::exception()], []),
            ControlOp::Rethrow => StackTransition::none(),
        }
    }
}

/// One checked instruction, by family.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Arithmetic(BinaryOp),
    Unary(UnaryOp),
    Shift(ShiftOp),
    Comparison(CompareOp),
    Conversion(Conversion),
    FieldAccess(FieldOp),
    ArrayAccess(ArrayOp),
    /// Stack effect of a conditional branch; the target is recorded by the
    /// emitter.
    Branch(BranchCondition),
    LocalAccess(LocalOp),
    ArgumentAccess(ArgOp),
    Stack(StackOp),
    Call(CallOp),
    ExceptionControl(ControlOp),
}

impl Operation {
    pub fn name(&self) -> EcoString {
        match self {
            Operation::Arithmetic(op) => op.name().into(),
            Operation::Unary(op) => op.name().into(),
            Operation::Shift(op) => op.name().into(),
            Operation::Comparison(op) => op.name().into(),
            Operation::Conversion(op) => op.name(),
            Operation::FieldAccess(op) => op.name().into(),
            Operation::ArrayAccess(op) => op.name().into(),
            Operation::Branch(op) => op.name().into(),
            Operation::LocalAccess(op) => op.name().into(),
            Operation::ArgumentAccess(op) => op.name().into(),
            Operation::Stack(op) => op.name().into(),
            Operation::Call(op) => op.name().into(),
            Operation::ExceptionControl(op) => op.name().into(),
        }
    }

    /// Builds the transition to check against `stack`.
    ///
    /// Shifts check their operands here, since their errors are worded
    /// differently from ordinary mismatches.
    pub fn transition(&self, stack: &[SemanticType]) -> Result<StackTransition, VerifyError> {
        Ok(match self {
            Operation::Arithmetic(op) => op.transition(stack),
            Operation::Unary(op) => op.transition(),
            Operation::Shift(op) => return op.transition(stack),
            Operation::Comparison(op) => op.transition(stack),
            Operation::Conversion(op) => op.transition(),
            Operation::FieldAccess(op) => op.transition(),
            Operation::ArrayAccess(op) => op.transition(),
            Operation::Branch(op) => op.transition(stack),
            Operation::LocalAccess(op) => op.transition(),
            Operation::ArgumentAccess(op) => op.transition(),
            Operation::Stack(op) => op.transition(stack),
            Operation::Call(op) => op.transition(),
            Operation::ExceptionControl(op) => op.transition(),
        })
    }

    /// True if nothing can follow this instruction without a label.
    pub fn terminates(&self) -> bool {
        matches!(self, Operation::ExceptionControl(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Arithmetic(op) => f.write_str(op.mnemonic()),
            Operation::Unary(op) => f.write_str(op.mnemonic()),
            Operation::Shift(op) => f.write_str(op.mnemonic()),
            Operation::Comparison(op) => f.write_str(op.mnemonic()),
            Operation::Conversion(op) => f.write_str(&op.mnemonic()),
            Operation::FieldAccess(op) => {
                write!(f, "{} {} ", op.mnemonic(), op.field.ty)?;
                match &op.field.owner {
                    crate::members::FieldOwner::Class(class) => f.write_str(class.name())?,
                    crate::members::FieldOwner::ValueType(name) => write!(f, "valuetype {name}")?,
                }
                write!(f, "::{}", op.field.name)
            }
            Operation::ArrayAccess(op) => match op.element() {
                Some(element) => write!(f, "{} {element}", op.mnemonic()),
                None => f.write_str(op.mnemonic()),
            },
            Operation::Branch(op) => f.write_str(op.mnemonic()),
            Operation::LocalAccess(op) => write!(f, "{} {}", op.mnemonic(), op.local.index()),
            Operation::ArgumentAccess(op) => write!(f, "{} {}", op.mnemonic(), op.index),
            Operation::Stack(StackOp::LoadConstant(constant)) => write!(f, "{constant}"),
            Operation::Stack(StackOp::Pop) => f.write_str("pop"),
            Operation::Stack(StackOp::Duplicate) => f.write_str("dup"),
            Operation::Stack(StackOp::InitializeObject(name)) => write!(f, "initobj {name}"),
            Operation::Call(CallOp::Call(method)) => {
                let owner = method
                    .this
                    .as_ref()
                    .map(|class| class.name())
                    .unwrap_or("static");
                write!(f, "call {owner}::{}", method.name)
            }
            Operation::Call(CallOp::NewObject(ctor)) => write!(f, "newobj {}", ctor.class),
            Operation::ExceptionControl(ControlOp::Return(_)) => f.write_str("ret"),
            Operation::ExceptionControl(ControlOp::Throw) => f.write_str("throw"),
            Operation::ExceptionControl(ControlOp::Rethrow) => f.write_str("rethrow"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;
    use crate::members::FieldRef;
    use pretty_assertions::assert_eq;
    use verasm_types::ClassType;

    #[test]
    fn test_duplicate_copies_top() {
        let stack = [SemanticType::Int64];
        let op = Operation::Stack(StackOp::Duplicate);
        let transition = op.transition(&stack).unwrap();
        let alt = transition.select(&op.name(), &stack).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Int64, SemanticType::Int64]);

        let err = op.transition(&[]).unwrap().select("Duplicate", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate expects 1 argument on the stack, found 0");
    }

    #[test]
    fn test_initialize_object_targets() {
        let op = StackOp::InitializeObject("Point".into());
        let transition = op.transition(&[]);
        let err = transition
            .select("InitializeObject", &[SemanticType::by_ref(SemanticType::Int32)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "InitializeObject expects System.IntPtr, Point* or Point& as first value; found System.Int32&"
        );
    }

    #[test]
    fn test_instance_call_takes_receiver_first() {
        let list = ClassType::new("List", ClassType::object());
        let method = MethodRef::new_instance(list.clone(), "Add", [SemanticType::object()], None);
        let transition = CallOp::Call(method).transition();
        let stack = [SemanticType::string(), SemanticType::Object(list)];
        let err = transition.select("Call", &stack).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Call expects List as first value; found System.String"
        );
    }

    #[test]
    fn test_throw_requires_exception() {
        let op = Operation::ExceptionControl(ControlOp::Throw);
        assert!(op.terminates());
        let stack = [SemanticType::string()];
        let err = op.transition(&stack).unwrap().select("Throw", &stack).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Throw expects System.Exception as first value; found System.String"
        );
    }

    #[test]
    fn test_display() {
        let field = FieldRef::instance(
            crate::members::FieldOwner::ValueType("Point".into()),
            "x",
            SemanticType::Int32,
        );
        let op = Operation::FieldAccess(FieldOp {
            kind: AccessKind::Load,
            field,
        });
        assert_eq!(op.to_string(), "ldfld System.Int32 valuetype Point::x");
        assert_eq!(
            Operation::Stack(StackOp::LoadConstant(Constant::from("hi"))).to_string(),
            "ldstr \"hi\""
        );
    }
}
