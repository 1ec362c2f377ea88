use alloc::boxed::Box;
use core::fmt;

use ecow::EcoString;

use super::class::ClassType;
use super::flags::FamilySet;

/// The type of a value on the abstract operand stack.
///
/// Narrow integers never appear here: anything smaller than 32 bits is
/// widened to [`SemanticType::Int32`] when it is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Int32,
    Int64,
    NativeInt,
    Float32,
    Float64,

    /// Reference to an instance of a class.
    Object(ClassType),

    /// Reference to a single-dimension, zero-based array.
    Array(Box<SemanticType>),

    /// The null reference, before it has been given a more specific type.
    Null,

    /// An unboxed value type, identified by name.
    ValueType(EcoString),

    /// Managed reference (`T&`).
    ByRef(Box<SemanticType>),

    /// Unmanaged pointer (`T*`).
    Pointer(Box<SemanticType>),

    /// Wildcard used in instruction signatures; never pushed.
    Any,
}

impl SemanticType {
    pub fn object() -> Self {
        SemanticType::Object(ClassType::object())
    }

    pub fn string() -> Self {
        SemanticType::Object(ClassType::string())
    }

    pub fn exception() -> Self {
        SemanticType::Object(ClassType::exception())
    }

    pub fn array(element: SemanticType) -> Self {
        SemanticType::Array(Box::new(element))
    }

    pub fn by_ref(target: SemanticType) -> Self {
        SemanticType::ByRef(Box::new(target))
    }

    pub fn pointer(target: SemanticType) -> Self {
        SemanticType::Pointer(Box::new(target))
    }

    pub fn value_type(name: impl Into<EcoString>) -> Self {
        SemanticType::ValueType(name.into())
    }

    /// The family this type belongs to. [`SemanticType::Any`] belongs to all.
    pub fn family(&self) -> FamilySet {
        match self {
            SemanticType::Int32 => FamilySet::INT32,
            SemanticType::Int64 => FamilySet::INT64,
            SemanticType::NativeInt => FamilySet::NATIVE_INT,
            SemanticType::Float32 => FamilySet::FLOAT32,
            SemanticType::Float64 => FamilySet::FLOAT64,
            SemanticType::Object(_) | SemanticType::Array(_) | SemanticType::Null => {
                FamilySet::OBJECT
            }
            SemanticType::ValueType(_) => FamilySet::VALUE_TYPE,
            SemanticType::ByRef(_) => FamilySet::REFERENCE,
            SemanticType::Pointer(_) => FamilySet::POINTER,
            SemanticType::Any => FamilySet::all(),
        }
    }

    /// Returns true for object references, arrays and null.
    pub fn is_object_reference(&self) -> bool {
        matches!(
            self,
            SemanticType::Object(_) | SemanticType::Array(_) | SemanticType::Null
        )
    }

    /// The class of an object reference, if it has one.
    pub fn class(&self) -> Option<&ClassType> {
        match self {
            SemanticType::Object(class) => Some(class),
            _ => None,
        }
    }

    /// The pointee of a managed reference or unmanaged pointer.
    pub fn target(&self) -> Option<&SemanticType> {
        match self {
            SemanticType::ByRef(target) | SemanticType::Pointer(target) => Some(target),
            _ => None,
        }
    }

    /// The element type of an array.
    pub fn element(&self) -> Option<&SemanticType> {
        match self {
            SemanticType::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl From<ClassType> for SemanticType {
    fn from(class: ClassType) -> Self {
        SemanticType::Object(class)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Int32 => f.write_str("System.Int32"),
            SemanticType::Int64 => f.write_str("System.Int64"),
            SemanticType::NativeInt => f.write_str("System.IntPtr"),
            SemanticType::Float32 => f.write_str("System.Single"),
            SemanticType::Float64 => f.write_str("System.Double"),
            SemanticType::Object(class) => write!(f, "{class}"),
            SemanticType::Array(element) => write!(f, "{element}[]"),
            SemanticType::Null => f.write_str("null"),
            SemanticType::ValueType(name) => f.write_str(name),
            SemanticType::ByRef(target) => write!(f, "{target}&"),
            SemanticType::Pointer(target) => write!(f, "{target}*"),
            SemanticType::Any => f.write_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_uses_runtime_names() {
        assert_eq!(SemanticType::string().to_string(), "System.String");
        assert_eq!(
            SemanticType::pointer(SemanticType::Int32).to_string(),
            "System.Int32*"
        );
        assert_eq!(
            SemanticType::by_ref(SemanticType::Float64).to_string(),
            "System.Double&"
        );
        assert_eq!(
            SemanticType::array(SemanticType::Int64).to_string(),
            "System.Int64[]"
        );
    }

    #[test]
    fn test_families() {
        assert_eq!(SemanticType::Null.family(), FamilySet::OBJECT);
        assert_eq!(
            SemanticType::array(SemanticType::Int32).family(),
            FamilySet::OBJECT
        );
        assert_eq!(
            SemanticType::by_ref(SemanticType::Int32).family(),
            FamilySet::REFERENCE
        );
        assert!(SemanticType::Any.family().contains(FamilySet::NUMERIC));
    }
}
