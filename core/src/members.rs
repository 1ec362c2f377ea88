//! Descriptions of the members an instruction stream refers to.
//!
//! These carry only what verification needs: the types flowing in and out.
//! Resolving them against real metadata is the caller's business.

use ecow::EcoString;
use smallvec::SmallVec;
use verasm_types::{ClassType, SemanticType};

/// Parameter and return types of the method body being built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub params: SmallVec<[SemanticType; 4]>,
    pub ret: Option<SemanticType>,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = SemanticType>, ret: Option<SemanticType>) -> Self {
        Self {
            params: params.into_iter().collect(),
            ret,
        }
    }

    /// `() -> void`
    pub fn empty() -> Self {
        Self::new([], None)
    }

    /// Number of values a well-formed body leaves for `Return`.
    pub fn return_arity(&self) -> usize {
        usize::from(self.ret.is_some())
    }
}

/// A method that can be the target of `Call`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRef {
    pub name: EcoString,
    /// Declaring class of an instance method; `None` for static methods.
    pub this: Option<ClassType>,
    pub params: SmallVec<[SemanticType; 4]>,
    pub ret: Option<SemanticType>,
}

impl MethodRef {
    pub fn new_static(
        name: impl Into<EcoString>,
        params: impl IntoIterator<Item = SemanticType>,
        ret: Option<SemanticType>,
    ) -> Self {
        Self {
            name: name.into(),
            this: None,
            params: params.into_iter().collect(),
            ret,
        }
    }

    pub fn new_instance(
        this: ClassType,
        name: impl Into<EcoString>,
        params: impl IntoIterator<Item = SemanticType>,
        ret: Option<SemanticType>,
    ) -> Self {
        Self {
            this: Some(this),
            ..Self::new_static(name, params, ret)
        }
    }
}

/// A constructor invoked by `NewObject`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorRef {
    pub class: ClassType,
    pub params: SmallVec<[SemanticType; 4]>,
}

impl ConstructorRef {
    pub fn new(class: ClassType, params: impl IntoIterator<Item = SemanticType>) -> Self {
        Self {
            class,
            params: params.into_iter().collect(),
        }
    }
}

/// Where a field lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldOwner {
    Class(ClassType),
    ValueType(EcoString),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub owner: FieldOwner,
    pub name: EcoString,
    pub ty: SemanticType,
    pub is_static: bool,
}

impl FieldRef {
    pub fn instance(owner: FieldOwner, name: impl Into<EcoString>, ty: SemanticType) -> Self {
        Self {
            owner,
            name: name.into(),
            ty,
            is_static: false,
        }
    }

    pub fn new_static(owner: FieldOwner, name: impl Into<EcoString>, ty: SemanticType) -> Self {
        Self {
            is_static: true,
            ..Self::instance(owner, name, ty)
        }
    }
}
