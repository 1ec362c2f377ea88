//! Loads and stores: fields, array elements, locals and arguments.

use verasm_types::SemanticType;

use crate::members::{FieldOwner, FieldRef};
use crate::state::Local;
use crate::transition::{Alternative, StackTransition};
use crate::{Vec, vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Load,
    Store,
    LoadAddress,
}

impl AccessKind {
    /// Inputs and outputs for a slot of type `ty`, after any receiver or
    /// index operands.
    fn effect(self, ty: &SemanticType) -> (Vec<SemanticType>, Vec<SemanticType>) {
        match self {
            AccessKind::Load => (vec![], vec![ty.clone()]),
            AccessKind::Store => (vec![ty.clone()], vec![]),
            AccessKind::LoadAddress => (vec![], vec![SemanticType::by_ref(ty.clone())]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldOp {
    pub kind: AccessKind,
    pub field: FieldRef,
}

impl FieldOp {
    pub fn name(&self) -> &'static str {
        match (self.kind, self.field.is_static) {
            (AccessKind::Load, false) => "LoadField",
            (AccessKind::Store, false) => "StoreField",
            (AccessKind::LoadAddress, false) => "LoadFieldAddress",
            (AccessKind::Load, true) => "LoadStaticField",
            (AccessKind::Store, true) => "StoreStaticField",
            (AccessKind::LoadAddress, true) => "LoadStaticFieldAddress",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match (self.kind, self.field.is_static) {
            (AccessKind::Load, false) => "ldfld",
            (AccessKind::Store, false) => "stfld",
            (AccessKind::LoadAddress, false) => "ldflda",
            (AccessKind::Load, true) => "ldsfld",
            (AccessKind::Store, true) => "stsfld",
            (AccessKind::LoadAddress, true) => "ldsflda",
        }
    }

    /// Instance fields of a class take the object; fields of a value type
    /// take a reference or pointer to it, or the value itself when loading.
    pub fn transition(&self) -> StackTransition {
        let (inputs, outputs) = self.kind.effect(&self.field.ty);
        if self.field.is_static {
            return StackTransition::single(inputs, outputs);
        }
        let receivers = match &self.field.owner {
            FieldOwner::Class(class) => vec![SemanticType::Object(class.clone())],
            FieldOwner::ValueType(name) => {
                let value = SemanticType::value_type(name.clone());
                let mut receivers = vec![
                    SemanticType::by_ref(value.clone()),
                    SemanticType::pointer(value.clone()),
                ];
                if self.kind == AccessKind::Load {
                    receivers.push(value);
                }
                receivers
            }
        };
        StackTransition::new(receivers.into_iter().map(|receiver| {
            Alternative::new(
                core::iter::once(receiver).chain(inputs.iter().cloned()),
                outputs.iter().cloned(),
            )
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayOp {
    New(SemanticType),
    LoadElement(SemanticType),
    StoreElement(SemanticType),
    LoadElementAddress(SemanticType),
    LoadLength,
}

impl ArrayOp {
    pub fn name(&self) -> &'static str {
        match self {
            ArrayOp::New(_) => "NewArray",
            ArrayOp::LoadElement(_) => "LoadElement",
            ArrayOp::StoreElement(_) => "StoreElement",
            ArrayOp::LoadElementAddress(_) => "LoadElementAddress",
            ArrayOp::LoadLength => "LoadLength",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArrayOp::New(_) => "newarr",
            ArrayOp::LoadElement(_) => "ldelem",
            ArrayOp::StoreElement(_) => "stelem",
            ArrayOp::LoadElementAddress(_) => "ldelema",
            ArrayOp::LoadLength => "ldlen",
        }
    }

    pub fn element(&self) -> Option<&SemanticType> {
        match self {
            ArrayOp::New(element)
            | ArrayOp::LoadElement(element)
            | ArrayOp::StoreElement(element)
            | ArrayOp::LoadElementAddress(element) => Some(element),
            ArrayOp::LoadLength => None,
        }
    }

    /// Element operations index with an int32 or a native int.
    pub fn transition(&self) -> StackTransition {
        let indices = [SemanticType::Int32, SemanticType::NativeInt];
        let (kind, element) = match self {
            ArrayOp::New(element) => {
                let array = SemanticType::array(element.clone());
                return StackTransition::new(
                    indices
                        .into_iter()
                        .map(|size| Alternative::new([size], [array.clone()])),
                );
            }
            ArrayOp::LoadLength => {
                return StackTransition::single(
                    [SemanticType::array(SemanticType::Any)],
                    [SemanticType::NativeInt],
                );
            }
            ArrayOp::LoadElement(element) => (AccessKind::Load, element),
            ArrayOp::StoreElement(element) => (AccessKind::Store, element),
            ArrayOp::LoadElementAddress(element) => (AccessKind::LoadAddress, element),
        };
        let array = SemanticType::array(element.clone());
        let (inputs, outputs) = kind.effect(element);
        StackTransition::new(indices.into_iter().map(|index| {
            Alternative::new(
                [array.clone(), index].into_iter().chain(inputs.iter().cloned()),
                outputs.iter().cloned(),
            )
        }))
    }
}

/// Access to a declared local. Carries the local's type, resolved by the
/// emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalOp {
    pub kind: AccessKind,
    pub local: Local,
    pub ty: SemanticType,
}

impl LocalOp {
    pub fn name(&self) -> &'static str {
        match self.kind {
            AccessKind::Load => "LoadLocal",
            AccessKind::Store => "StoreLocal",
            AccessKind::LoadAddress => "LoadLocalAddress",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self.kind {
            AccessKind::Load => "ldloc",
            AccessKind::Store => "stloc",
            AccessKind::LoadAddress => "ldloca",
        }
    }

    pub fn transition(&self) -> StackTransition {
        let (inputs, outputs) = self.kind.effect(&self.ty);
        StackTransition::single(inputs, outputs)
    }
}

/// Access to a parameter of the method being built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgOp {
    pub kind: AccessKind,
    pub index: u16,
    pub ty: SemanticType,
}

impl ArgOp {
    pub fn name(&self) -> &'static str {
        match self.kind {
            AccessKind::Load => "LoadArgument",
            AccessKind::Store => "StoreArgument",
            AccessKind::LoadAddress => "LoadArgumentAddress",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self.kind {
            AccessKind::Load => "ldarg",
            AccessKind::Store => "starg",
            AccessKind::LoadAddress => "ldarga",
        }
    }

    pub fn transition(&self) -> StackTransition {
        let (inputs, outputs) = self.kind.effect(&self.ty);
        StackTransition::single(inputs, outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;
    use pretty_assertions::assert_eq;
    use verasm_types::ClassType;

    fn point_x(kind: AccessKind) -> FieldOp {
        FieldOp {
            kind,
            field: FieldRef::instance(FieldOwner::ValueType("Point".into()), "x", SemanticType::Int32),
        }
    }

    #[test]
    fn test_value_type_field_receivers() {
        let load = point_x(AccessKind::Load).transition();
        assert_eq!(load.alternatives().len(), 3);
        let stack = [SemanticType::value_type("Point")];
        let alt = load.select("LoadField", &stack).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::Int32]);

        let store = point_x(AccessKind::Store).transition();
        let err = store
            .select("StoreField", &[SemanticType::value_type("Point"), SemanticType::Int32])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "StoreField expects Point& or Point* as first value; found Point"
        );
    }

    #[test]
    fn test_class_field_accepts_subclass() {
        let base = ClassType::new("Shape", ClassType::object());
        let circle = ClassType::new("Circle", base.clone());
        let op = FieldOp {
            kind: AccessKind::LoadAddress,
            field: FieldRef::instance(FieldOwner::Class(base), "area", SemanticType::Float64),
        };
        let stack = [SemanticType::Object(circle)];
        let transition = op.transition();
        let alt = transition.select("LoadFieldAddress", &stack).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::by_ref(SemanticType::Float64)]);
    }

    #[test]
    fn test_static_field_has_no_receiver() {
        let op = FieldOp {
            kind: AccessKind::Store,
            field: FieldRef::new_static(
                FieldOwner::Class(ClassType::object()),
                "count",
                SemanticType::Int64,
            ),
        };
        let err = op.transition().select("StoreStaticField", &[]).unwrap_err();
        assert_eq!(err.to_string(), "StoreStaticField expects 1 argument on the stack, found 0");
    }

    #[test]
    fn test_store_element_checks_value_then_index_then_array() {
        let op = ArrayOp::StoreElement(SemanticType::Int32);
        let stack = [
            SemanticType::array(SemanticType::Int32),
            SemanticType::Int64,
            SemanticType::Int32,
        ];
        let err = op.transition().select("StoreElement", &stack).unwrap_err();
        assert_eq!(
            err.to_string(),
            "StoreElement expects an int32 or native int as second value; found System.Int64"
        );
    }

    #[test]
    fn test_load_length_accepts_any_array() {
        let stack = [SemanticType::array(SemanticType::string())];
        let transition = ArrayOp::LoadLength.transition();
        let alt = transition.select("LoadLength", &stack).unwrap();
        assert_eq!(alt.outputs(), &[SemanticType::NativeInt]);
    }
}
