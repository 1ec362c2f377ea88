//! Core type representation.
//!
//! - [`SemanticType`]: what a stack slot, local, field or argument holds
//! - [`ClassType`]: a named class with an optional base class
//! - [`FamilySet`]: the coarse families the instruction rules are written in

mod class;
mod flags;
mod ty;

pub use class::ClassType;
pub use flags::FamilySet;
pub use ty::SemanticType;
