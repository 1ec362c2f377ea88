use alloc::sync::Arc;
use core::fmt;
use core::hash;

use ecow::EcoString;

const OBJECT: &str = "System.Object";
const STRING: &str = "System.String";
const EXCEPTION: &str = "System.Exception";
const ARRAY: &str = "System.Array";

/// A reference type known to the verifier.
///
/// Classes form a single-inheritance tree rooted at `System.Object`. The
/// descriptor is shared, so cloning is a reference count bump. Two class
/// types are equal when their names are equal.
#[derive(Clone)]
pub struct ClassType(Arc<ClassInfo>);

struct ClassInfo {
    name: EcoString,
    base: Option<ClassType>,
}

impl ClassType {
    /// Declares a class deriving from `base`.
    pub fn new(name: impl Into<EcoString>, base: ClassType) -> Self {
        Self(Arc::new(ClassInfo {
            name: name.into(),
            base: Some(base),
        }))
    }

    /// The root of the class hierarchy.
    pub fn object() -> Self {
        Self(Arc::new(ClassInfo {
            name: EcoString::from(OBJECT),
            base: None,
        }))
    }

    pub fn string() -> Self {
        Self::new(STRING, Self::object())
    }

    /// Base class of everything that may be thrown or caught.
    pub fn exception() -> Self {
        Self::new(EXCEPTION, Self::object())
    }

    /// Base class of every array type.
    pub fn array() -> Self {
        Self::new(ARRAY, Self::object())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn base(&self) -> Option<&ClassType> {
        self.0.base.as_ref()
    }

    /// Iterates over this class and all of its ancestors, nearest first.
    pub fn ancestry(&self) -> impl Iterator<Item = &ClassType> {
        core::iter::successors(Some(self), |class| class.base())
    }

    /// Returns true if `self` is `other` or one of its subclasses.
    pub fn derives_from(&self, other: &ClassType) -> bool {
        self.ancestry().any(|class| class == other)
    }

    pub fn is_object(&self) -> bool {
        self.name() == OBJECT
    }

    pub fn is_array_base(&self) -> bool {
        self.name() == ARRAY
    }

    /// Returns true if values of this class can be thrown and caught.
    pub fn is_exception(&self) -> bool {
        self.ancestry().any(|class| class.name() == EXCEPTION)
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for ClassType {}

impl hash::Hash for ClassType {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        // Equality is by name, so hashing must be too.
        self.0.name.hash(state);
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassType").field(&self.name()).finish()
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
