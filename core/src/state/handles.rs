//! Single-owner handles.
//!
//! A handle is an index into one emitter's tables, tagged with that emitter's
//! [`EmitterId`]. Ids come from a process-wide counter and are never reused,
//! so a handle presented to the wrong emitter is always detected.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::fmt;

static NEXT_EMITTER_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EmitterId(u32);

impl EmitterId {
    pub(crate) fn fresh() -> Self {
        EmitterId(NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $display:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name {
            pub(crate) owner: EmitterId,
            pub(crate) index: u32,
        }

        impl $name {
            pub(crate) fn new(owner: EmitterId, index: usize) -> Self {
                Self {
                    owner,
                    index: index as u32,
                }
            }

            pub fn index(&self) -> usize {
                self.index as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($display, " #{}"), self.index)
            }
        }
    };
}

handle!(
    /// A branch target.
    Label,
    "Label"
);
handle!(
    /// A try/catch/finally construct.
    Region,
    "ExceptionBlock"
);
handle!(
    /// An open or closed catch body.
    Catch,
    "CatchBlock"
);
handle!(
    /// An open or closed finally body.
    Finally,
    "FinallyBlock"
);
handle!(
    /// A declared local variable.
    Local,
    "Local"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToString;

    #[test]
    fn test_ids_are_unique() {
        let a = EmitterId::fresh();
        let b = EmitterId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let owner = EmitterId::fresh();
        assert_eq!(Region::new(owner, 2).to_string(), "ExceptionBlock #2");
        assert_eq!(Label::new(owner, 0).to_string(), "Label #0");
    }
}
