use alloc::string::String;
use alloc::vec::Vec;

use bitflags::bitflags;

bitflags! {
    /// The coarse type families instruction rules are written in.
    ///
    /// A set of families is what diagnostics print when an operand does
    /// not fit: "expects an int32, native int, reference, or pointer".
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct FamilySet: u16 {
        const INT32 = 1 << 0;
        const INT64 = 1 << 1;
        const NATIVE_INT = 1 << 2;
        const FLOAT32 = 1 << 3;
        const FLOAT64 = 1 << 4;
        /// Managed references (`T&`).
        const REFERENCE = 1 << 5;
        /// Unmanaged pointers (`T*`).
        const POINTER = 1 << 6;
        /// Object references, arrays and null.
        const OBJECT = 1 << 7;
        const VALUE_TYPE = 1 << 8;

        const INTEGER = Self::INT32.bits() | Self::INT64.bits() | Self::NATIVE_INT.bits();
        const FLOAT = Self::FLOAT32.bits() | Self::FLOAT64.bits();
        const NUMERIC = Self::INTEGER.bits() | Self::FLOAT.bits();
        const ADDRESS = Self::REFERENCE.bits() | Self::POINTER.bits();
    }
}

/// Display order of families in diagnostics.
const WORDS: &[(FamilySet, &str)] = &[
    (FamilySet::INT32, "int32"),
    (FamilySet::INT64, "int64"),
    (FamilySet::NATIVE_INT, "native int"),
    (FamilySet::FLOAT32, "float32"),
    (FamilySet::FLOAT64, "float64"),
    (FamilySet::REFERENCE, "reference"),
    (FamilySet::POINTER, "pointer"),
    (FamilySet::OBJECT, "object reference"),
    (FamilySet::VALUE_TYPE, "value type"),
];

impl FamilySet {
    /// Renders the set as an English list with a leading article.
    ///
    /// Both float widths together collapse into "float".
    ///
    /// ```
    /// use verasm_types::FamilySet;
    ///
    /// let set = FamilySet::INT32 | FamilySet::NATIVE_INT | FamilySet::ADDRESS;
    /// assert_eq!(set.describe(), "an int32, native int, reference, or pointer");
    /// assert_eq!(FamilySet::NUMERIC.describe(), "an int32, int64, native int, or float");
    /// assert_eq!(FamilySet::INT64.describe(), "an int64");
    /// ```
    pub fn describe(self) -> String {
        let mut words: Vec<&str> = Vec::new();
        for &(family, word) in WORDS {
            if !self.contains(family) {
                continue;
            }
            if self.contains(FamilySet::FLOAT) && family.intersects(FamilySet::FLOAT) {
                if family == FamilySet::FLOAT32 {
                    words.push("float");
                }
                continue;
            }
            words.push(word);
        }

        let mut out = String::new();
        let Some(first) = words.first() else {
            out.push_str("nothing");
            return out;
        };
        out.push_str(article(first));
        out.push(' ');
        match words.len() {
            1 => out.push_str(first),
            2 => {
                out.push_str(first);
                out.push_str(" or ");
                out.push_str(words[1]);
            }
            n => {
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if i == n - 1 {
                        out.push_str("or ");
                    }
                    out.push_str(word);
                }
            }
        }
        out
    }
}

fn article(word: &str) -> &'static str {
    match word.as_bytes().first() {
        Some(b'a' | b'e' | b'i' | b'o' | b'u') => "an",
        _ => "a",
    }
}
