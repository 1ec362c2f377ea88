use ecow::EcoString;
use verasm_types::SemanticType;

use crate::transition::{Alternative, StackTransition};
use crate::{format, vec};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConversionTarget {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    NativeInt,
    UNativeInt,
    Float32,
    Float64,
    /// Unsigned integer to floating point.
    FloatUnsigned,
}

impl ConversionTarget {
    pub const ALL: [ConversionTarget; 13] = [
        ConversionTarget::Int8,
        ConversionTarget::Int16,
        ConversionTarget::Int32,
        ConversionTarget::Int64,
        ConversionTarget::UInt8,
        ConversionTarget::UInt16,
        ConversionTarget::UInt32,
        ConversionTarget::UInt64,
        ConversionTarget::NativeInt,
        ConversionTarget::UNativeInt,
        ConversionTarget::Float32,
        ConversionTarget::Float64,
        ConversionTarget::FloatUnsigned,
    ];

    fn suffix(self) -> &'static str {
        match self {
            ConversionTarget::Int8 => "i1",
            ConversionTarget::Int16 => "i2",
            ConversionTarget::Int32 => "i4",
            ConversionTarget::Int64 => "i8",
            ConversionTarget::UInt8 => "u1",
            ConversionTarget::UInt16 => "u2",
            ConversionTarget::UInt32 => "u4",
            ConversionTarget::UInt64 => "u8",
            ConversionTarget::NativeInt => "i",
            ConversionTarget::UNativeInt => "u",
            ConversionTarget::Float32 => "r4",
            ConversionTarget::Float64 => "r8",
            ConversionTarget::FloatUnsigned => "r.un",
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            ConversionTarget::Int8 => "SByte",
            ConversionTarget::Int16 => "Int16",
            ConversionTarget::Int32 => "Int32",
            ConversionTarget::Int64 => "Int64",
            ConversionTarget::UInt8 => "Byte",
            ConversionTarget::UInt16 => "UInt16",
            ConversionTarget::UInt32 => "UInt32",
            ConversionTarget::UInt64 => "UInt64",
            ConversionTarget::NativeInt => "IntPtr",
            ConversionTarget::UNativeInt => "UIntPtr",
            ConversionTarget::Float32 => "Single",
            ConversionTarget::Float64 => "Double",
            ConversionTarget::FloatUnsigned => "UnsignedDouble",
        }
    }

    /// Type pushed by the conversion. Narrow integers widen to int32.
    pub fn result(self) -> SemanticType {
        match self {
            ConversionTarget::Int8
            | ConversionTarget::Int16
            | ConversionTarget::Int32
            | ConversionTarget::UInt8
            | ConversionTarget::UInt16
            | ConversionTarget::UInt32 => SemanticType::Int32,
            ConversionTarget::Int64 | ConversionTarget::UInt64 => SemanticType::Int64,
            ConversionTarget::NativeInt | ConversionTarget::UNativeInt => SemanticType::NativeInt,
            ConversionTarget::Float32 => SemanticType::Float32,
            ConversionTarget::Float64 | ConversionTarget::FloatUnsigned => SemanticType::Float64,
        }
    }

    fn is_native(self) -> bool {
        matches!(self, ConversionTarget::NativeInt | ConversionTarget::UNativeInt)
    }
}

/// A numeric conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Conversion {
    pub target: ConversionTarget,
    /// Throw on overflow instead of truncating.
    pub overflow: bool,
    /// Treat the source as unsigned; only meaningful with `overflow`.
    pub unsigned_source: bool,
}

impl Conversion {
    pub fn new(target: ConversionTarget) -> Self {
        Self {
            target,
            overflow: false,
            unsigned_source: false,
        }
    }

    pub fn checked(target: ConversionTarget, unsigned_source: bool) -> Self {
        Self {
            target,
            overflow: true,
            unsigned_source,
        }
    }

    /// Every conversion with a mnemonic of its own.
    pub fn all() -> impl Iterator<Item = Conversion> {
        ConversionTarget::ALL.into_iter().flat_map(|target| {
            let checked = (target != ConversionTarget::FloatUnsigned)
                .then(|| [Conversion::checked(target, false), Conversion::checked(target, true)]);
            core::iter::once(Conversion::new(target)).chain(checked.into_iter().flatten())
        })
    }

    pub fn name(self) -> EcoString {
        let unsigned = if self.unsigned_source { "Unsigned" } else { "" };
        let overflow = if self.overflow { "Overflow" } else { "" };
        format!("{unsigned}ConvertTo{}{overflow}", self.target.type_name()).into()
    }

    pub fn mnemonic(self) -> EcoString {
        let mut text = EcoString::from("conv.");
        if self.overflow {
            text.push_str("ovf.");
        }
        text.push_str(self.target.suffix());
        if self.overflow && self.unsigned_source {
            text.push_str(".un");
        }
        text
    }

    /// Any numeric source. Native targets also take references and
    /// pointers, which is the only way between those families.
    pub fn transition(self) -> StackTransition {
        let out = self.target.result();
        let mut sources = vec![
            SemanticType::Int32,
            SemanticType::Int64,
            SemanticType::NativeInt,
            SemanticType::Float32,
            SemanticType::Float64,
        ];
        if self.target.is_native() {
            sources.push(SemanticType::by_ref(SemanticType::Any));
            sources.push(SemanticType::pointer(SemanticType::Any));
        }
        if self.target == ConversionTarget::FloatUnsigned {
            sources.truncate(3);
        }
        StackTransition::new(
            sources
                .into_iter()
                .map(|ty| Alternative::new([ty], [out.clone()])),
        )
    }
}
