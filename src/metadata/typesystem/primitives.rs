//! Primitive type classification.
//!
//! Every node of the type graph reports a [`PrimitiveTypeCode`]. Definitions (and by-name
//! references) of the core library's `System` primitives report their real code, unmanaged and
//! managed pointers report [`PrimitiveTypeCode::Pointer`] / [`PrimitiveTypeCode::Reference`], and
//! everything structural reports [`PrimitiveTypeCode::NotPrimitive`].

use strum::{Display, EnumCount, EnumIter};

use crate::metadata::typesystem::PointerSize;

/// Primitive classification of a type.
///
/// The discriminants are dense and start at `0` so the code can index the implicit conversion
/// matrix in [`crate::metadata::typesystem::stack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
pub enum PrimitiveTypeCode {
    /// Not a primitive (classes, structs, arrays, instances, generic parameters, ...)
    NotPrimitive = 0,
    /// `System.Void`
    Void,
    /// `System.Boolean`
    Boolean,
    /// `System.Char`
    Char,
    /// `System.SByte`
    Int8,
    /// `System.Byte`
    UInt8,
    /// `System.Int16`
    Int16,
    /// `System.UInt16`
    UInt16,
    /// `System.Int32`
    Int32,
    /// `System.UInt32`
    UInt32,
    /// `System.Int64`
    Int64,
    /// `System.UInt64`
    UInt64,
    /// `System.Single`
    Float32,
    /// `System.Double`
    Float64,
    /// `System.IntPtr`
    IntPtr,
    /// `System.UIntPtr`
    UIntPtr,
    /// Unmanaged pointer `T*`
    Pointer,
    /// Managed pointer `T&`
    Reference,
    /// `System.String`
    String,
}

impl PrimitiveTypeCode {
    /// Maps the name of a type in the core library's `System` namespace to its code.
    ///
    /// Returns `None` for every name that is not one of the primitives.
    #[must_use]
    pub fn from_system_name(name: &str) -> Option<Self> {
        Some(match name {
            "Void" => PrimitiveTypeCode::Void,
            "Boolean" => PrimitiveTypeCode::Boolean,
            "Char" => PrimitiveTypeCode::Char,
            "SByte" => PrimitiveTypeCode::Int8,
            "Byte" => PrimitiveTypeCode::UInt8,
            "Int16" => PrimitiveTypeCode::Int16,
            "UInt16" => PrimitiveTypeCode::UInt16,
            "Int32" => PrimitiveTypeCode::Int32,
            "UInt32" => PrimitiveTypeCode::UInt32,
            "Int64" => PrimitiveTypeCode::Int64,
            "UInt64" => PrimitiveTypeCode::UInt64,
            "Single" => PrimitiveTypeCode::Float32,
            "Double" => PrimitiveTypeCode::Float64,
            "IntPtr" => PrimitiveTypeCode::IntPtr,
            "UIntPtr" => PrimitiveTypeCode::UIntPtr,
            "String" => PrimitiveTypeCode::String,
            _ => return None,
        })
    }

    /// The name of the corresponding type in the `System` namespace, if there is one.
    #[must_use]
    pub fn system_name(self) -> Option<&'static str> {
        Some(match self {
            PrimitiveTypeCode::Void => "Void",
            PrimitiveTypeCode::Boolean => "Boolean",
            PrimitiveTypeCode::Char => "Char",
            PrimitiveTypeCode::Int8 => "SByte",
            PrimitiveTypeCode::UInt8 => "Byte",
            PrimitiveTypeCode::Int16 => "Int16",
            PrimitiveTypeCode::UInt16 => "UInt16",
            PrimitiveTypeCode::Int32 => "Int32",
            PrimitiveTypeCode::UInt32 => "UInt32",
            PrimitiveTypeCode::Int64 => "Int64",
            PrimitiveTypeCode::UInt64 => "UInt64",
            PrimitiveTypeCode::Float32 => "Single",
            PrimitiveTypeCode::Float64 => "Double",
            PrimitiveTypeCode::IntPtr => "IntPtr",
            PrimitiveTypeCode::UIntPtr => "UIntPtr",
            PrimitiveTypeCode::String => "String",
            PrimitiveTypeCode::NotPrimitive
            | PrimitiveTypeCode::Pointer
            | PrimitiveTypeCode::Reference => return None,
        })
    }

    /// Storage size in bytes, `None` for non-primitives.
    ///
    /// Pointer sized kinds (native integers, pointers, references and `String`) use the
    /// platform pointer width.
    #[must_use]
    pub fn size(self, pointer_size: PointerSize) -> Option<u32> {
        match self {
            PrimitiveTypeCode::Void
            | PrimitiveTypeCode::Boolean
            | PrimitiveTypeCode::Int8
            | PrimitiveTypeCode::UInt8 => Some(1),
            PrimitiveTypeCode::Char | PrimitiveTypeCode::Int16 | PrimitiveTypeCode::UInt16 => {
                Some(2)
            }
            PrimitiveTypeCode::Int32 | PrimitiveTypeCode::UInt32 | PrimitiveTypeCode::Float32 => {
                Some(4)
            }
            PrimitiveTypeCode::Int64 | PrimitiveTypeCode::UInt64 | PrimitiveTypeCode::Float64 => {
                Some(8)
            }
            PrimitiveTypeCode::IntPtr
            | PrimitiveTypeCode::UIntPtr
            | PrimitiveTypeCode::Pointer
            | PrimitiveTypeCode::Reference
            | PrimitiveTypeCode::String => Some(pointer_size.bytes()),
            PrimitiveTypeCode::NotPrimitive => None,
        }
    }

    /// Integral kinds, including `Boolean` and `Char`.
    #[must_use]
    pub fn is_integral(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Signed integral kinds.
    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveTypeCode::Int8
                | PrimitiveTypeCode::Int16
                | PrimitiveTypeCode::Int32
                | PrimitiveTypeCode::Int64
                | PrimitiveTypeCode::IntPtr
        )
    }

    /// Unsigned integral kinds, including `Boolean` and `Char`.
    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveTypeCode::Boolean
                | PrimitiveTypeCode::Char
                | PrimitiveTypeCode::UInt8
                | PrimitiveTypeCode::UInt16
                | PrimitiveTypeCode::UInt32
                | PrimitiveTypeCode::UInt64
                | PrimitiveTypeCode::UIntPtr
        )
    }

    /// `Single` and `Double`.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(self, PrimitiveTypeCode::Float32 | PrimitiveTypeCode::Float64)
    }

    /// Kinds whose width depends on the platform pointer size.
    #[must_use]
    pub fn is_pointer_sized(self) -> bool {
        matches!(
            self,
            PrimitiveTypeCode::IntPtr
                | PrimitiveTypeCode::UIntPtr
                | PrimitiveTypeCode::Pointer
                | PrimitiveTypeCode::Reference
        )
    }

    /// Primitive value types, i.e. everything with a fixed storage size except `String`.
    #[must_use]
    pub fn is_value_type(self) -> bool {
        !matches!(
            self,
            PrimitiveTypeCode::NotPrimitive | PrimitiveTypeCode::String
        )
    }

    /// The signed integral of the same width, the code itself for everything else.
    #[must_use]
    pub fn signed_equivalent(self) -> Self {
        match self {
            PrimitiveTypeCode::UInt8 => PrimitiveTypeCode::Int8,
            PrimitiveTypeCode::UInt16 | PrimitiveTypeCode::Char => PrimitiveTypeCode::Int16,
            PrimitiveTypeCode::UInt32 => PrimitiveTypeCode::Int32,
            PrimitiveTypeCode::UInt64 => PrimitiveTypeCode::Int64,
            PrimitiveTypeCode::UIntPtr => PrimitiveTypeCode::IntPtr,
            other => other,
        }
    }

    /// The unsigned integral of the same width, the code itself for everything else.
    #[must_use]
    pub fn unsigned_equivalent(self) -> Self {
        match self {
            PrimitiveTypeCode::Int8 => PrimitiveTypeCode::UInt8,
            PrimitiveTypeCode::Int16 => PrimitiveTypeCode::UInt16,
            PrimitiveTypeCode::Int32 => PrimitiveTypeCode::UInt32,
            PrimitiveTypeCode::Int64 => PrimitiveTypeCode::UInt64,
            PrimitiveTypeCode::IntPtr => PrimitiveTypeCode::UIntPtr,
            other => other,
        }
    }
}
