//! Evaluation stack types and the verifier's operand tables.
//!
//! The CLR verifier does not track the exact type of every value on the evaluation stack. Small
//! integers widen to `int32`, floats to `F`, and values are classified into eight
//! [`StackType`] categories. This module provides:
//!
//! - [`TypeHost::stack_type`], the normalization of a type to the type it has on the stack
//! - [`TypeHost::stack_type_kind`], its [`StackType`] category
//! - [`StackType::binary_result`], the result category of a binary operation, from fixed tables
//! - [`StackType::can_convert_to`], the implicit conversion matrix from a stack category to the
//!   primitive type of a storage location
//!
//! The tables are data, not derived rules; they follow the binary numeric, shift, comparison and
//! integer operation tables of ECMA-335 partition III.
//!
//! # Example
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! assert_eq!(StackType::Int32.merge(StackType::NativeInt), StackType::NativeInt);
//! assert_eq!(StackType::Int32.merge(StackType::Reference), StackType::Invalid);
//! assert_eq!(
//!     StackType::binary_result(BinaryOperation::Subtract, StackType::Pointer, StackType::Pointer),
//!     StackType::NativeInt
//! );
//! assert!(StackType::Int32.can_convert_to(PrimitiveTypeCode::UInt8));
//! ```

use strum::{Display, EnumCount, EnumIter};

use crate::metadata::typesystem::{
    GenericParamFlags, PrimitiveTypeCode, TypeHost, TypeId, TypeNode,
};

/// Verifier category of a value on the evaluation stack.
///
/// The discriminants index the operand tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, EnumIter)]
pub enum StackType {
    /// `int32`, also every smaller integer, `bool` and `char`
    Int32 = 0,
    /// `int64`
    Int64,
    /// `native int`, also function pointers
    NativeInt,
    /// `F`, the internal floating point type
    Float,
    /// Managed pointer `&`
    Reference,
    /// Object reference `O`
    Object,
    /// Unmanaged pointer `*`
    Pointer,
    /// Anything else, including value types other than the primitives
    Invalid,
}

/// Binary operations with distinct operand tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BinaryOperation {
    /// `add`, `add.ovf`, `add.ovf.un`
    Add,
    /// `sub`, `sub.ovf`, `sub.ovf.un`
    Subtract,
    /// `mul`, `div`, `rem` and their overflow/unsigned forms
    MultiplyDivideRemainder,
    /// `and`, `or`, `xor`
    Bitwise,
    /// `shl`, `shr`, `shr.un`
    Shift,
    /// `clt`, `cgt` and the ordering branches
    OrdinalCompare,
    /// `ceq`, `beq`, `bne.un`
    EqualityCompare,
}

use StackType::{Float as F, Int32 as I4, Int64 as I8, Invalid as X, NativeInt as NI, Pointer as P};

type OperandTable = [[StackType; StackType::COUNT]; StackType::COUNT];

#[rustfmt::skip]
const ADD: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  NI, X,  X,  X,  P,  X],
    /* I8 */ [X,  I8, X,  X,  X,  X,  X,  X],
    /* NI */ [NI, X,  NI, X,  X,  X,  P,  X],
    /* F  */ [X,  X,  X,  F,  X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [P,  X,  P,  X,  X,  X,  X,  X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

#[rustfmt::skip]
const SUBTRACT: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  NI, X,  X,  X,  X,  X],
    /* I8 */ [X,  I8, X,  X,  X,  X,  X,  X],
    /* NI */ [NI, X,  NI, X,  X,  X,  X,  X],
    /* F  */ [X,  X,  X,  F,  X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [P,  X,  P,  X,  X,  X,  NI, X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

#[rustfmt::skip]
const MULTIPLY_DIVIDE_REMAINDER: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  NI, X,  X,  X,  X,  X],
    /* I8 */ [X,  I8, X,  X,  X,  X,  X,  X],
    /* NI */ [NI, X,  NI, X,  X,  X,  X,  X],
    /* F  */ [X,  X,  X,  F,  X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

#[rustfmt::skip]
const BITWISE: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  NI, X,  X,  X,  X,  X],
    /* I8 */ [X,  I8, X,  X,  X,  X,  X,  X],
    /* NI */ [NI, X,  NI, X,  X,  X,  X,  X],
    /* F  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

/// Rows are the shifted value, columns the shift amount.
#[rustfmt::skip]
const SHIFT: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  I4, X,  X,  X,  X,  X],
    /* I8 */ [I8, X,  I8, X,  X,  X,  X,  X],
    /* NI */ [NI, X,  NI, X,  X,  X,  X,  X],
    /* F  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

#[rustfmt::skip]
const ORDINAL_COMPARE: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  I4, X,  X,  X,  X,  X],
    /* I8 */ [X,  I4, X,  X,  X,  X,  X,  X],
    /* NI */ [I4, X,  I4, X,  X,  X,  X,  X],
    /* F  */ [X,  X,  X,  I4, X,  X,  X,  X],
    /* &  */ [X,  X,  X,  X,  I4, X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  X,  X,  X],
    /* *  */ [X,  X,  X,  X,  X,  X,  I4, X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

#[rustfmt::skip]
const EQUALITY_COMPARE: OperandTable = [
    //        I4  I8  NI  F   &   O   *   X
    /* I4 */ [I4, X,  I4, X,  X,  X,  X,  X],
    /* I8 */ [X,  I4, X,  X,  X,  X,  X,  X],
    /* NI */ [I4, X,  I4, X,  I4, X,  I4, X],
    /* F  */ [X,  X,  X,  I4, X,  X,  X,  X],
    /* &  */ [X,  X,  I4, X,  I4, X,  X,  X],
    /* O  */ [X,  X,  X,  X,  X,  I4, X,  X],
    /* *  */ [X,  X,  I4, X,  X,  X,  I4, X],
    /* X  */ [X,  X,  X,  X,  X,  X,  X,  X],
];

const Y: bool = true;
const N: bool = false;

/// Implicit conversions from a stack category (rows) to the primitive type of a storage
/// location (columns, in [`PrimitiveTypeCode`] order).
#[rustfmt::skip]
const CONVERSIONS: [[bool; PrimitiveTypeCode::COUNT]; StackType::COUNT] = [
    //        NP Vd Bl Ch I1 U1 I2 U2 I4 U4 I8 U8 R4 R8 IP UP *  &  Str
    /* I4 */ [N, N, Y, Y, Y, Y, Y, Y, Y, Y, N, N, N, N, Y, Y, N, N, N],
    /* I8 */ [N, N, N, N, N, N, N, N, N, N, Y, Y, N, N, N, N, N, N, N],
    /* NI */ [N, N, N, N, Y, Y, Y, Y, Y, Y, N, N, N, N, Y, Y, Y, N, N],
    /* F  */ [N, N, N, N, N, N, N, N, N, N, N, N, Y, Y, N, N, N, N, N],
    /* &  */ [N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, Y, N],
    /* O  */ [Y, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, Y],
    /* *  */ [N, N, N, N, N, N, N, N, N, N, N, N, N, N, Y, Y, Y, N, N],
    /* X  */ [N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N, N],
];

impl StackType {
    /// The result category of `lhs op rhs`; [`StackType::Invalid`] if the verifier rejects it.
    #[must_use]
    pub fn binary_result(operation: BinaryOperation, lhs: StackType, rhs: StackType) -> StackType {
        let table = match operation {
            BinaryOperation::Add => &ADD,
            BinaryOperation::Subtract => &SUBTRACT,
            BinaryOperation::MultiplyDivideRemainder => &MULTIPLY_DIVIDE_REMAINDER,
            BinaryOperation::Bitwise => &BITWISE,
            BinaryOperation::Shift => &SHIFT,
            BinaryOperation::OrdinalCompare => &ORDINAL_COMPARE,
            BinaryOperation::EqualityCompare => &EQUALITY_COMPARE,
        };
        table[lhs as usize][rhs as usize]
    }

    /// The category of a stack slot at a control flow join, by the add table.
    #[must_use]
    pub fn merge(self, other: StackType) -> StackType {
        Self::binary_result(BinaryOperation::Add, self, other)
    }

    /// True if a value of this category may be stored without a conversion instruction in a
    /// location of primitive type `target`.
    #[must_use]
    pub fn can_convert_to(self, target: PrimitiveTypeCode) -> bool {
        CONVERSIONS[self as usize][target as usize]
    }
}

impl TypeHost {
    /// The type `ty` has on the evaluation stack.
    ///
    /// Integers up to 32 bits, `bool` and `char` become `System.Int32`, 64-bit integers
    /// `System.Int64`, floats `System.Double`, pointer-sized integers and unmanaged pointers
    /// `System.IntPtr`; enumerations normalize as their underlying type. Every other type is its
    /// own stack type, so normalizing twice equals normalizing once.
    ///
    /// Unmanaged pointers lose their pointee here but keep their own category in
    /// [`TypeHost::stack_type_kind`], which the operand tables need (`T* - T*` is `native int`
    /// while `T* - int32` stays a pointer).
    /// `stack_type_kind(stack_type(ty))` therefore differs from `stack_type_kind(ty)` exactly for
    /// unmanaged pointers, which map to [`StackType::NativeInt`].
    pub fn stack_type(&self, ty: TypeId) -> TypeId {
        let core = self.core();
        match self.type_code(ty) {
            PrimitiveTypeCode::Boolean
            | PrimitiveTypeCode::Char
            | PrimitiveTypeCode::Int8
            | PrimitiveTypeCode::UInt8
            | PrimitiveTypeCode::Int16
            | PrimitiveTypeCode::UInt16
            | PrimitiveTypeCode::Int32
            | PrimitiveTypeCode::UInt32 => core.int32,
            PrimitiveTypeCode::Int64 | PrimitiveTypeCode::UInt64 => core.int64,
            PrimitiveTypeCode::Float32 | PrimitiveTypeCode::Float64 => core.float64,
            PrimitiveTypeCode::IntPtr | PrimitiveTypeCode::UIntPtr | PrimitiveTypeCode::Pointer => {
                core.intptr
            }
            _ if self.is_enum(ty) => {
                let underlying = self.underlying_type(ty);
                if self.equivalent(underlying, ty) || self.is_enum(underlying) {
                    ty
                } else {
                    self.stack_type(underlying)
                }
            }
            _ => ty,
        }
    }

    /// The [`StackType`] category of values of type `ty`.
    ///
    /// Unlike [`TypeHost::stack_type`], which normalizes unmanaged pointers to `System.IntPtr`,
    /// this keeps [`StackType::Pointer`] for them so the operand tables can tell the two apart.
    pub fn stack_type_kind(&self, ty: TypeId) -> StackType {
        match self.node(ty) {
            TypeNode::Dummy => return StackType::Invalid,
            TypeNode::FunctionPointer(_) => return StackType::NativeInt,
            TypeNode::Pointer(_) => return StackType::Pointer,
            TypeNode::ManagedPointer(_) => return StackType::Reference,
            TypeNode::Modified(modified) => return self.stack_type_kind(modified.unmodified),
            TypeNode::GenericParameter(parameter) => {
                return if parameter
                    .flags
                    .contains(GenericParamFlags::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
                {
                    StackType::Invalid
                } else {
                    StackType::Object
                };
            }
            _ => {}
        }

        match self.type_code(ty) {
            PrimitiveTypeCode::Boolean
            | PrimitiveTypeCode::Char
            | PrimitiveTypeCode::Int8
            | PrimitiveTypeCode::UInt8
            | PrimitiveTypeCode::Int16
            | PrimitiveTypeCode::UInt16
            | PrimitiveTypeCode::Int32
            | PrimitiveTypeCode::UInt32 => StackType::Int32,
            PrimitiveTypeCode::Int64 | PrimitiveTypeCode::UInt64 => StackType::Int64,
            PrimitiveTypeCode::Float32 | PrimitiveTypeCode::Float64 => StackType::Float,
            PrimitiveTypeCode::IntPtr | PrimitiveTypeCode::UIntPtr => StackType::NativeInt,
            PrimitiveTypeCode::Pointer => StackType::Pointer,
            PrimitiveTypeCode::Reference => StackType::Reference,
            PrimitiveTypeCode::String => StackType::Object,
            PrimitiveTypeCode::Void => StackType::Invalid,
            PrimitiveTypeCode::NotPrimitive => {
                if self.is_enum(ty) {
                    let underlying = self.underlying_type(ty);
                    if self.equivalent(underlying, ty) || self.is_enum(underlying) {
                        StackType::Invalid
                    } else {
                        self.stack_type_kind(underlying)
                    }
                } else if self.is_reference_type(ty) {
                    StackType::Object
                } else {
                    StackType::Invalid
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{metadata::typesystem::CustomModifier, test::Fixture};

    #[test]
    fn add_table_scenarios() {
        assert_eq!(StackType::Int32.merge(StackType::Int32), StackType::Int32);
        assert_eq!(StackType::Int32.merge(StackType::NativeInt), StackType::NativeInt);
        assert_eq!(StackType::NativeInt.merge(StackType::Int32), StackType::NativeInt);
        assert_eq!(StackType::Int32.merge(StackType::Reference), StackType::Invalid);
        assert_eq!(StackType::Int32.merge(StackType::Int64), StackType::Invalid);
        assert_eq!(StackType::Pointer.merge(StackType::Int32), StackType::Pointer);
        assert_eq!(StackType::Int32.merge(StackType::Pointer), StackType::Pointer);
    }

    #[test]
    fn subtract_differs_for_pointers() {
        let sub = |l, r| StackType::binary_result(BinaryOperation::Subtract, l, r);
        assert_eq!(sub(StackType::Pointer, StackType::Pointer), StackType::NativeInt);
        assert_eq!(sub(StackType::Pointer, StackType::Int32), StackType::Pointer);
        assert_eq!(sub(StackType::Int32, StackType::Pointer), StackType::Invalid);
        assert_eq!(
            StackType::binary_result(BinaryOperation::Add, StackType::Pointer, StackType::Pointer),
            StackType::Invalid
        );
    }

    #[test]
    fn managed_pointer_arithmetic_is_rejected() {
        for operation in BinaryOperation::iter() {
            if matches!(
                operation,
                BinaryOperation::OrdinalCompare | BinaryOperation::EqualityCompare
            ) {
                continue;
            }
            for other in StackType::iter() {
                assert_eq!(
                    StackType::binary_result(operation, StackType::Reference, other),
                    StackType::Invalid
                );
                assert_eq!(
                    StackType::binary_result(operation, other, StackType::Reference),
                    StackType::Invalid
                );
            }
        }
    }

    #[test]
    fn comparisons_yield_int32() {
        let eq = |l, r| StackType::binary_result(BinaryOperation::EqualityCompare, l, r);
        let ord = |l, r| StackType::binary_result(BinaryOperation::OrdinalCompare, l, r);

        assert_eq!(eq(StackType::Object, StackType::Object), StackType::Int32);
        assert_eq!(ord(StackType::Object, StackType::Object), StackType::Invalid);
        assert_eq!(eq(StackType::Reference, StackType::NativeInt), StackType::Int32);
        assert_eq!(ord(StackType::Float, StackType::Float), StackType::Int32);
        assert_eq!(eq(StackType::Int32, StackType::Int64), StackType::Invalid);

        for lhs in StackType::iter() {
            for rhs in StackType::iter() {
                assert_eq!(eq(lhs, rhs), eq(rhs, lhs));
            }
        }
    }

    #[test]
    fn bitwise_and_shift() {
        let bit = |l, r| StackType::binary_result(BinaryOperation::Bitwise, l, r);
        let shift = |l, r| StackType::binary_result(BinaryOperation::Shift, l, r);

        assert_eq!(bit(StackType::Float, StackType::Float), StackType::Invalid);
        assert_eq!(bit(StackType::Int64, StackType::Int64), StackType::Int64);
        assert_eq!(shift(StackType::Int64, StackType::Int32), StackType::Int64);
        assert_eq!(shift(StackType::Int32, StackType::NativeInt), StackType::Int32);
        assert_eq!(shift(StackType::Int32, StackType::Int64), StackType::Invalid);
    }

    #[test]
    fn conversion_matrix() {
        assert!(StackType::Int32.can_convert_to(PrimitiveTypeCode::Boolean));
        assert!(!StackType::Int32.can_convert_to(PrimitiveTypeCode::Int64));
        assert!(StackType::NativeInt.can_convert_to(PrimitiveTypeCode::Pointer));
        assert!(!StackType::NativeInt.can_convert_to(PrimitiveTypeCode::Boolean));
        assert!(StackType::Object.can_convert_to(PrimitiveTypeCode::String));
        assert!(StackType::Pointer.can_convert_to(PrimitiveTypeCode::UIntPtr));
        for target in PrimitiveTypeCode::iter() {
            assert!(!StackType::Invalid.can_convert_to(target));
        }
    }

    #[test]
    fn normalization() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let core = *host.core();

        assert_eq!(host.stack_type(core.boolean), core.int32);
        assert_eq!(host.stack_type(core.uint16), core.int32);
        assert_eq!(host.stack_type(core.uint64), core.int64);
        assert_eq!(host.stack_type(core.float32), core.float64);
        assert_eq!(host.stack_type(core.uintptr), core.intptr);
        assert_eq!(host.stack_type(host.pointer(core.int32)), core.intptr);
        assert_eq!(host.stack_type(fixture.color), core.int32);
        assert_eq!(host.stack_type(core.string), core.string);
    }

    #[test]
    fn normalization_is_a_closure() {
        let fixture = Fixture::new();
        let host = &fixture.host;

        for index in 0..host.type_count() {
            let ty = TypeId(index as u32);
            let once = host.stack_type(ty);
            assert_eq!(host.stack_type(once), once);
        }
    }

    #[test]
    fn kinds() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let core = *host.core();

        assert_eq!(host.stack_type_kind(core.char), StackType::Int32);
        assert_eq!(host.stack_type_kind(core.int64), StackType::Int64);
        assert_eq!(host.stack_type_kind(core.float32), StackType::Float);
        assert_eq!(host.stack_type_kind(core.intptr), StackType::NativeInt);
        assert_eq!(host.stack_type_kind(core.string), StackType::Object);
        assert_eq!(host.stack_type_kind(fixture.derived), StackType::Object);
        assert_eq!(host.stack_type_kind(host.vector(core.int32)), StackType::Object);
        assert_eq!(
            host.stack_type_kind(host.managed_pointer(core.int32)),
            StackType::Reference
        );
        assert_eq!(host.stack_type_kind(host.pointer(core.int32)), StackType::Pointer);
        assert_eq!(host.stack_type_kind(fixture.color), StackType::Int32);
        assert_eq!(host.stack_type_kind(fixture.point), StackType::Invalid);
        assert_eq!(host.stack_type_kind(core.void), StackType::Invalid);
        assert_eq!(host.stack_type_kind(fixture.box_param()), StackType::Object);
    }

    #[test]
    fn normalization_keeps_kinds_except_for_pointers() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let int32 = host.core().int32;
        let pointers = [
            host.pointer(int32),
            host.modified(host.pointer(int32), vec![CustomModifier::required(fixture.is_volatile)]),
        ];

        for index in 0..host.type_count() {
            let ty = TypeId(index as u32);
            let normalized = host.stack_type_kind(host.stack_type(ty));
            if pointers.contains(&ty) {
                assert_eq!(host.stack_type_kind(ty), StackType::Pointer);
                assert_eq!(normalized, StackType::NativeInt);
            } else {
                assert_eq!(normalized, host.stack_type_kind(ty));
            }
        }
    }
}
