//! Size and alignment of types.
//!
//! [`TypeHost::layout_of`] computes how many bytes a value of a type occupies inline, in a field
//! or an array element, and how it must be aligned:
//!
//! - **Primitives** have their fixed size (pointer-sized kinds use
//!   [`HostConfig::pointer_size`](crate::metadata::typesystem::HostConfig)) and are aligned to it
//! - **Reference types**, pointers, function pointers and generic parameters occupy one pointer
//! - **Enumerations** are laid out as their underlying type
//! - **Structs** walk their instance fields: in declaration order, by sequence number under
//!   [`LayoutKind::Sequential`], or at their declared offsets under [`LayoutKind::Explicit`]
//!
//! Bit-fields are packed into the storage unit of the preceding bit-field while they fit in one
//! alignment unit of their own type; otherwise a new unit starts at the next aligned position.
//! The running bit count is rounded up to whole bytes and then to the overall alignment.
//!
//! # Cycles
//!
//! A field whose type is the type being measured (as with an enumeration whose value field is
//! typed as the enumeration itself) is measured as one byte instead of recursing. Deeper cycles
//! are cut at [`HostConfig::max_layout_depth`](crate::metadata::typesystem::HostConfig) with a
//! diagnostic.
//!
//! # Example
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//! let boolean = host.core().boolean;
//!
//! let flags = TypeBuilder::value_type(&host, "Demo", "Flags").declare()?;
//! host.add_field(flags, FieldDecl::new("a", boolean).bit_width(1))?;
//! host.add_field(flags, FieldDecl::new("b", boolean).bit_width(1))?;
//!
//! let layout = host.layout_of(flags, true);
//! assert_eq!((layout.size, layout.alignment), (1, 1));
//! # Ok::<(), cilmodel::Error>(())
//! ```

use crate::metadata::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    typesystem::{FieldNode, LayoutKind, TypeHost, TypeId, TypeNode},
};

/// Size and alignment of a type, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeLayout {
    /// Size
    pub size: u32,
    /// Alignment, a power of two
    pub alignment: u32,
}

impl TypeLayout {
    /// One byte, byte aligned; the layout of an empty struct and of cut cycles.
    pub const MINIMAL: TypeLayout = TypeLayout {
        size: 1,
        alignment: 1,
    };

    fn uniform(size: u32) -> Self {
        TypeLayout {
            size,
            alignment: size.max(1),
        }
    }
}

impl Default for TypeLayout {
    fn default() -> Self {
        Self::MINIMAL
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl TypeHost {
    /// Size and alignment of values of `ty`.
    ///
    /// # Arguments
    ///
    /// * `ty` - The type to measure
    /// * `may_use_declared` - Use a declared class size where present. Pass `false` when the
    ///   result is used to compute that declared size in the first place.
    pub fn layout_of(&self, ty: TypeId, may_use_declared: bool) -> TypeLayout {
        self.layout_with(ty, ty, may_use_declared, 0)
    }

    fn layout_with(&self, ty: TypeId, root: TypeId, may_use_declared: bool, depth: usize) -> TypeLayout {
        if depth > self.config().max_layout_depth {
            self.diagnostics().push(
                Diagnostic::new(
                    DiagnosticSeverity::Error,
                    DiagnosticCategory::Layout,
                    format!("Layout depth exceeded while measuring {}", self.full_name(root)),
                )
                .with_type_index(ty.0)
                .with_depth(depth),
            );
            return TypeLayout::MINIMAL;
        }
        if depth > 0 && self.equivalent(ty, root) {
            return TypeLayout::MINIMAL;
        }

        let pointer = self.config().pointer_size.bytes();
        match self.node(ty) {
            TypeNode::Dummy => return TypeLayout::MINIMAL,
            TypeNode::Modified(modified) => {
                return self.layout_with(modified.unmodified, root, may_use_declared, depth)
            }
            TypeNode::Pointer(_)
            | TypeNode::ManagedPointer(_)
            | TypeNode::FunctionPointer(_)
            | TypeNode::GenericParameter(_)
            | TypeNode::Vector(_)
            | TypeNode::Matrix(_) => return TypeLayout::uniform(pointer),
            _ => {}
        }

        if let Some(size) = self.type_code(ty).size(self.config().pointer_size) {
            return TypeLayout::uniform(size);
        }
        if self.is_enum(ty) {
            let underlying = self.underlying_type(ty);
            return self.layout_with(underlying, root, may_use_declared, depth + 1);
        }
        if !self.is_value_type(ty) {
            return TypeLayout::uniform(pointer);
        }

        let Some(definition) = self.definition_of(ty) else {
            return TypeLayout::MINIMAL;
        };
        let packing = definition.packing_size.map(u32::from);
        if may_use_declared {
            if let Some(size) = definition.class_size.filter(|size| *size > 0) {
                // Natural alignment of the declared blob
                let alignment = (1 << size.trailing_zeros().min(3)).min(pointer);
                return TypeLayout {
                    size,
                    alignment: packing.map_or(alignment, |p| alignment.min(p.max(1))),
                };
            }
        }

        let mut fields: Vec<&FieldNode> = self
            .fields(ty)
            .into_iter()
            .map(|field| self.field(field))
            .filter(|field| field.is_instance_field())
            .collect();
        if definition.layout == LayoutKind::Sequential {
            fields.sort_by_key(|field| field.sequence.unwrap_or(u32::MAX));
        }

        let measured: Vec<(&FieldNode, TypeLayout)> = fields
            .into_iter()
            .map(|field| {
                let mut layout = self.layout_with(field.ty, root, may_use_declared, depth + 1);
                if let Some(packing) = packing {
                    layout.alignment = layout.alignment.min(packing.max(1));
                }
                layout.alignment = layout.alignment.max(1);
                (field, layout)
            })
            .collect();

        let alignment = measured
            .iter()
            .map(|(_, layout)| layout.alignment)
            .max()
            .unwrap_or(1);

        let size = if definition.layout == LayoutKind::Explicit {
            measured
                .iter()
                .map(|(field, layout)| u64::from(field.offset.unwrap_or(0)) + u64::from(layout.size))
                .max()
                .unwrap_or(0)
        } else {
            Self::sequential_bytes(&measured)
        };

        let size = align_up(size, u64::from(alignment)).max(1);
        TypeLayout {
            size: u32::try_from(size).unwrap_or(u32::MAX),
            alignment,
        }
    }

    /// Bytes occupied by fields laid out one after the other, packing adjacent bit-fields.
    fn sequential_bytes(fields: &[(&FieldNode, TypeLayout)]) -> u64 {
        let mut bits: u64 = 0;
        let mut in_bit_field = false;

        for (field, layout) in fields {
            let unit = u64::from(layout.alignment) * 8;
            match field.bit_width {
                Some(0) => {
                    bits = align_up(bits, unit);
                    in_bit_field = false;
                }
                Some(width) => {
                    let width = u64::from(width);
                    if !(in_bit_field && (bits % unit) + width <= unit) {
                        bits = align_up(bits, unit);
                    }
                    bits += width;
                    in_bit_field = true;
                }
                None => {
                    bits = align_up(bits, unit) + u64::from(layout.size) * 8;
                    in_bit_field = false;
                }
            }
        }

        bits.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::typesystem::{
            FieldDecl, FieldFlags, HostConfig, InternTable, PointerSize, TypeBuilder,
        },
        test::Fixture,
    };

    fn size_of(host: &TypeHost, ty: TypeId) -> (u32, u32) {
        let layout = host.layout_of(ty, true);
        (layout.size, layout.alignment)
    }

    #[test]
    fn primitives_and_references() {
        let host = TypeHost::new();
        let core = *host.core();

        assert_eq!(size_of(&host, core.boolean), (1, 1));
        assert_eq!(size_of(&host, core.char), (2, 2));
        assert_eq!(size_of(&host, core.float64), (8, 8));
        assert_eq!(size_of(&host, core.intptr), (8, 8));
        assert_eq!(size_of(&host, core.string), (8, 8));
        assert_eq!(size_of(&host, core.object), (8, 8));
        assert_eq!(size_of(&host, host.vector(core.int8)), (8, 8));
        assert_eq!(size_of(&host, host.pointer(core.int8)), (8, 8));
    }

    #[test]
    fn pointer_width_follows_config() {
        let host = TypeHost::with_config(HostConfig::x86(), Arc::new(InternTable::new()));
        let core = *host.core();
        assert_eq!(host.config().pointer_size, PointerSize::Bit32);
        assert_eq!(size_of(&host, core.uintptr), (4, 4));
        assert_eq!(size_of(&host, core.string), (4, 4));
        assert_eq!(size_of(&host, core.int64), (8, 8));
    }

    #[test]
    fn struct_padding() {
        let host = TypeHost::new();
        let core = *host.core();

        let mixed = TypeBuilder::value_type(&host, "Demo", "Mixed").declare().unwrap();
        host.add_field(mixed, FieldDecl::new("a", core.uint8)).unwrap();
        host.add_field(mixed, FieldDecl::new("b", core.int32)).unwrap();
        host.add_field(mixed, FieldDecl::new("c", core.int16)).unwrap();
        host.add_field(mixed, FieldDecl::new("s", core.int64).flags(FieldFlags::STATIC))
            .unwrap();

        assert_eq!(size_of(&host, mixed), (12, 4));
    }

    #[test]
    fn sequence_numbers_reorder() {
        let host = TypeHost::new();
        let core = *host.core();

        let ordered = TypeBuilder::value_type(&host, "Demo", "Ordered").declare().unwrap();
        host.add_field(ordered, FieldDecl::new("a", core.uint8).sequence(0))
            .unwrap();
        host.add_field(ordered, FieldDecl::new("c", core.int32).sequence(2))
            .unwrap();
        host.add_field(ordered, FieldDecl::new("b", core.uint8).sequence(1))
            .unwrap();

        // a, b, pad, c
        assert_eq!(size_of(&host, ordered), (8, 4));
    }

    #[test]
    fn bit_fields_pack() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        assert_eq!(size_of(host, fixture.bits), (1, 1));

        let core = *host.core();
        let split = TypeBuilder::value_type(host, "Demo", "Split").declare().unwrap();
        host.add_field(split, FieldDecl::new("a", core.uint8).bit_width(6))
            .unwrap();
        host.add_field(split, FieldDecl::new("b", core.uint8).bit_width(3))
            .unwrap();
        host.add_field(split, FieldDecl::new("c", core.int32).bit_width(20))
            .unwrap();
        host.add_field(split, FieldDecl::new("d", core.int32).bit_width(12))
            .unwrap();

        // b spills into a second byte, c still fits the first int32 unit, d starts the next one
        assert_eq!(size_of(host, split), (8, 4));
    }

    #[test]
    fn explicit_offsets() {
        let host = TypeHost::new();
        let core = *host.core();

        let union = TypeBuilder::value_type(&host, "Demo", "Union")
            .layout(LayoutKind::Explicit)
            .declare()
            .unwrap();
        host.add_field(union, FieldDecl::new("i", core.int32).offset(0))
            .unwrap();
        host.add_field(union, FieldDecl::new("l", core.int64).offset(0))
            .unwrap();
        host.add_field(union, FieldDecl::new("b", core.uint8).offset(9))
            .unwrap();

        assert_eq!(size_of(&host, union), (16, 8));
    }

    #[test]
    fn packing_caps_alignment() {
        let host = TypeHost::new();
        let core = *host.core();

        let packed = TypeBuilder::value_type(&host, "Demo", "Packed")
            .packing_size(1)
            .declare()
            .unwrap();
        host.add_field(packed, FieldDecl::new("a", core.uint8)).unwrap();
        host.add_field(packed, FieldDecl::new("b", core.int64)).unwrap();

        assert_eq!(size_of(&host, packed), (9, 1));
    }

    #[test]
    fn declared_size_is_optional() {
        let host = TypeHost::new();
        let core = *host.core();

        let sized = TypeBuilder::value_type(&host, "Demo", "Sized")
            .class_size(16)
            .declare()
            .unwrap();
        host.add_field(sized, FieldDecl::new("a", core.int32)).unwrap();

        assert_eq!(host.layout_of(sized, true).size, 16);
        assert_eq!(host.layout_of(sized, false).size, 4);
    }

    #[test]
    fn enums_and_cycles() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        assert_eq!(size_of(host, fixture.color), (4, 4));

        // A struct containing itself
        let weird = TypeBuilder::value_type(host, "Demo", "Weird").declare().unwrap();
        host.add_field(weird, FieldDecl::new("self", weird)).unwrap();
        assert_eq!(size_of(host, weird), (1, 1));
    }

    #[test]
    fn generic_structs_use_specialized_fields() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let core = *host.core();

        let of_long = host.instantiate(fixture.holder, &[core.int64]).unwrap();
        let of_byte = host.instantiate(fixture.holder, &[core.uint8]).unwrap();
        assert_eq!(size_of(host, of_long), (16, 8));
        assert_eq!(size_of(host, of_byte), (2, 1));
    }

    #[test]
    fn depth_limit_degrades() {
        let host = TypeHost::with_config(
            HostConfig::default().with_max_layout_depth(1),
            Arc::new(InternTable::new()),
        );
        let core = *host.core();
        let inner = TypeBuilder::value_type(&host, "Demo", "Inner").declare().unwrap();
        host.add_field(inner, FieldDecl::new("x", core.int64)).unwrap();
        let middle = TypeBuilder::value_type(&host, "Demo", "Middle").declare().unwrap();
        host.add_field(middle, FieldDecl::new("i", inner)).unwrap();
        let outer = TypeBuilder::value_type(&host, "Demo", "Outer").declare().unwrap();
        host.add_field(outer, FieldDecl::new("m", middle)).unwrap();

        host.layout_of(outer, true);
        assert!(host.diagnostics().has_errors());
    }
}
