//! Structural type nodes.
//!
//! Every type known to a [`crate::metadata::typesystem::TypeHost`] is one variant of the closed
//! [`TypeNode`] enum, stored in the host's arena together with its [`InternedKey`]. Nodes are
//! immutable once created; the only interior mutability are the one-time caches of generic
//! instances and specialized nested types (member tables, base class, interfaces, fresh generic
//! parameters) and the lazily resolved target of by-name references.
//!
//! # Node Kinds
//!
//! - [`TypeDefinition`] - A namespace or nested type definition, the root of all member lists
//! - [`TypeReference`] - A by-name reference, resolved lazily against the host's definitions
//! - [`GenericParameter`] - A type or method generic parameter, identified by owner and position
//! - [`GenericTypeInstance`] - A template plus ordered positional arguments
//! - [`SpecializedNestedType`] - A nested type whose enclosing container is a generic instance
//! - [`VectorType`] / [`MatrixType`] - The two variants of the [`ArrayTypeReference`] capability
//! - [`PointerType`], [`ManagedPointerType`], [`ModifiedType`], [`FunctionPointerType`]
//!
//! # Visiting
//!
//! Consumers outside the core (name formatters, serializers) walk nodes through the
//! [`TypeVisitor`] double-dispatch capability, see
//! [`crate::metadata::typesystem::TypeHost::dispatch`].

use std::sync::{atomic::AtomicU32, OnceLock};

use crate::metadata::typesystem::{
    specialized::MemberTable, CustomModifier, EventId, FieldId, GenericParamFlags, InitOnce,
    InternedKey, LayoutKind, MethodId, MethodSignature, PrimitiveTypeCode, PropertyId, TypeFlags,
    TypeId,
};

/// Arena slot of a type node.
#[derive(Debug)]
pub(crate) struct TypeEntry {
    pub(crate) key: InternedKey,
    pub(crate) node: TypeNode,
}

/// A node of the type graph.
#[derive(Debug)]
pub enum TypeNode {
    /// The not-found / unresolved sentinel
    Dummy,
    /// A type definition
    Definition(TypeDefinition),
    /// A by-name type reference
    Reference(TypeReference),
    /// A type or method generic parameter
    GenericParameter(GenericParameter),
    /// A generic type instance
    Instance(GenericTypeInstance),
    /// A nested type specialized by its generic container
    SpecializedNested(SpecializedNestedType),
    /// A single dimensional, zero based array
    Vector(VectorType),
    /// A general (multi-dimensional or non-zero based) array
    Matrix(MatrixType),
    /// An unmanaged pointer
    Pointer(PointerType),
    /// A managed pointer (by-ref)
    ManagedPointer(ManagedPointerType),
    /// A type decorated with custom modifiers
    Modified(ModifiedType),
    /// A function pointer
    FunctionPointer(FunctionPointerType),
}

impl TypeNode {
    /// Short name of the node kind, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TypeNode::Dummy => "dummy",
            TypeNode::Definition(_) => "definition",
            TypeNode::Reference(_) => "reference",
            TypeNode::GenericParameter(_) => "generic parameter",
            TypeNode::Instance(_) => "generic instance",
            TypeNode::SpecializedNested(_) => "specialized nested type",
            TypeNode::Vector(_) => "vector",
            TypeNode::Matrix(_) => "matrix",
            TypeNode::Pointer(_) => "pointer",
            TypeNode::ManagedPointer(_) => "managed pointer",
            TypeNode::Modified(_) => "modified type",
            TypeNode::FunctionPointer(_) => "function pointer",
        }
    }

    /// Returns the array capability of vectors and matrices.
    #[must_use]
    pub fn as_array(&self) -> Option<&dyn ArrayTypeReference> {
        match self {
            TypeNode::Vector(vector) => Some(vector),
            TypeNode::Matrix(matrix) => Some(matrix),
            _ => None,
        }
    }
}

/// A namespace or nested type definition.
///
/// Member lists are append-only; they are filled by the definition builder
/// ([`crate::metadata::typesystem::TypeBuilder`] and the `TypeHost::add_*` functions).
#[derive(Debug)]
pub struct TypeDefinition {
    /// Name of the defining unit (assembly)
    pub unit: String,
    /// Namespace, empty for nested types
    pub namespace: String,
    /// Name
    pub name: String,
    /// Enclosing type of a nested type
    pub container: Option<TypeId>,
    /// Classification flags
    pub flags: TypeFlags,
    /// Field ordering strategy
    pub layout: LayoutKind,
    /// Declared size in bytes, if any
    pub class_size: Option<u32>,
    /// Declared packing (maximum field alignment), if any
    pub packing_size: Option<u16>,
    pub(crate) arity: u16,
    pub(crate) code: PrimitiveTypeCode,
    pub(crate) generic_params: OnceLock<Vec<TypeId>>,
    pub(crate) base: OnceLock<TypeId>,
    pub(crate) interfaces: boxcar::Vec<TypeId>,
    pub(crate) fields: boxcar::Vec<FieldId>,
    pub(crate) methods: boxcar::Vec<MethodId>,
    /// Next method ordinal, claimed before the method is pushed
    pub(crate) method_ordinals: AtomicU32,
    pub(crate) properties: boxcar::Vec<PropertyId>,
    pub(crate) events: boxcar::Vec<EventId>,
    pub(crate) nested_types: boxcar::Vec<TypeId>,
}

impl TypeDefinition {
    /// Generic parameters declared by this type itself, in positional order.
    #[must_use]
    pub fn generic_parameters(&self) -> &[TypeId] {
        self.generic_params.get().map_or(&[], Vec::as_slice)
    }

    /// Number of generic parameters.
    #[must_use]
    pub fn arity(&self) -> u16 {
        self.arity
    }

    /// The declared base class, if one has been set.
    #[must_use]
    pub fn base_class(&self) -> Option<TypeId> {
        self.base.get().copied()
    }

    /// Declared interfaces.
    pub fn interfaces(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.interfaces.iter().map(|(_, id)| *id)
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.iter().map(|(_, id)| *id)
    }

    /// Declared methods, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.methods.iter().map(|(_, id)| *id)
    }

    /// Declared properties.
    pub fn properties(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.properties.iter().map(|(_, id)| *id)
    }

    /// Declared events.
    pub fn events(&self) -> impl Iterator<Item = EventId> + '_ {
        self.events.iter().map(|(_, id)| *id)
    }

    /// Declared nested types.
    pub fn nested_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.nested_types.iter().map(|(_, id)| *id)
    }
}

/// A by-name reference to a type definition.
///
/// Carries the same interned key as the definition it names. Resolution is cached only once it
/// succeeds, so a reference declared before its target resolves as soon as the target exists.
#[derive(Debug)]
pub struct TypeReference {
    /// Name of the unit expected to define the type
    pub unit: String,
    /// Namespace, empty for nested references
    pub namespace: String,
    /// Name
    pub name: String,
    /// Number of generic parameters
    pub arity: u16,
    /// Enclosing type reference of a nested reference
    pub container: Option<TypeId>,
    pub(crate) code: PrimitiveTypeCode,
    pub(crate) resolved: OnceLock<TypeId>,
}

/// Owner of a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericParameterOwner {
    /// A type definition or a specialized nested type
    Type(TypeId),
    /// A method definition or a specialized method
    Method(MethodId),
}

#[derive(Debug)]
pub(crate) enum ParameterConstraints {
    /// Constraints added through the definition builder
    Declared(boxcar::Vec<TypeId>),
    /// Constraints of a fresh parameter, specialized from its template parameter on first use
    Specialized {
        template: TypeId,
        resolved: InitOnce<Vec<TypeId>>,
    },
}

/// A type or method generic parameter.
///
/// Parameters are identified by the interned key of their owner plus their position; the name
/// is informational only.
#[derive(Debug)]
pub struct GenericParameter {
    /// The owning type or method
    pub owner: GenericParameterOwner,
    /// Interned key of the owner
    pub owner_key: InternedKey,
    /// Position in the owner's parameter list
    pub index: u16,
    /// Name, e.g. `T`
    pub name: String,
    /// Variance and special constraint flags
    pub flags: GenericParamFlags,
    pub(crate) constraints: ParameterConstraints,
}

impl GenericParameter {
    /// Returns true for parameters owned by a method.
    #[must_use]
    pub fn is_method_parameter(&self) -> bool {
        matches!(self.owner, GenericParameterOwner::Method(_))
    }
}

/// One-time caches shared by generic instances and specialized nested types.
#[derive(Debug, Default)]
pub(crate) struct SpecializationCache {
    pub(crate) members: InitOnce<MemberTable>,
    pub(crate) base_class: InitOnce<TypeId>,
    pub(crate) interfaces: InitOnce<Vec<TypeId>>,
}

/// A generic template paired with a positional argument list.
#[derive(Debug)]
pub struct GenericTypeInstance {
    /// The template, a definition, a reference to one, or a specialized nested type
    pub template: TypeId,
    /// Positional type arguments
    pub arguments: Vec<TypeId>,
    pub(crate) cache: SpecializationCache,
}

/// A nested type whose enclosing container is a generic instance (or another specialized
/// nested type).
///
/// For `Outer<int>.Mid<string>.Inner` the unspecialized version is the definition
/// `Outer.Mid.Inner`, the partially specialized version is `Inner` as it appears in the member
/// list of the template `Outer<int>.Mid` (one substitution layer already applied), and the
/// owning instance `Outer<int>.Mid<string>` supplies the arguments.
#[derive(Debug)]
pub struct SpecializedNestedType {
    /// The nested type definition
    pub unspecialized: TypeId,
    /// The nested type as seen in the member list of the container's template
    pub partially_specialized: TypeId,
    /// The immediate container
    pub containing: TypeId,
    /// The closest generic instance in the container chain
    pub instance: TypeId,
    pub(crate) generic_params: InitOnce<Vec<TypeId>>,
    pub(crate) cache: SpecializationCache,
}

/// The array capability shared by [`VectorType`] and [`MatrixType`].
pub trait ArrayTypeReference {
    /// Element type
    fn element_type(&self) -> TypeId;
    /// Number of dimensions
    fn rank(&self) -> u32;
    /// True for single dimensional, zero based arrays
    fn is_vector(&self) -> bool;
    /// Lower bounds of the leading dimensions
    fn lower_bounds(&self) -> &[i32];
    /// Sizes of the leading dimensions
    fn sizes(&self) -> &[u32];
}

/// `T[]`
#[derive(Debug)]
pub struct VectorType {
    /// Element type
    pub element: TypeId,
}

impl ArrayTypeReference for VectorType {
    fn element_type(&self) -> TypeId {
        self.element
    }

    fn rank(&self) -> u32 {
        1
    }

    fn is_vector(&self) -> bool {
        true
    }

    fn lower_bounds(&self) -> &[i32] {
        &[]
    }

    fn sizes(&self) -> &[u32] {
        &[]
    }
}

/// `T[,]`, `T[1..5]` and friends
#[derive(Debug)]
pub struct MatrixType {
    /// Element type
    pub element: TypeId,
    /// Number of dimensions
    pub rank: u32,
    /// Lower bounds of the leading dimensions
    pub lower_bounds: Vec<i32>,
    /// Sizes of the leading dimensions
    pub sizes: Vec<u32>,
}

impl ArrayTypeReference for MatrixType {
    fn element_type(&self) -> TypeId {
        self.element
    }

    fn rank(&self) -> u32 {
        self.rank
    }

    fn is_vector(&self) -> bool {
        false
    }

    fn lower_bounds(&self) -> &[i32] {
        &self.lower_bounds
    }

    fn sizes(&self) -> &[u32] {
        &self.sizes
    }
}

/// `T*`
#[derive(Debug)]
pub struct PointerType {
    /// Pointed-to type
    pub target: TypeId,
}

/// `T&`
#[derive(Debug)]
pub struct ManagedPointerType {
    /// Referenced type
    pub target: TypeId,
}

/// A type with custom modifiers, e.g. `int32 modreq(IsVolatile)`
#[derive(Debug)]
pub struct ModifiedType {
    /// The type without modifiers
    pub unmodified: TypeId,
    /// Modifiers in declaration order
    pub modifiers: Vec<CustomModifier>,
}

/// `method int32 *(string)`
#[derive(Debug)]
pub struct FunctionPointerType {
    /// Signature of the pointed-to function
    pub signature: MethodSignature,
}

/// Double-dispatch capability over the node kinds.
///
/// Every function has an empty default, so a visitor only implements the kinds it cares about.
///
/// ```rust
/// use cilmodel::prelude::*;
///
/// struct CountArrays(usize);
///
/// impl TypeVisitor for CountArrays {
///     fn visit_vector(&mut self, _id: TypeId, _vector: &VectorType) {
///         self.0 += 1;
///     }
/// }
///
/// let host = TypeHost::new();
/// let strings = host.vector(host.core().string);
///
/// let mut visitor = CountArrays(0);
/// host.dispatch(strings, &mut visitor);
/// host.dispatch(host.core().string, &mut visitor);
/// assert_eq!(visitor.0, 1);
/// ```
#[allow(unused_variables)]
pub trait TypeVisitor {
    /// The dummy sentinel
    fn visit_dummy(&mut self, id: TypeId) {}
    /// A type definition
    fn visit_definition(&mut self, id: TypeId, definition: &TypeDefinition) {}
    /// A by-name reference
    fn visit_reference(&mut self, id: TypeId, reference: &TypeReference) {}
    /// A generic parameter
    fn visit_generic_parameter(&mut self, id: TypeId, parameter: &GenericParameter) {}
    /// A generic type instance
    fn visit_instance(&mut self, id: TypeId, instance: &GenericTypeInstance) {}
    /// A specialized nested type
    fn visit_specialized_nested(&mut self, id: TypeId, nested: &SpecializedNestedType) {}
    /// A vector
    fn visit_vector(&mut self, id: TypeId, vector: &VectorType) {}
    /// A matrix
    fn visit_matrix(&mut self, id: TypeId, matrix: &MatrixType) {}
    /// An unmanaged pointer
    fn visit_pointer(&mut self, id: TypeId, pointer: &PointerType) {}
    /// A managed pointer
    fn visit_managed_pointer(&mut self, id: TypeId, pointer: &ManagedPointerType) {}
    /// A modified type
    fn visit_modified(&mut self, id: TypeId, modified: &ModifiedType) {}
    /// A function pointer
    fn visit_function_pointer(&mut self, id: TypeId, pointer: &FunctionPointerType) {}
}
