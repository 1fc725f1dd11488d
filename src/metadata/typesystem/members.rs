//! Field, method, property and event nodes.
//!
//! Members live in per-kind arenas of the [`crate::metadata::typesystem::TypeHost`]. Each member
//! is either declared directly on a type definition, or is a specialized wrapper created when the
//! member list of a generic instance (or specialized nested type) is first enumerated. A
//! specialized member records the definition it was ultimately derived from and the partially
//! specialized member it was created from, so further specialization layers can locate the right
//! substitution chain.
//!
//! Methods have a third form, the generic method instance, which pairs a generic method with a
//! positional argument list.

use crate::metadata::typesystem::{
    EventId, FieldFlags, FieldId, InitOnce, InternedKey, MethodFlags, MethodId, MethodSignature,
    PropertyId, TypeId,
};

/// Where a field, property or event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOrigin<Id> {
    /// Declared on a type definition
    Definition,
    /// Created by specializing another member
    Specialized {
        /// The member definition this member was ultimately derived from
        unspecialized: Id,
        /// The member this one was specialized from (one layer less specialized)
        partially_specialized: Id,
    },
}

impl<Id: Copy> MemberOrigin<Id> {
    /// The underlying definition, `this` itself for definitions.
    pub fn unspecialized_or(&self, this: Id) -> Id {
        match self {
            MemberOrigin::Definition => this,
            MemberOrigin::Specialized { unspecialized, .. } => *unspecialized,
        }
    }
}

/// A field.
#[derive(Debug)]
pub struct FieldNode {
    /// The declaring type (definition, generic instance or specialized nested type)
    pub container: TypeId,
    /// Name
    pub name: String,
    /// Field type, already specialized for specialized fields
    pub ty: TypeId,
    /// Attribute flags
    pub flags: FieldFlags,
    /// Width in bits, for bit-fields
    pub bit_width: Option<u8>,
    /// Explicit sequence number, used by sequential layout
    pub sequence: Option<u32>,
    /// Explicit byte offset, used by explicit layout
    pub offset: Option<u32>,
    /// Definition or specialization
    pub origin: MemberOrigin<FieldId>,
}

impl FieldNode {
    /// Field type.
    #[must_use]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Static or literal fields occupy no instance storage.
    #[must_use]
    pub fn is_instance_field(&self) -> bool {
        !self.flags.intersects(FieldFlags::STATIC | FieldFlags::LITERAL)
    }
}

/// Where a method came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOrigin {
    /// Declared on a type definition
    Definition,
    /// Created by specializing another method
    Specialized {
        /// The method definition this method was ultimately derived from
        unspecialized: MethodId,
        /// The method this one was specialized from
        partially_specialized: MethodId,
    },
    /// A generic method instance
    Instance {
        /// The generic method
        generic: MethodId,
        /// Positional method type arguments
        arguments: Vec<TypeId>,
    },
}

/// A method, a specialized method or a generic method instance.
///
/// Signatures of specialized methods and method instances are computed on first access.
#[derive(Debug)]
pub struct MethodNode {
    /// The declaring type
    pub container: TypeId,
    /// Name
    pub name: String,
    /// Attribute flags
    pub flags: MethodFlags,
    /// Number of generic parameters (`0` for method instances)
    pub arity: u16,
    /// Definition, specialization or instance
    pub origin: MethodOrigin,
    pub(crate) key: InternedKey,
    pub(crate) generic_params: InitOnce<Vec<TypeId>>,
    pub(crate) signature: InitOnce<MethodSignature>,
}

impl MethodNode {
    /// Interned key of this method.
    #[must_use]
    pub fn interned_key(&self) -> InternedKey {
        self.key
    }

    /// True for generic methods that have not been instantiated.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.arity > 0
    }

    /// The method definition this method ultimately stems from.
    #[must_use]
    pub fn unspecialized_or(&self, this: MethodId) -> MethodId {
        match &self.origin {
            MethodOrigin::Specialized { unspecialized, .. } => *unspecialized,
            MethodOrigin::Definition | MethodOrigin::Instance { .. } => this,
        }
    }
}

/// A property.
#[derive(Debug)]
pub struct PropertyNode {
    /// The declaring type
    pub container: TypeId,
    /// Name
    pub name: String,
    /// Property type
    pub ty: TypeId,
    /// Index parameter types of indexers
    pub parameters: Vec<TypeId>,
    /// Getter method
    pub getter: Option<MethodId>,
    /// Setter method
    pub setter: Option<MethodId>,
    /// Definition or specialization
    pub origin: MemberOrigin<PropertyId>,
}

/// An event.
#[derive(Debug)]
pub struct EventNode {
    /// The declaring type
    pub container: TypeId,
    /// Name
    pub name: String,
    /// Delegate type of the event
    pub ty: TypeId,
    /// `add_` accessor
    pub adder: Option<MethodId>,
    /// `remove_` accessor
    pub remover: Option<MethodId>,
    /// `raise_` accessor
    pub raiser: Option<MethodId>,
    /// Definition or specialization
    pub origin: MemberOrigin<EventId>,
}
