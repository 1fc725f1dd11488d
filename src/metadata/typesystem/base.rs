//! Identifiers, flag sets and small value types shared by the whole type system.
//!
//! Every node of the type graph lives in an arena owned by the
//! [`crate::metadata::typesystem::TypeHost`] and is addressed by a copyable index instead of a
//! reference-counted pointer. This keeps cyclic relations (a specialized nested type refers to
//! its owning generic instance, whose member list refers back to the nested type) free of
//! ownership cycles.
//!
//! # Key Types
//! - [`TypeId`], [`FieldId`], [`MethodId`], [`PropertyId`], [`EventId`]: Arena indices
//! - [`InternedKey`]: Structural identity handed out by the interning authority
//! - [`CustomModifier`], [`MethodSignature`], [`CallingConvention`]: Signature building blocks
//! - [`TypeFlags`], [`FieldFlags`], [`MethodFlags`], [`GenericParamFlags`]: Attribute flags
//! - [`LayoutKind`], [`PointerSize`]: Layout related settings

use std::fmt;

use bitflags::bitflags;
use strum::{Display, EnumIter};

/// Index of a type node inside a [`crate::metadata::typesystem::TypeHost`].
///
/// Index `0` is reserved for the not-found sentinel [`TypeId::DUMMY`], which every lookup and
/// every degraded specialization returns instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The not-found / unresolved sentinel.
    pub const DUMMY: TypeId = TypeId(0);

    /// Returns the arena index of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if this is the [`TypeId::DUMMY`] sentinel.
    #[must_use]
    pub fn is_dummy(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! member_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Returns the arena index of this member.
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

member_id!(
    /// Index of a field (definition or specialized) inside a type host.
    FieldId
);
member_id!(
    /// Index of a method (definition, specialized or generic instance) inside a type host.
    MethodId
);
member_id!(
    /// Index of a property (definition or specialized) inside a type host.
    PropertyId
);
member_id!(
    /// Index of an event (definition or specialized) inside a type host.
    EventId
);

/// Any member a type can expose, as returned by name based lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberId {
    /// A field
    Field(FieldId),
    /// A method
    Method(MethodId),
    /// A property
    Property(PropertyId),
    /// An event
    Event(EventId),
    /// A nested type
    NestedType(TypeId),
}

/// Integer identity of a structural shape.
///
/// Two nodes carry the same key if and only if they are structurally equal, so equality of
/// types reduces to comparing two integers. Keys are issued by an
/// [`crate::metadata::typesystem::InternAuthority`]; `0` is reserved for the dummy sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedKey(pub u32);

impl InternedKey {
    /// Key of the dummy sentinel.
    pub const DUMMY: InternedKey = InternedKey(0);
}

/// A custom modifier (`modopt` / `modreq`) attached to a modified type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `true` for `modopt`, `false` for `modreq`
    pub optional: bool,
    /// The modifier type, e.g. `System.Runtime.CompilerServices.IsVolatile`
    pub modifier: TypeId,
}

impl CustomModifier {
    /// Creates a required modifier (`modreq`).
    #[must_use]
    pub fn required(modifier: TypeId) -> Self {
        Self {
            optional: false,
            modifier,
        }
    }

    /// Creates an optional modifier (`modopt`).
    #[must_use]
    pub fn optional(modifier: TypeId) -> Self {
        Self {
            optional: true,
            modifier,
        }
    }
}

/// Calling convention of a method or function pointer signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum CallingConvention {
    /// Managed default calling convention
    #[default]
    Default,
    /// Unmanaged C calling convention
    C,
    /// Unmanaged stdcall
    StdCall,
    /// Unmanaged thiscall
    ThisCall,
    /// Unmanaged fastcall
    FastCall,
    /// Managed variable argument list
    VarArg,
}

/// Return type, parameters and extra (vararg) arguments of a method or function pointer.
///
/// Custom modifiers on the return type or on parameters are expressed by
/// [`crate::metadata::typesystem::TypeNode::Modified`] nodes, by-ref parameters by
/// [`crate::metadata::typesystem::TypeNode::ManagedPointer`] nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Calling convention
    pub calling_convention: CallingConvention,
    /// The method takes an implicit `this`
    pub has_this: bool,
    /// Return type
    pub returns: TypeId,
    /// The return value is passed by reference
    pub return_by_ref: bool,
    /// Declared parameter types
    pub parameters: Vec<TypeId>,
    /// Argument types passed after the vararg sentinel
    pub extra_parameters: Vec<TypeId>,
}

impl MethodSignature {
    /// Creates a static managed signature.
    ///
    /// # Arguments
    ///
    /// * `returns` - Return type
    /// * `parameters` - Parameter types in declaration order
    #[must_use]
    pub fn new(returns: TypeId, parameters: Vec<TypeId>) -> Self {
        Self {
            calling_convention: CallingConvention::Default,
            has_this: false,
            returns,
            return_by_ref: false,
            parameters,
            extra_parameters: Vec::new(),
        }
    }

    /// Creates an instance (`hasthis`) managed signature.
    #[must_use]
    pub fn instance(returns: TypeId, parameters: Vec<TypeId>) -> Self {
        Self {
            has_this: true,
            ..Self::new(returns, parameters)
        }
    }

    /// Sets the calling convention.
    #[must_use]
    pub fn with_calling_convention(mut self, calling_convention: CallingConvention) -> Self {
        self.calling_convention = calling_convention;
        self
    }

    /// Appends vararg arguments.
    #[must_use]
    pub fn with_extra_parameters(mut self, extra: Vec<TypeId>) -> Self {
        self.extra_parameters = extra;
        self
    }

    /// Iterates the return type, the parameters and the extra parameters.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.returns)
            .chain(self.parameters.iter().copied())
            .chain(self.extra_parameters.iter().copied())
    }

    /// Rebuilds the signature with every constituent type mapped through `f`.
    ///
    /// Returns `None` if `f` left every type untouched.
    pub(crate) fn map_types(&self, mut f: impl FnMut(TypeId) -> TypeId) -> Option<Self> {
        let mut changed = false;
        let mut map = |ty: TypeId| {
            let mapped = f(ty);
            changed |= mapped != ty;
            mapped
        };

        let returns = map(self.returns);
        let parameters: Vec<TypeId> = self.parameters.iter().map(|p| map(*p)).collect();
        let extra_parameters: Vec<TypeId> =
            self.extra_parameters.iter().map(|p| map(*p)).collect();

        changed.then(|| Self {
            calling_convention: self.calling_convention,
            has_this: self.has_this,
            returns,
            return_by_ref: self.return_by_ref,
            parameters,
            extra_parameters,
        })
    }
}

/// Field ordering strategy of a type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum LayoutKind {
    /// The runtime is free to reorder fields; measured in declaration order
    #[default]
    Auto,
    /// Fields are laid out by sequence number
    Sequential,
    /// Every field carries an explicit offset
    Explicit,
}

/// Platform pointer width used by layout computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerSize {
    /// 32-bit platform
    Bit32,
    /// 64-bit platform
    #[default]
    Bit64,
}

impl PointerSize {
    /// Size of a pointer in bytes.
    #[must_use]
    pub fn bytes(self) -> u32 {
        match self {
            PointerSize::Bit32 => 4,
            PointerSize::Bit64 => 8,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Classification flags of a type definition
    pub struct TypeFlags: u32 {
        /// Type is an interface
        const INTERFACE = 0x0001;
        /// Type is abstract
        const ABSTRACT = 0x0002;
        /// Type is sealed
        const SEALED = 0x0004;
        /// Type is a value type
        const VALUE_TYPE = 0x0008;
        /// Type is an enumeration (implies `VALUE_TYPE`)
        const ENUM = 0x0010;
        /// Type is a delegate
        const DELEGATE = 0x0020;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Field attribute flags
    pub struct FieldFlags: u32 {
        /// Field is static
        const STATIC = 0x0010;
        /// Field can only be initialized in a constructor
        const INIT_ONLY = 0x0020;
        /// Field is a compile time constant
        const LITERAL = 0x0040;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Method attribute flags
    pub struct MethodFlags: u32 {
        /// Method is static
        const STATIC = 0x0010;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method is abstract
        const ABSTRACT = 0x0400;
        /// Method has a special name
        const SPECIAL_NAME = 0x0800;
        /// Method has a name the runtime interprets (constructors)
        const RT_SPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Generic parameter variance and special constraint flags
    pub struct GenericParamFlags: u16 {
        /// Parameter is covariant (`out T`)
        const COVARIANT = 0x0001;
        /// Parameter is contravariant (`in T`)
        const CONTRAVARIANT = 0x0002;
        /// Parameter is constrained to reference types (`class`)
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Parameter is constrained to non-nullable value types (`struct`)
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Parameter requires a default constructor (`new()`)
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_sentinel() {
        assert!(TypeId::DUMMY.is_dummy());
        assert!(!TypeId(7).is_dummy());
        assert_eq!(TypeId(7).index(), 7);
        assert_eq!(TypeId(7).to_string(), "#7");
    }

    #[test]
    fn signature_map_types_reports_changes() {
        let sig = MethodSignature::instance(TypeId(1), vec![TypeId(2), TypeId(3)])
            .with_calling_convention(CallingConvention::VarArg)
            .with_extra_parameters(vec![TypeId(2)]);

        assert!(sig.map_types(|t| t).is_none());

        let mapped = sig
            .map_types(|t| if t == TypeId(2) { TypeId(9) } else { t })
            .unwrap();
        assert_eq!(mapped.parameters, vec![TypeId(9), TypeId(3)]);
        assert_eq!(mapped.extra_parameters, vec![TypeId(9)]);
        assert_eq!(mapped.returns, TypeId(1));
        assert!(mapped.has_this);
        assert_eq!(mapped.calling_convention, CallingConvention::VarArg);
        assert_eq!(sig.types().count(), 4);
    }

    #[test]
    fn pointer_size_bytes() {
        assert_eq!(PointerSize::Bit32.bytes(), 4);
        assert_eq!(PointerSize::Bit64.bytes(), 8);
        assert_eq!(PointerSize::default(), PointerSize::Bit64);
    }

    #[test]
    fn modifiers() {
        assert!(CustomModifier::optional(TypeId(3)).optional);
        assert!(!CustomModifier::required(TypeId(3)).optional);
    }
}
