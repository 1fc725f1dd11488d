//! CLR type graph and the algorithms operating on it.
//!
//! Every type is a node owned by a [`TypeHost`] and addressed by a copyable [`TypeId`]. Nodes are
//! immutable once built and structurally interned, so two handles to the same structural type
//! compare equal without walking the graph. Members (fields, methods, properties, events) live in
//! their own arenas and are addressed by [`FieldId`], [`MethodId`], [`PropertyId`] and
//! [`EventId`].
//!
//! # Key Components
//!
//! - [`TypeHost`]: Owner of the graph, core types, construction and lookup
//! - [`TypeNode`]: The closed set of node kinds (definitions, references, generic parameters,
//!   instances, specialized nested types, arrays, pointers, modified and function pointer types)
//! - [`TypeBuilder`]: Declares definitions, with [`FieldDecl`], [`MethodDecl`], [`PropertyDecl`]
//!   and [`EventDecl`] for their members
//! - [`InternAuthority`]: Assigns the shared identity keys used by equivalence, pluggable so
//!   several hosts can agree on identities
//! - [`RebaseTarget`] and [`ArgumentSource`]: The two halves of specialization
//! - [`StackType`]: Operand stack categories and the verifier tables
//! - [`TypeLayout`]: Size and alignment of values
//!
//! # Specialization
//!
//! A type mentioning generic parameters is specialized in two steps. Rebasing maps the
//! parameters of a declaration to the fresh parameters of a partially specialized declaration
//! (a specialized nested type or method), and substitution replaces parameters by the positional
//! arguments of an instance. [`TypeHost::specialize_in`] performs both for a member type read
//! through a generic instance. Nodes that mention no affected parameter come back unchanged.
//!
//! Members of instances are materialized on first access and cached; concurrent readers observe a
//! single population.
//!
//! # Degradation
//!
//! Lookups and algorithms never fail. A missing type is [`TypeId::DUMMY`], a missing member is
//! `None`, and malformed input (out-of-range generic arguments, cycles, recursion beyond the
//! limits of [`HostConfig`]) is reported through [`TypeHost::diagnostics`]. Only construction
//! with a broken contract, such as instantiating a non-generic template, returns an
//! [`Error`](crate::Error).
//!
//! # Examples
//!
//! ```rust
//! use cilmodel::metadata::typesystem::{ArgumentSource, TypeBuilder, TypeHost};
//!
//! let host = TypeHost::new();
//! let pair = TypeBuilder::class(&host, "Demo", "Pair")
//!     .generic_params(&["K", "V"])
//!     .declare()?;
//! let [k, v] = [host.generic_parameters(pair)[0], host.generic_parameters(pair)[1]];
//!
//! let core = *host.core();
//! let pair_of = host.instantiate(pair, &[core.int32, core.string])?;
//! let source = ArgumentSource::Type(pair_of);
//!
//! assert_eq!(host.substitute(host.vector(v), source), host.vector(core.string));
//! assert_eq!(host.full_name(host.substitute(k, source)), "System.Int32");
//! # Ok::<(), cilmodel::Error>(())
//! ```

mod base;
mod builder;
mod config;
mod host;
mod intern;
mod layout;
mod lazy;
mod members;
pub(crate) mod node;
mod primitives;
mod relations;
mod specialize;
pub(crate) mod specialized;
mod stack;

pub use base::{
    CallingConvention, CustomModifier, EventId, FieldFlags, FieldId, GenericParamFlags,
    InternedKey, LayoutKind, MemberId, MethodFlags, MethodId, MethodSignature, PointerSize,
    PropertyId, TypeFlags, TypeId,
};
pub use builder::{EventDecl, FieldDecl, MethodDecl, PropertyDecl, TypeBuilder, ENUM_VALUE_FIELD};
pub use config::HostConfig;
pub use host::{CoreTypes, TypeHost};
pub use intern::{InternAuthority, InternTable, TypeShape};
pub use layout::TypeLayout;
pub use lazy::InitOnce;
pub use members::{
    EventNode, FieldNode, MemberOrigin, MethodNode, MethodOrigin, PropertyNode,
};
pub use node::{
    ArrayTypeReference, FunctionPointerType, GenericParameter, GenericParameterOwner,
    GenericTypeInstance, ManagedPointerType, MatrixType, ModifiedType, PointerType,
    SpecializedNestedType, TypeDefinition, TypeNode, TypeReference, TypeVisitor, VectorType,
};
pub use primitives::PrimitiveTypeCode;
pub use specialize::{ArgumentSource, RebaseTarget};
pub use stack::{BinaryOperation, StackType};
