//! # cilmodel Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! of the library. Import it to get quick access to the type host, the builders and the
//! result types of the type algorithms.
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//! let core = *host.core();
//! assert_eq!(host.stack_type_kind(core.int16), StackType::Int32);
//! assert_eq!(
//!     StackType::binary_result(BinaryOperation::Add, StackType::Int32, StackType::NativeInt),
//!     StackType::NativeInt
//! );
//! assert_eq!(host.type_code(core.uint8), PrimitiveTypeCode::UInt8);
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all construction operations
pub use crate::Error;

/// The result type used throughout cilmodel
pub use crate::Result;

// ================================================================================================
// Type Host
// ================================================================================================

/// Owner of the type graph, with its configuration and core types
pub use crate::metadata::typesystem::{CoreTypes, HostConfig, TypeHost};

/// Identity keys and the authority assigning them
pub use crate::metadata::typesystem::{InternAuthority, InternTable, InternedKey};

/// Handles into the type and member arenas
pub use crate::metadata::typesystem::{EventId, FieldId, MemberId, MethodId, PropertyId, TypeId};

// ================================================================================================
// Type Graph
// ================================================================================================

/// Node kinds and their payloads
pub use crate::metadata::typesystem::{
    ArrayTypeReference, GenericParameter, GenericParameterOwner, GenericTypeInstance, MatrixType,
    SpecializedNestedType, TypeDefinition, TypeNode, TypeReference, TypeVisitor, VectorType,
};

/// Members and their origins
pub use crate::metadata::typesystem::{
    EventNode, FieldNode, MemberOrigin, MethodNode, MethodOrigin, PropertyNode,
};

/// Signatures, modifiers and classification flags
pub use crate::metadata::typesystem::{
    CallingConvention, CustomModifier, FieldFlags, GenericParamFlags, LayoutKind, MethodFlags,
    MethodSignature, PointerSize, PrimitiveTypeCode, TypeFlags,
};

// ================================================================================================
// Construction
// ================================================================================================

/// Builders for definitions and their members
pub use crate::metadata::typesystem::{EventDecl, FieldDecl, MethodDecl, PropertyDecl, TypeBuilder};

// ================================================================================================
// Type Algorithms
// ================================================================================================

/// Specialization inputs
pub use crate::metadata::typesystem::{ArgumentSource, RebaseTarget};

/// Operand stack categories and binary operations
pub use crate::metadata::typesystem::{BinaryOperation, StackType};

/// Size and alignment
pub use crate::metadata::typesystem::TypeLayout;

// ================================================================================================
// Diagnostics
// ================================================================================================

/// Diagnostics raised by degraded operations
pub use crate::metadata::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics,
};
