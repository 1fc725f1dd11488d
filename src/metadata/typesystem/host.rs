//! The type host: arena, canonicalization and definition lookup.
//!
//! This module provides the [`TypeHost`], the owner of every node of one type graph. It serves as
//! the central hub for node construction, interning, definition lookup and reference resolution;
//! the algorithms operating on the graph (specialization, member specialization, type relations,
//! stack semantics and layout) are implemented as further `impl TypeHost` blocks in the sibling
//! modules.
//!
//! # Key Components
//!
//! - [`TypeHost`] - Owner of the type graph
//! - [`CoreTypes`] - The core library types every host is bootstrapped with
//!
//! # Host Architecture
//!
//! - **Arenas**: types, fields, methods, properties and events are stored in `boxcar::Vec`s,
//!   giving lock-free append and stable indices ([`TypeId`], [`FieldId`], ...)
//! - **Canonical table**: constructed nodes (instances, specialized nested types, arrays,
//!   pointers, modified types, function pointers) are deduplicated by interned key in a
//!   `DashMap`, so building a structurally equal node twice yields the same [`TypeId`]
//! - **Definition index**: definitions are indexed by interned key in a `SkipMap`, plus a
//!   secondary full-name index
//! - **Interning authority**: injected as `Arc<dyn InternAuthority>`
//!
//! # Thread Safety
//!
//! [`TypeHost`] is [`Send`] and [`Sync`]. Construction of nodes never holds a lock while
//! building: a node is created first and then raced into the canonical table, the loser's node
//! stays unreachable in the arena.
//!
//! # Examples
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//! let int32 = host.core().int32;
//!
//! let first = host.vector(int32);
//! let second = host.vector(int32);
//! assert_eq!(first, second);
//! assert_eq!(host.full_name(first), "System.Int32[]");
//!
//! let reference = host.type_reference("mscorlib", "System", "Int32", 0);
//! assert_eq!(host.resolve(reference), int32);
//! assert_eq!(host.interned_key(reference), host.interned_key(int32));
//! ```

use std::{
    fmt::Write,
    sync::{atomic::AtomicU32, Arc},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    metadata::{
        diagnostics::{DiagnosticCategory, Diagnostics},
        typesystem::{
            node::{ParameterConstraints, SpecializationCache, TypeEntry},
            CustomModifier, EventId, EventNode, FieldId, FieldNode, FunctionPointerType,
            GenericParamFlags, GenericParameter, GenericParameterOwner, GenericTypeInstance,
            HostConfig, InitOnce, InternAuthority, InternTable, InternedKey, LayoutKind,
            ManagedPointerType, MatrixType, MethodId, MethodNode, MethodOrigin, MethodSignature,
            ModifiedType, PointerType, PrimitiveTypeCode, PropertyId, PropertyNode,
            SpecializedNestedType, TypeDefinition, TypeFlags, TypeId, TypeNode, TypeReference,
            TypeShape, TypeVisitor, VectorType,
        },
    },
    Error, Result,
};

/// The core library types every [`TypeHost`] is bootstrapped with.
///
/// All of them are definitions in the `System` namespace of
/// [`HostConfig::core_assembly`](crate::metadata::typesystem::HostConfig::core_assembly).
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreTypes {
    /// `System.Object`
    pub object: TypeId,
    /// `System.ValueType`
    pub value_type: TypeId,
    /// `System.Enum`
    pub enum_type: TypeId,
    /// `System.Array`
    pub array: TypeId,
    /// `System.String`
    pub string: TypeId,
    /// `System.Delegate`
    pub delegate: TypeId,
    /// `System.MulticastDelegate`
    pub multicast_delegate: TypeId,
    /// `System.Void`
    pub void: TypeId,
    /// `System.Boolean`
    pub boolean: TypeId,
    /// `System.Char`
    pub char: TypeId,
    /// `System.SByte`
    pub int8: TypeId,
    /// `System.Byte`
    pub uint8: TypeId,
    /// `System.Int16`
    pub int16: TypeId,
    /// `System.UInt16`
    pub uint16: TypeId,
    /// `System.Int32`
    pub int32: TypeId,
    /// `System.UInt32`
    pub uint32: TypeId,
    /// `System.Int64`
    pub int64: TypeId,
    /// `System.UInt64`
    pub uint64: TypeId,
    /// `System.Single`
    pub float32: TypeId,
    /// `System.Double`
    pub float64: TypeId,
    /// `System.IntPtr`
    pub intptr: TypeId,
    /// `System.UIntPtr`
    pub uintptr: TypeId,
    /// `System.TypedReference`
    pub typed_reference: TypeId,
}

impl CoreTypes {
    /// The core definition carrying `code`, if it is a primitive.
    #[must_use]
    pub fn by_code(&self, code: PrimitiveTypeCode) -> Option<TypeId> {
        Some(match code {
            PrimitiveTypeCode::Void => self.void,
            PrimitiveTypeCode::Boolean => self.boolean,
            PrimitiveTypeCode::Char => self.char,
            PrimitiveTypeCode::Int8 => self.int8,
            PrimitiveTypeCode::UInt8 => self.uint8,
            PrimitiveTypeCode::Int16 => self.int16,
            PrimitiveTypeCode::UInt16 => self.uint16,
            PrimitiveTypeCode::Int32 => self.int32,
            PrimitiveTypeCode::UInt32 => self.uint32,
            PrimitiveTypeCode::Int64 => self.int64,
            PrimitiveTypeCode::UInt64 => self.uint64,
            PrimitiveTypeCode::Float32 => self.float32,
            PrimitiveTypeCode::Float64 => self.float64,
            PrimitiveTypeCode::IntPtr => self.intptr,
            PrimitiveTypeCode::UIntPtr => self.uintptr,
            PrimitiveTypeCode::String => self.string,
            PrimitiveTypeCode::NotPrimitive
            | PrimitiveTypeCode::Pointer
            | PrimitiveTypeCode::Reference => return None,
        })
    }
}

/// Everything needed to declare a type definition.
#[derive(Debug, Clone)]
pub(crate) struct DefinitionDecl {
    pub(crate) unit: String,
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) container: Option<TypeId>,
    pub(crate) flags: TypeFlags,
    pub(crate) layout: LayoutKind,
    pub(crate) class_size: Option<u32>,
    pub(crate) packing_size: Option<u16>,
    pub(crate) generic_params: Vec<(String, GenericParamFlags)>,
    pub(crate) base: Option<TypeId>,
    pub(crate) interfaces: Vec<TypeId>,
}

/// Owner of a type graph.
///
/// Holds the node arenas, the canonical tables, the definition indices, the injected interning
/// authority and the diagnostics collector. Create one with [`TypeHost::new`] or
/// [`TypeHost::with_config`]; both bootstrap the [`CoreTypes`].
pub struct TypeHost {
    /// Platform and budget settings
    config: HostConfig,
    /// Injected interning authority
    interner: Arc<dyn InternAuthority>,
    /// Degradations observed while working on this graph
    diagnostics: Arc<Diagnostics>,
    /// Type arena, index 0 is the dummy sentinel
    types: boxcar::Vec<TypeEntry>,
    /// Field arena
    fields: boxcar::Vec<FieldNode>,
    /// Method arena
    methods: boxcar::Vec<MethodNode>,
    /// Property arena
    properties: boxcar::Vec<PropertyNode>,
    /// Event arena
    events: boxcar::Vec<EventNode>,
    /// Constructed nodes by interned key
    canonical: DashMap<InternedKey, TypeId>,
    /// By-name references by interned key (they share keys with the definitions they name)
    references: DashMap<InternedKey, TypeId>,
    /// Generic method instances by interned key
    method_instances: DashMap<InternedKey, MethodId>,
    /// Primary definition index
    definitions: SkipMap<InternedKey, TypeId>,
    /// Secondary index: definitions by full name (may have duplicates across units)
    definitions_by_fullname: DashMap<String, Vec<TypeId>>,
    /// Bootstrapped core library types
    core: CoreTypes,
}

impl std::fmt::Debug for TypeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHost")
            .field("config", &self.config)
            .field("types", &self.types.count())
            .field("fields", &self.fields.count())
            .field("methods", &self.methods.count())
            .field("definitions", &self.definitions.len())
            .field("diagnostics", &self.diagnostics.count())
            .finish_non_exhaustive()
    }
}

impl Default for TypeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHost {
    /// Creates a host for 64-bit platforms with its own [`InternTable`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HostConfig::default(), Arc::new(InternTable::new()))
    }

    /// Creates a host with an explicit configuration and interning authority.
    ///
    /// Several hosts may share one authority; keys are then comparable across hosts.
    ///
    /// # Arguments
    ///
    /// * `config` - Platform and budget settings
    /// * `interner` - The interning authority, must outlive the host
    #[must_use]
    pub fn with_config(config: HostConfig, interner: Arc<dyn InternAuthority>) -> Self {
        let mut host = TypeHost {
            config,
            interner,
            diagnostics: Arc::new(Diagnostics::new()),
            types: boxcar::Vec::new(),
            fields: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            properties: boxcar::Vec::new(),
            events: boxcar::Vec::new(),
            canonical: DashMap::new(),
            references: DashMap::new(),
            method_instances: DashMap::new(),
            definitions: SkipMap::new(),
            definitions_by_fullname: DashMap::new(),
            core: CoreTypes::default(),
        };

        host.types.push(TypeEntry {
            key: InternedKey::DUMMY,
            node: TypeNode::Dummy,
        });
        host.core = host.bootstrap_core();
        host
    }

    fn bootstrap_core(&self) -> CoreTypes {
        let define = |name: &str, flags: TypeFlags, base: Option<TypeId>| {
            let decl = DefinitionDecl {
                unit: self.config.core_assembly.clone(),
                namespace: "System".to_string(),
                name: name.to_string(),
                container: None,
                flags,
                layout: LayoutKind::Auto,
                class_size: None,
                packing_size: None,
                generic_params: Vec::new(),
                base,
                interfaces: Vec::new(),
            };
            let key = self.definition_key(&decl);
            self.insert_definition(decl, key).0
        };

        let object = define("Object", TypeFlags::empty(), None);
        let value_type = define("ValueType", TypeFlags::ABSTRACT, Some(object));
        let primitive = |name: &str| {
            define(
                name,
                TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
                Some(value_type),
            )
        };

        let delegate = define("Delegate", TypeFlags::ABSTRACT, Some(object));
        CoreTypes {
            object,
            value_type,
            enum_type: define("Enum", TypeFlags::ABSTRACT, Some(value_type)),
            array: define("Array", TypeFlags::ABSTRACT, Some(object)),
            string: define("String", TypeFlags::SEALED, Some(object)),
            delegate,
            multicast_delegate: define("MulticastDelegate", TypeFlags::ABSTRACT, Some(delegate)),
            void: primitive("Void"),
            boolean: primitive("Boolean"),
            char: primitive("Char"),
            int8: primitive("SByte"),
            uint8: primitive("Byte"),
            int16: primitive("Int16"),
            uint16: primitive("UInt16"),
            int32: primitive("Int32"),
            uint32: primitive("UInt32"),
            int64: primitive("Int64"),
            uint64: primitive("UInt64"),
            float32: primitive("Single"),
            float64: primitive("Double"),
            intptr: primitive("IntPtr"),
            uintptr: primitive("UIntPtr"),
            typed_reference: primitive("TypedReference"),
        }
    }

    /// Platform and budget settings.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The diagnostics collector shared by every algorithm working on this graph.
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// The injected interning authority.
    pub fn interner(&self) -> &Arc<dyn InternAuthority> {
        &self.interner
    }

    /// The bootstrapped core library types.
    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    /// Number of type nodes, including the dummy sentinel.
    pub fn type_count(&self) -> usize {
        self.types.count()
    }

    fn entry(&self, ty: TypeId) -> &TypeEntry {
        arena_get!(self.types, ty.index(), "type")
    }

    /// Returns the node of `ty`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` was not issued by this host.
    pub fn node(&self, ty: TypeId) -> &TypeNode {
        &self.entry(ty).node
    }

    /// Returns the interned key of `ty`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` was not issued by this host.
    pub fn interned_key(&self, ty: TypeId) -> InternedKey {
        self.entry(ty).key
    }

    /// Returns the field `id`.
    pub fn field(&self, id: FieldId) -> &FieldNode {
        arena_get!(self.fields, id.index(), "field")
    }

    /// Returns the method `id`.
    pub fn method(&self, id: MethodId) -> &MethodNode {
        arena_get!(self.methods, id.index(), "method")
    }

    /// Returns the property `id`.
    pub fn property(&self, id: PropertyId) -> &PropertyNode {
        arena_get!(self.properties, id.index(), "property")
    }

    /// Returns the event `id`.
    pub fn event(&self, id: EventId) -> &EventNode {
        arena_get!(self.events, id.index(), "event")
    }

    /// Returns the definition payload of `ty` if it is a definition node.
    pub fn definition(&self, ty: TypeId) -> Option<&TypeDefinition> {
        match self.node(ty) {
            TypeNode::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    /// Returns the payload of `ty` if it is a generic parameter node.
    pub fn generic_parameter(&self, ty: TypeId) -> Option<&GenericParameter> {
        match self.node(ty) {
            TypeNode::GenericParameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn push_type(&self, key: InternedKey, node: TypeNode) -> TypeId {
        TypeId(self.types.push(TypeEntry { key, node }) as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn push_field(&self, field: FieldNode) -> FieldId {
        FieldId(self.fields.push(field) as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn push_method(&self, method: MethodNode) -> MethodId {
        MethodId(self.methods.push(method) as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn push_property(&self, property: PropertyNode) -> PropertyId {
        PropertyId(self.properties.push(property) as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn push_event(&self, event: EventNode) -> EventId {
        EventId(self.events.push(event) as u32)
    }

    /// Returns the canonical node for `shape`, building it with `build` on first sight.
    pub(crate) fn intern_node(&self, shape: &TypeShape, build: impl FnOnce() -> TypeNode) -> TypeId {
        let key = self.interner.interned_key_of(shape);
        if let Some(existing) = self.canonical.get(&key) {
            return *existing;
        }

        let candidate = self.push_type(key, build());
        *self.canonical.entry(key).or_insert(candidate)
    }

    fn definition_key(&self, decl: &DefinitionDecl) -> InternedKey {
        let arity = self.arity_of(decl.generic_params.len());
        match decl.container {
            Some(container) => {
                self.interner
                    .nested_interned_key_of(self.interned_key(container), &decl.name, arity)
            }
            None => self.interner.interned_key_of(&TypeShape::Namespace {
                unit: decl.unit.clone(),
                namespace: decl.namespace.clone(),
                name: decl.name.clone(),
                arity,
            }),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn arity_of(&self, count: usize) -> u16 {
        count.min(usize::from(u16::MAX)) as u16
    }

    fn primitive_code(&self, unit: &str, namespace: &str, name: &str, nested: bool) -> PrimitiveTypeCode {
        if nested || namespace != "System" || unit != self.config.core_assembly {
            return PrimitiveTypeCode::NotPrimitive;
        }
        PrimitiveTypeCode::from_system_name(name).unwrap_or(PrimitiveTypeCode::NotPrimitive)
    }

    /// Declares a type definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotADefinition`] if the container is not a definition and
    /// [`Error::DuplicateType`] if a type with the same identity exists already.
    pub(crate) fn declare_definition(&self, decl: DefinitionDecl) -> Result<TypeId> {
        if let Some(container) = decl.container {
            if self.definition(container).is_none() {
                return Err(Error::NotADefinition(self.full_name(container)));
            }
        }

        let key = self.definition_key(&decl);
        if self.definitions.contains_key(&key) {
            return Err(Error::DuplicateType(self.decl_name(&decl)));
        }

        let name = self.decl_name(&decl);
        let (candidate, winner) = self.insert_definition(decl, key);
        if candidate != winner {
            return Err(Error::DuplicateType(name));
        }

        Ok(winner)
    }

    fn decl_name(&self, decl: &DefinitionDecl) -> String {
        match decl.container {
            Some(container) => format!("{}/{}", self.full_name(container), decl.name),
            None if decl.namespace.is_empty() => decl.name.clone(),
            None => format!("{}.{}", decl.namespace, decl.name),
        }
    }

    /// Pushes, parameterizes and publishes a definition; returns `(pushed, published)`.
    fn insert_definition(&self, decl: DefinitionDecl, key: InternedKey) -> (TypeId, TypeId) {
        let full_name = self.decl_name(&decl);
        let code = self.primitive_code(
            &decl.unit,
            &decl.namespace,
            &decl.name,
            decl.container.is_some(),
        );

        let definition = TypeDefinition {
            unit: decl.unit,
            namespace: decl.namespace,
            name: decl.name,
            container: decl.container,
            flags: decl.flags,
            layout: decl.layout,
            class_size: decl.class_size,
            packing_size: decl.packing_size,
            arity: self.arity_of(decl.generic_params.len()),
            code,
            generic_params: std::sync::OnceLock::new(),
            base: std::sync::OnceLock::new(),
            interfaces: boxcar::Vec::new(),
            fields: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            method_ordinals: AtomicU32::new(0),
            properties: boxcar::Vec::new(),
            events: boxcar::Vec::new(),
            nested_types: boxcar::Vec::new(),
        };
        let id = self.push_type(key, TypeNode::Definition(definition));

        let params: Vec<TypeId> = decl
            .generic_params
            .into_iter()
            .enumerate()
            .map(|(index, (name, flags))| {
                self.declare_generic_parameter(
                    GenericParameterOwner::Type(id),
                    key,
                    index,
                    name,
                    flags,
                    ParameterConstraints::Declared(boxcar::Vec::new()),
                )
            })
            .collect();

        if let TypeNode::Definition(definition) = self.node(id) {
            let _ = definition.generic_params.set(params);
            if let Some(base) = decl.base {
                let _ = definition.base.set(base);
            }
            for interface in decl.interfaces {
                definition.interfaces.push(interface);
            }
        }

        let winner = *self.definitions.get_or_insert(key, id).value();
        if winner == id {
            self.definitions_by_fullname
                .entry(full_name)
                .or_default()
                .push(id);
            if let Some(container) = decl.container.and_then(|c| self.definition(c)) {
                container.nested_types.push(id);
            }
        }

        (id, winner)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn declare_generic_parameter(
        &self,
        owner: GenericParameterOwner,
        owner_key: InternedKey,
        index: usize,
        name: String,
        flags: GenericParamFlags,
        constraints: ParameterConstraints,
    ) -> TypeId {
        let index = index as u16;
        let shape = match owner {
            GenericParameterOwner::Type(_) => TypeShape::TypeParameter {
                owner: owner_key,
                index,
            },
            GenericParameterOwner::Method(_) => TypeShape::MethodParameter {
                owner: owner_key,
                index,
            },
        };
        let key = self.interner.interned_key_of(&shape);

        self.push_type(
            key,
            TypeNode::GenericParameter(GenericParameter {
                owner,
                owner_key,
                index,
                name,
                flags,
                constraints,
            }),
        )
    }

    /// Creates one fresh parameter of `owner` per template parameter, keeping names and flags.
    ///
    /// Constraints of the fresh parameters are specialized on first access.
    pub(crate) fn fresh_generic_parameters(
        &self,
        owner: GenericParameterOwner,
        owner_key: InternedKey,
        templates: &[TypeId],
    ) -> Vec<TypeId> {
        templates
            .iter()
            .enumerate()
            .map(|(index, &template)| {
                let (name, flags) = match self.generic_parameter(template) {
                    Some(parameter) => (parameter.name.clone(), parameter.flags),
                    None => (format!("!{index}"), GenericParamFlags::empty()),
                };
                self.declare_generic_parameter(
                    owner,
                    owner_key,
                    index,
                    name,
                    flags,
                    ParameterConstraints::Specialized {
                        template,
                        resolved: InitOnce::new(),
                    },
                )
            })
            .collect()
    }

    /// Looks up a definition by unit, namespace, name and arity.
    ///
    /// Returns [`TypeId::DUMMY`] if no such definition has been declared.
    pub fn find_definition(&self, unit: &str, namespace: &str, name: &str, arity: u16) -> TypeId {
        let key = self.interner.interned_key_of(&TypeShape::Namespace {
            unit: unit.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
        });
        self.definition_by_key(key)
    }

    pub(crate) fn definition_by_key(&self, key: InternedKey) -> TypeId {
        self.definitions
            .get(&key)
            .map_or(TypeId::DUMMY, |entry| *entry.value())
    }

    /// Looks up definitions by full name (`Namespace.Name`, `Outer/Inner` for nested types).
    ///
    /// Types with the same full name may be defined by several units.
    pub fn find_by_full_name(&self, full_name: &str) -> Vec<TypeId> {
        self.definitions_by_fullname
            .get(full_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Looks up a non-generic type of the core library's `System` namespace.
    pub fn system_type(&self, name: &str) -> TypeId {
        self.find_definition(&self.config.core_assembly, "System", name, 0)
    }

    /// Primitive classification of `ty`.
    ///
    /// Modified types report the code of their unmodified type.
    pub fn type_code(&self, ty: TypeId) -> PrimitiveTypeCode {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.code,
            TypeNode::Reference(reference) => reference.code,
            TypeNode::Pointer(_) => PrimitiveTypeCode::Pointer,
            TypeNode::ManagedPointer(_) => PrimitiveTypeCode::Reference,
            TypeNode::Modified(modified) => self.type_code(modified.unmodified),
            _ => PrimitiveTypeCode::NotPrimitive,
        }
    }

    /// A diagnostic rendering of `ty`, e.g. `Demo.Box<System.Int32>/Inner`.
    ///
    /// This is not a signature formatter; it exists to make diagnostics and errors readable.
    pub fn full_name(&self, ty: TypeId) -> String {
        let mut out = String::new();
        self.write_name(ty, &mut out);
        out
    }

    fn write_list(&self, types: &[TypeId], out: &mut String) {
        for (index, ty) in types.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            self.write_name(*ty, out);
        }
    }

    fn write_name(&self, ty: TypeId, out: &mut String) {
        match self.node(ty) {
            TypeNode::Dummy => out.push_str("<dummy>"),
            TypeNode::Definition(definition) => match definition.container {
                Some(container) => {
                    self.write_name(container, out);
                    let _ = write!(out, "/{}", definition.name);
                }
                None if definition.namespace.is_empty() => out.push_str(&definition.name),
                None => {
                    let _ = write!(out, "{}.{}", definition.namespace, definition.name);
                }
            },
            TypeNode::Reference(reference) => match reference.container {
                Some(container) => {
                    self.write_name(container, out);
                    let _ = write!(out, "/{}", reference.name);
                }
                None if reference.namespace.is_empty() => out.push_str(&reference.name),
                None => {
                    let _ = write!(out, "{}.{}", reference.namespace, reference.name);
                }
            },
            TypeNode::GenericParameter(parameter) => out.push_str(&parameter.name),
            TypeNode::Instance(instance) => {
                self.write_name(instance.template, out);
                out.push('<');
                self.write_list(&instance.arguments, out);
                out.push('>');
            }
            TypeNode::SpecializedNested(nested) => {
                self.write_name(nested.containing, out);
                if let Some(definition) = self.definition(nested.unspecialized) {
                    let _ = write!(out, "/{}", definition.name);
                }
            }
            TypeNode::Vector(vector) => {
                self.write_name(vector.element, out);
                out.push_str("[]");
            }
            TypeNode::Matrix(matrix) => {
                self.write_name(matrix.element, out);
                out.push('[');
                for _ in 1..matrix.rank {
                    out.push(',');
                }
                out.push(']');
            }
            TypeNode::Pointer(pointer) => {
                self.write_name(pointer.target, out);
                out.push('*');
            }
            TypeNode::ManagedPointer(pointer) => {
                self.write_name(pointer.target, out);
                out.push('&');
            }
            TypeNode::Modified(modified) => {
                self.write_name(modified.unmodified, out);
                for modifier in &modified.modifiers {
                    out.push_str(if modifier.optional {
                        " modopt("
                    } else {
                        " modreq("
                    });
                    self.write_name(modifier.modifier, out);
                    out.push(')');
                }
            }
            TypeNode::FunctionPointer(pointer) => {
                out.push_str("method ");
                self.write_name(pointer.signature.returns, out);
                out.push_str(" *(");
                self.write_list(&pointer.signature.parameters, out);
                out.push(')');
            }
        }
    }

    /// Generic parameters of `ty` in positional order.
    ///
    /// Specialized nested types own fresh parameters, created on first access. Instances have no
    /// parameters of their own.
    pub fn generic_parameters(&self, ty: TypeId) -> Vec<TypeId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.generic_parameters().to_vec(),
            TypeNode::SpecializedNested(nested) => self.nested_generic_parameters(ty, nested).to_vec(),
            TypeNode::Reference(_) => {
                let resolved = self.resolve(ty);
                if resolved.is_dummy() {
                    Vec::new()
                } else {
                    self.generic_parameters(resolved)
                }
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn nested_generic_parameters<'a>(
        &'a self,
        id: TypeId,
        nested: &'a SpecializedNestedType,
    ) -> &'a [TypeId] {
        let params = nested.generic_params.get_or_init(|| {
            let templates = self.generic_parameters(nested.partially_specialized);
            self.fresh_generic_parameters(
                GenericParameterOwner::Type(id),
                self.interned_key(id),
                &templates,
            )
        });

        match params {
            Some(params) => params,
            None => {
                self.diagnostics.warning(
                    DiagnosticCategory::Generic,
                    format!(
                        "Re-entrant creation of generic parameters for {}",
                        self.full_name(id)
                    ),
                );
                &[]
            }
        }
    }

    /// Number of generic parameters `ty` declares itself.
    pub fn generic_parameter_count(&self, ty: TypeId) -> usize {
        match self.node(ty) {
            TypeNode::Definition(definition) => usize::from(definition.arity),
            TypeNode::Reference(reference) => usize::from(reference.arity),
            TypeNode::SpecializedNested(nested) => self.generic_parameter_count(nested.unspecialized),
            _ => 0,
        }
    }

    /// Maps `ty` to the node it stands for.
    ///
    /// By-name references resolve to the definition they name (cached once found), modified
    /// types to the resolution of their unmodified type; every other node resolves to itself.
    /// Returns [`TypeId::DUMMY`] if a reference cannot be resolved.
    pub fn resolve(&self, ty: TypeId) -> TypeId {
        match self.node(ty) {
            TypeNode::Reference(reference) => {
                if let Some(resolved) = reference.resolved.get() {
                    return *resolved;
                }

                let resolved = match reference.container {
                    Some(container) => {
                        let container = self.resolve(container);
                        if container.is_dummy() {
                            TypeId::DUMMY
                        } else {
                            self.find_nested_type(container, &reference.name, reference.arity)
                        }
                    }
                    None => self.definition_by_key(self.interned_key(ty)),
                };

                if !resolved.is_dummy() {
                    let _ = reference.resolved.set(resolved);
                }
                resolved
            }
            TypeNode::Modified(modified) => self.resolve(modified.unmodified),
            _ => ty,
        }
    }

    /// The definition a node was ultimately derived from.
    ///
    /// Instances map to (the definition of) their template, specialized nested types to their
    /// unspecialized definition, references to their resolution. Structural nodes map to
    /// themselves.
    pub fn unspecialized_type(&self, ty: TypeId) -> TypeId {
        match self.node(ty) {
            TypeNode::Instance(instance) => self.unspecialized_type(instance.template),
            TypeNode::SpecializedNested(nested) => nested.unspecialized,
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                let resolved = self.resolve(ty);
                if resolved.is_dummy() {
                    ty
                } else {
                    self.unspecialized_type(resolved)
                }
            }
            _ => ty,
        }
    }

    /// The definition payload behind `ty`, following references, modifiers, instances and
    /// specialized nested types.
    pub fn definition_of(&self, ty: TypeId) -> Option<&TypeDefinition> {
        self.definition(self.unspecialized_type(ty))
    }

    fn keys(&self, types: &[TypeId]) -> Vec<InternedKey> {
        types.iter().map(|ty| self.interned_key(*ty)).collect()
    }

    /// `element[]`
    pub fn vector(&self, element: TypeId) -> TypeId {
        let shape = TypeShape::Vector {
            element: self.interned_key(element),
        };
        self.intern_node(&shape, || TypeNode::Vector(VectorType { element }))
    }

    /// A general array of `rank` dimensions.
    ///
    /// `lower_bounds` and `sizes` describe the leading dimensions and may be shorter than
    /// `rank`. A rank of `0` is treated as `1`.
    pub fn matrix(
        &self,
        element: TypeId,
        rank: u32,
        lower_bounds: Vec<i32>,
        sizes: Vec<u32>,
    ) -> TypeId {
        let rank = rank.max(1);
        let shape = TypeShape::Matrix {
            element: self.interned_key(element),
            rank,
            lower_bounds: lower_bounds.clone(),
            sizes: sizes.clone(),
        };
        self.intern_node(&shape, || {
            TypeNode::Matrix(MatrixType {
                element,
                rank,
                lower_bounds,
                sizes,
            })
        })
    }

    /// `target*`
    pub fn pointer(&self, target: TypeId) -> TypeId {
        let shape = TypeShape::Pointer {
            target: self.interned_key(target),
        };
        self.intern_node(&shape, || TypeNode::Pointer(PointerType { target }))
    }

    /// `target&`
    pub fn managed_pointer(&self, target: TypeId) -> TypeId {
        let shape = TypeShape::ManagedPointer {
            target: self.interned_key(target),
        };
        self.intern_node(&shape, || {
            TypeNode::ManagedPointer(ManagedPointerType { target })
        })
    }

    /// `unmodified` decorated with `modifiers`.
    ///
    /// Returns `unmodified` itself when `modifiers` is empty.
    pub fn modified(&self, unmodified: TypeId, modifiers: Vec<CustomModifier>) -> TypeId {
        if modifiers.is_empty() {
            return unmodified;
        }

        let shape = TypeShape::Modified {
            unmodified: self.interned_key(unmodified),
            modifiers: modifiers
                .iter()
                .map(|m| (m.optional, self.interned_key(m.modifier)))
                .collect(),
        };
        self.intern_node(&shape, || {
            TypeNode::Modified(ModifiedType {
                unmodified,
                modifiers,
            })
        })
    }

    /// A function pointer with `signature`.
    pub fn function_pointer(&self, signature: MethodSignature) -> TypeId {
        let shape = TypeShape::FunctionPointer {
            calling_convention: signature.calling_convention,
            has_this: signature.has_this,
            returns: self.interned_key(signature.returns),
            return_by_ref: signature.return_by_ref,
            parameters: self.keys(&signature.parameters),
            extra_parameters: self.keys(&signature.extra_parameters),
        };
        self.intern_node(&shape, || {
            TypeNode::FunctionPointer(FunctionPointerType { signature })
        })
    }

    /// Instantiates the generic `template` with positional `arguments`.
    ///
    /// # Arguments
    ///
    /// * `template` - A generic definition, a reference to one, or a generic specialized nested
    ///   type
    /// * `arguments` - One type argument per generic parameter of `template`
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotGeneric`] if `template` has no generic parameters and
    /// [`Error::GenericArity`] if the number of arguments does not match.
    pub fn instantiate(&self, template: TypeId, arguments: &[TypeId]) -> Result<TypeId> {
        let expected = self.generic_parameter_count(template);
        if expected == 0 {
            return Err(Error::TypeNotGeneric(self.full_name(template)));
        }
        if arguments.len() != expected {
            return Err(Error::GenericArity {
                expected,
                found: arguments.len(),
            });
        }

        Ok(self.instantiate_unchecked(template, arguments.to_vec()))
    }

    pub(crate) fn instantiate_unchecked(&self, template: TypeId, arguments: Vec<TypeId>) -> TypeId {
        let shape = TypeShape::Instance {
            template: self.interned_key(template),
            arguments: self.keys(&arguments),
        };
        self.intern_node(&shape, || {
            TypeNode::Instance(GenericTypeInstance {
                template,
                arguments,
                cache: SpecializationCache::default(),
            })
        })
    }

    /// A by-name reference to a top-level type.
    ///
    /// The reference shares its interned key with the definition it names and resolves lazily,
    /// so it may be created before that definition is declared.
    pub fn type_reference(&self, unit: &str, namespace: &str, name: &str, arity: u16) -> TypeId {
        let key = self.interner.interned_key_of(&TypeShape::Namespace {
            unit: unit.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
        });

        self.reference_node(key, || TypeReference {
            unit: unit.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            arity,
            container: None,
            code: self.primitive_code(unit, namespace, name, false),
            resolved: std::sync::OnceLock::new(),
        })
    }

    /// A by-name reference to the nested type `name` of `container`.
    ///
    /// `container` may be any type, including a generic instance; the reference then resolves to
    /// the corresponding specialized nested type.
    pub fn nested_type_reference(&self, container: TypeId, name: &str, arity: u16) -> TypeId {
        let key = self
            .interner
            .nested_interned_key_of(self.interned_key(container), name, arity);
        let unit = match self.node(container) {
            TypeNode::Reference(reference) => reference.unit.clone(),
            _ => self
                .definition_of(container)
                .map(|definition| definition.unit.clone())
                .unwrap_or_default(),
        };

        self.reference_node(key, || TypeReference {
            unit,
            namespace: String::new(),
            name: name.to_string(),
            arity,
            container: Some(container),
            code: PrimitiveTypeCode::NotPrimitive,
            resolved: std::sync::OnceLock::new(),
        })
    }

    fn reference_node(&self, key: InternedKey, build: impl FnOnce() -> TypeReference) -> TypeId {
        if let Some(existing) = self.references.get(&key) {
            return *existing;
        }

        let candidate = self.push_type(key, TypeNode::Reference(build()));
        *self.references.entry(key).or_insert(candidate)
    }

    /// The instance of a generic definition over its own parameters, e.g. `Box<T>` for `Box`.
    ///
    /// This is how a generic type refers to itself (and to its nested types) from within its
    /// own member signatures. Nested types of generic containers become specialized nested types
    /// of the container's self instance. Non-generic types are their own self instance.
    pub fn self_instance(&self, definition: TypeId) -> TypeId {
        let base = match self.definition(definition).and_then(|d| d.container) {
            Some(container) => {
                let container_self = self.self_instance(container);
                if container_self == container {
                    definition
                } else {
                    self.specialized_nested(container_self, definition)
                }
            }
            None => definition,
        };

        let params = self.generic_parameters(definition);
        if params.is_empty() {
            base
        } else {
            self.instantiate_unchecked(base, params)
        }
    }

    /// The nested type `nested` as a member of the generic `containing` type.
    ///
    /// `containing` must be a generic instance or a specialized nested type; for anything else
    /// `nested` is returned unchanged. The partially specialized version is derived from the
    /// container's template: if that template is a specialized nested type itself, the nested
    /// type is first specialized under it.
    pub fn specialized_nested(&self, containing: TypeId, nested: TypeId) -> TypeId {
        let unspecialized = self.unspecialized_type(nested);
        let Some(definition) = self.definition(unspecialized) else {
            return nested;
        };

        let (template, instance) = match self.node(containing) {
            TypeNode::Instance(generic) => (self.resolve(generic.template), containing),
            TypeNode::SpecializedNested(outer) => (outer.partially_specialized, outer.instance),
            _ => return nested,
        };

        if definition.container != Some(self.unspecialized_type(template)) {
            self.diagnostics.warning(
                DiagnosticCategory::Type,
                format!(
                    "{} is not a nested type of {}",
                    self.full_name(unspecialized),
                    self.full_name(containing)
                ),
            );
            return nested;
        }

        let partially_specialized = match self.node(template) {
            TypeNode::SpecializedNested(_) => self.specialized_nested(template, unspecialized),
            _ => unspecialized,
        };

        let key = self.interner.nested_interned_key_of(
            self.interned_key(containing),
            &definition.name,
            definition.arity,
        );
        if let Some(existing) = self.canonical.get(&key) {
            return *existing;
        }

        let candidate = self.push_type(
            key,
            TypeNode::SpecializedNested(SpecializedNestedType {
                unspecialized,
                partially_specialized,
                containing,
                instance,
                generic_params: InitOnce::new(),
                cache: SpecializationCache::default(),
            }),
        );
        *self.canonical.entry(key).or_insert(candidate)
    }

    /// Instantiates the generic method `method` with positional `arguments`.
    ///
    /// The signature of the instance is substituted on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotGeneric`] if `method` has no generic parameters and
    /// [`Error::GenericArity`] if the number of arguments does not match.
    pub fn instantiate_method(&self, method: MethodId, arguments: &[TypeId]) -> Result<MethodId> {
        let generic = self.method(method);
        let expected = usize::from(generic.arity);
        if expected == 0 {
            return Err(Error::TypeNotGeneric(format!(
                "{}::{}",
                self.full_name(generic.container),
                generic.name
            )));
        }
        if arguments.len() != expected {
            return Err(Error::GenericArity {
                expected,
                found: arguments.len(),
            });
        }

        let key = self.interner.interned_key_of(&TypeShape::MethodInstance {
            method: generic.key,
            arguments: self.keys(arguments),
        });
        if let Some(existing) = self.method_instances.get(&key) {
            return Ok(*existing);
        }

        let candidate = self.push_method(MethodNode {
            container: generic.container,
            name: generic.name.clone(),
            flags: generic.flags,
            arity: 0,
            origin: MethodOrigin::Instance {
                generic: method,
                arguments: arguments.to_vec(),
            },
            key,
            generic_params: InitOnce::new(),
            signature: InitOnce::new(),
        });
        Ok(*self.method_instances.entry(key).or_insert(candidate))
    }

    /// Double-dispatches `ty` to the matching function of `visitor`.
    pub fn dispatch<V: TypeVisitor + ?Sized>(&self, ty: TypeId, visitor: &mut V) {
        match self.node(ty) {
            TypeNode::Dummy => visitor.visit_dummy(ty),
            TypeNode::Definition(node) => visitor.visit_definition(ty, node),
            TypeNode::Reference(node) => visitor.visit_reference(ty, node),
            TypeNode::GenericParameter(node) => visitor.visit_generic_parameter(ty, node),
            TypeNode::Instance(node) => visitor.visit_instance(ty, node),
            TypeNode::SpecializedNested(node) => visitor.visit_specialized_nested(ty, node),
            TypeNode::Vector(node) => visitor.visit_vector(ty, node),
            TypeNode::Matrix(node) => visitor.visit_matrix(ty, node),
            TypeNode::Pointer(node) => visitor.visit_pointer(ty, node),
            TypeNode::ManagedPointer(node) => visitor.visit_managed_pointer(ty, node),
            TypeNode::Modified(node) => visitor.visit_modified(ty, node),
            TypeNode::FunctionPointer(node) => visitor.visit_function_pointer(ty, node),
        }
    }
}
