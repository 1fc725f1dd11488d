//! Builders for type definitions and their members.
//!
//! This module provides the [`TypeBuilder`], a fluent API for declaring classes, value types,
//! interfaces, enumerations and delegates on a [`TypeHost`], together with the declaration
//! records for fields, methods, properties and events that [`TypeHost::add_field`],
//! [`TypeHost::add_method`], [`TypeHost::add_property`] and [`TypeHost::add_event`] accept.
//!
//! The builders stand in for a metadata loader: whatever produces the unspecialized definition
//! graph only has to provide stable identities, which the host derives from unit, namespace,
//! name and arity.
//!
//! # Example
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//! let int32 = host.core().int32;
//!
//! let point = TypeBuilder::value_type(&host, "Demo", "Point").declare()?;
//! host.add_field(point, FieldDecl::new("x", int32))?;
//! host.add_field(point, FieldDecl::new("y", int32))?;
//!
//! assert!(host.is_value_type(point));
//! assert_eq!(host.layout_of(point, true).size, 8);
//! # Ok::<(), cilmodel::Error>(())
//! ```

use std::sync::atomic::Ordering;

use crate::{
    metadata::typesystem::{
        host::DefinitionDecl, node::ParameterConstraints, EventId, EventNode, FieldFlags, FieldId,
        FieldNode, GenericParamFlags, GenericParameterOwner, InitOnce, LayoutKind, MemberOrigin,
        MethodFlags, MethodId, MethodNode, MethodOrigin, MethodSignature, PropertyId,
        PropertyNode, TypeDefinition, TypeFlags, TypeHost, TypeId, TypeNode, TypeShape,
    },
    Error, Result,
};

/// Name of the instance field holding the value of an enumeration.
pub const ENUM_VALUE_FIELD: &str = "value__";

/// Provides a fluent API for declaring type definitions
pub struct TypeBuilder<'a> {
    /// Host receiving the definition
    host: &'a TypeHost,
    /// Definition being assembled
    decl: DefinitionDecl,
    /// Underlying type, for enumerations
    underlying: Option<TypeId>,
}

impl<'a> TypeBuilder<'a> {
    fn start(
        host: &'a TypeHost,
        namespace: &str,
        name: &str,
        flags: TypeFlags,
        layout: LayoutKind,
        base: Option<TypeId>,
    ) -> Self {
        TypeBuilder {
            host,
            decl: DefinitionDecl {
                unit: "main".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                container: None,
                flags,
                layout,
                class_size: None,
                packing_size: None,
                generic_params: Vec::new(),
                base,
                interfaces: Vec::new(),
            },
            underlying: None,
        }
    }

    /// Start building a class deriving from `System.Object`
    ///
    /// ## Arguments
    /// * 'host'      - The host receiving the definition
    /// * 'namespace' - Namespace of the class
    /// * 'name'      - Name of the class
    pub fn class(host: &'a TypeHost, namespace: &str, name: &str) -> Self {
        let object = host.core().object;
        Self::start(host, namespace, name, TypeFlags::empty(), LayoutKind::Auto, Some(object))
    }

    /// Start building a sealed value type with sequential layout
    ///
    /// ## Arguments
    /// * 'host'      - The host receiving the definition
    /// * 'namespace' - Namespace of the value type
    /// * 'name'      - Name of the value type
    pub fn value_type(host: &'a TypeHost, namespace: &str, name: &str) -> Self {
        let value_type = host.core().value_type;
        Self::start(
            host,
            namespace,
            name,
            TypeFlags::VALUE_TYPE | TypeFlags::SEALED,
            LayoutKind::Sequential,
            Some(value_type),
        )
    }

    /// Start building an interface
    ///
    /// ## Arguments
    /// * 'host'      - The host receiving the definition
    /// * 'namespace' - Namespace of the interface
    /// * 'name'      - Name of the interface
    pub fn interface(host: &'a TypeHost, namespace: &str, name: &str) -> Self {
        Self::start(
            host,
            namespace,
            name,
            TypeFlags::INTERFACE | TypeFlags::ABSTRACT,
            LayoutKind::Auto,
            None,
        )
    }

    /// Start building an enumeration over `underlying`
    ///
    /// The instance field `value__` of type `underlying` is added on [`TypeBuilder::declare`].
    ///
    /// ## Arguments
    /// * 'host'       - The host receiving the definition
    /// * 'namespace'  - Namespace of the enumeration
    /// * 'name'       - Name of the enumeration
    /// * 'underlying' - The integral type holding the value
    pub fn enumeration(
        host: &'a TypeHost,
        namespace: &str,
        name: &str,
        underlying: TypeId,
    ) -> Self {
        let enum_type = host.core().enum_type;
        let mut builder = Self::start(
            host,
            namespace,
            name,
            TypeFlags::VALUE_TYPE | TypeFlags::SEALED | TypeFlags::ENUM,
            LayoutKind::Auto,
            Some(enum_type),
        );
        builder.underlying = Some(underlying);
        builder
    }

    /// Start building a delegate deriving from `System.MulticastDelegate`
    ///
    /// The `Invoke` method has to be added with [`TypeHost::add_method`].
    ///
    /// ## Arguments
    /// * 'host'      - The host receiving the definition
    /// * 'namespace' - Namespace of the delegate
    /// * 'name'      - Name of the delegate
    pub fn delegate(host: &'a TypeHost, namespace: &str, name: &str) -> Self {
        let multicast = host.core().multicast_delegate;
        Self::start(
            host,
            namespace,
            name,
            TypeFlags::SEALED | TypeFlags::DELEGATE,
            LayoutKind::Auto,
            Some(multicast),
        )
    }

    /// Set the defining unit, `main` if not set
    #[must_use]
    pub fn unit(mut self, unit: &str) -> Self {
        self.decl.unit = unit.to_string();
        self
    }

    /// Declare the type as nested in `container`
    ///
    /// Nested types have no namespace of their own; the container must be a definition.
    #[must_use]
    pub fn nested_in(mut self, container: TypeId) -> Self {
        self.decl.container = Some(container);
        self.decl.namespace.clear();
        if let Some(definition) = self.host.definition(container) {
            self.decl.unit.clone_from(&definition.unit);
        }
        self
    }

    /// Add unconstrained generic parameters, in order
    #[must_use]
    pub fn generic_params(mut self, names: &[&str]) -> Self {
        self.decl.generic_params.extend(
            names
                .iter()
                .map(|name| ((*name).to_string(), GenericParamFlags::empty())),
        );
        self
    }

    /// Add one generic parameter with variance and special constraint flags
    #[must_use]
    pub fn generic_param(mut self, name: &str, flags: GenericParamFlags) -> Self {
        self.decl.generic_params.push((name.to_string(), flags));
        self
    }

    /// Add attribute flags
    #[must_use]
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.decl.flags |= flags;
        self
    }

    /// Set the field layout kind
    #[must_use]
    pub fn layout(mut self, layout: LayoutKind) -> Self {
        self.decl.layout = layout;
        self
    }

    /// Set the declared size in bytes
    #[must_use]
    pub fn class_size(mut self, size: u32) -> Self {
        self.decl.class_size = Some(size);
        self
    }

    /// Set the packing size; `0` means the platform default
    #[must_use]
    pub fn packing_size(mut self, packing: u16) -> Self {
        self.decl.packing_size = (packing != 0).then_some(packing);
        self
    }

    /// Set the base class
    #[must_use]
    pub fn base(mut self, base: TypeId) -> Self {
        self.decl.base = Some(base);
        self
    }

    /// Leave the base class unset
    ///
    /// Base classes referring to the type's own parameters are set afterwards with
    /// [`TypeHost::set_base`].
    #[must_use]
    pub fn deferred_base(mut self) -> Self {
        self.decl.base = None;
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn interface_impl(mut self, interface: TypeId) -> Self {
        self.decl.interfaces.push(interface);
        self
    }

    /// Declare the definition on the host
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if the container is not a definition and
    /// [`Error::DuplicateType`] if a type with the same identity exists already.
    pub fn declare(self) -> Result<TypeId> {
        let host = self.host;
        let id = host.declare_definition(self.decl)?;
        if let Some(underlying) = self.underlying {
            host.add_field(id, FieldDecl::new(ENUM_VALUE_FIELD, underlying))?;
        }
        Ok(id)
    }
}

/// Declaration of a field
#[derive(Debug, Clone)]
pub struct FieldDecl {
    name: String,
    ty: TypeId,
    flags: FieldFlags,
    bit_width: Option<u8>,
    sequence: Option<u32>,
    offset: Option<u32>,
}

impl FieldDecl {
    /// An instance field `name` of type `ty`
    pub fn new(name: &str, ty: TypeId) -> Self {
        FieldDecl {
            name: name.to_string(),
            ty,
            flags: FieldFlags::empty(),
            bit_width: None,
            sequence: None,
            offset: None,
        }
    }

    /// Add attribute flags
    #[must_use]
    pub fn flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Declare the field as a bit-field of `width` bits
    #[must_use]
    pub fn bit_width(mut self, width: u8) -> Self {
        self.bit_width = Some(width);
        self
    }

    /// Explicit sequence number for sequential layout
    #[must_use]
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Explicit byte offset for explicit layout
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Declaration of a method
///
/// The signature is supplied to [`TypeHost::add_method`] as a closure over the method's own
/// generic parameters.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    name: String,
    flags: MethodFlags,
    generic_params: Vec<(String, GenericParamFlags)>,
}

impl MethodDecl {
    /// A non-generic method `name`
    pub fn new(name: &str) -> Self {
        MethodDecl {
            name: name.to_string(),
            flags: MethodFlags::empty(),
            generic_params: Vec::new(),
        }
    }

    /// Add attribute flags
    #[must_use]
    pub fn flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Add unconstrained method generic parameters, in order
    #[must_use]
    pub fn generic_params(mut self, names: &[&str]) -> Self {
        self.generic_params.extend(
            names
                .iter()
                .map(|name| ((*name).to_string(), GenericParamFlags::empty())),
        );
        self
    }
}

/// Declaration of a property
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    name: String,
    ty: TypeId,
    parameters: Vec<TypeId>,
    getter: Option<MethodId>,
    setter: Option<MethodId>,
}

impl PropertyDecl {
    /// A property `name` of type `ty` without accessors
    pub fn new(name: &str, ty: TypeId) -> Self {
        PropertyDecl {
            name: name.to_string(),
            ty,
            parameters: Vec::new(),
            getter: None,
            setter: None,
        }
    }

    /// Index parameters, for indexers
    #[must_use]
    pub fn parameters(mut self, parameters: Vec<TypeId>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Getter method, declared on the same type
    #[must_use]
    pub fn getter(mut self, getter: MethodId) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Setter method, declared on the same type
    #[must_use]
    pub fn setter(mut self, setter: MethodId) -> Self {
        self.setter = Some(setter);
        self
    }
}

/// Declaration of an event
#[derive(Debug, Clone)]
pub struct EventDecl {
    name: String,
    ty: TypeId,
    adder: Option<MethodId>,
    remover: Option<MethodId>,
    raiser: Option<MethodId>,
}

impl EventDecl {
    /// An event `name` of delegate type `ty` without accessors
    pub fn new(name: &str, ty: TypeId) -> Self {
        EventDecl {
            name: name.to_string(),
            ty,
            adder: None,
            remover: None,
            raiser: None,
        }
    }

    /// `add_` accessor
    #[must_use]
    pub fn adder(mut self, adder: MethodId) -> Self {
        self.adder = Some(adder);
        self
    }

    /// `remove_` accessor
    #[must_use]
    pub fn remover(mut self, remover: MethodId) -> Self {
        self.remover = Some(remover);
        self
    }

    /// `raise_` accessor
    #[must_use]
    pub fn raiser(mut self, raiser: MethodId) -> Self {
        self.raiser = Some(raiser);
        self
    }
}

impl TypeHost {
    fn declared(&self, ty: TypeId) -> Result<&TypeDefinition> {
        self.definition(ty)
            .ok_or_else(|| Error::NotADefinition(self.full_name(ty)))
    }

    fn check_accessor(&self, ty: TypeId, accessor: Option<MethodId>) -> Result<()> {
        match accessor {
            Some(method) if self.method(method).container != ty => Err(malformed_error!(
                "Accessor {} is not declared on {}",
                self.method(method).name,
                self.full_name(ty)
            )),
            _ => Ok(()),
        }
    }

    /// Adds a field to the definition `ty`.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition.
    pub fn add_field(&self, ty: TypeId, decl: FieldDecl) -> Result<FieldId> {
        let definition = self.declared(ty)?;
        let id = self.push_field(FieldNode {
            container: ty,
            name: decl.name,
            ty: decl.ty,
            flags: decl.flags,
            bit_width: decl.bit_width,
            sequence: decl.sequence,
            offset: decl.offset,
            origin: MemberOrigin::Definition,
        });
        definition.fields.push(id);
        Ok(id)
    }

    /// Adds a method to the definition `ty`.
    ///
    /// `signature` receives the method's own generic parameters, in order.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_method(
        &self,
        ty: TypeId,
        decl: MethodDecl,
        signature: impl FnOnce(&[TypeId]) -> MethodSignature,
    ) -> Result<MethodId> {
        let definition = self.declared(ty)?;
        let arity = self.arity_of(decl.generic_params.len());
        let key = self.interner().interned_key_of(&TypeShape::Method {
            container: self.interned_key(ty),
            name: decl.name.clone(),
            arity,
            ordinal: definition.method_ordinals.fetch_add(1, Ordering::Relaxed),
        });

        let id = self.push_method(MethodNode {
            container: ty,
            name: decl.name,
            flags: decl.flags,
            arity,
            origin: MethodOrigin::Definition,
            key,
            generic_params: InitOnce::new(),
            signature: InitOnce::new(),
        });

        let params: Vec<TypeId> = decl
            .generic_params
            .into_iter()
            .enumerate()
            .map(|(index, (name, flags))| {
                self.declare_generic_parameter(
                    GenericParameterOwner::Method(id),
                    key,
                    index,
                    name,
                    flags,
                    ParameterConstraints::Declared(boxcar::Vec::new()),
                )
            })
            .collect();

        let method = self.method(id);
        let signature = signature(&params);
        method.generic_params.get_or_init(|| params);
        method.signature.get_or_init(|| signature);

        definition.methods.push(id);
        Ok(id)
    }

    /// Adds a property to the definition `ty`.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition and
    /// [`Error::Malformed`] if an accessor is declared on another type.
    pub fn add_property(&self, ty: TypeId, decl: PropertyDecl) -> Result<PropertyId> {
        let definition = self.declared(ty)?;
        self.check_accessor(ty, decl.getter)?;
        self.check_accessor(ty, decl.setter)?;

        let id = self.push_property(PropertyNode {
            container: ty,
            name: decl.name,
            ty: decl.ty,
            parameters: decl.parameters,
            getter: decl.getter,
            setter: decl.setter,
            origin: MemberOrigin::Definition,
        });
        definition.properties.push(id);
        Ok(id)
    }

    /// Adds an event to the definition `ty`.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition and
    /// [`Error::Malformed`] if an accessor is declared on another type.
    pub fn add_event(&self, ty: TypeId, decl: EventDecl) -> Result<EventId> {
        let definition = self.declared(ty)?;
        self.check_accessor(ty, decl.adder)?;
        self.check_accessor(ty, decl.remover)?;
        self.check_accessor(ty, decl.raiser)?;

        let id = self.push_event(EventNode {
            container: ty,
            name: decl.name,
            ty: decl.ty,
            adder: decl.adder,
            remover: decl.remover,
            raiser: decl.raiser,
            origin: MemberOrigin::Definition,
        });
        definition.events.push(id);
        Ok(id)
    }

    /// Adds an implemented interface to the definition `ty`.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition.
    pub fn add_interface(&self, ty: TypeId, interface: TypeId) -> Result<()> {
        self.declared(ty)?.interfaces.push(interface);
        Ok(())
    }

    /// Sets the base class of the definition `ty`.
    ///
    /// # Errors
    /// Returns [`Error::NotADefinition`] if `ty` is not a definition and
    /// [`Error::Malformed`] if its base class has been set already.
    pub fn set_base(&self, ty: TypeId, base: TypeId) -> Result<()> {
        self.declared(ty)?
            .base
            .set(base)
            .map_err(|_| malformed_error!("Base class of {} is set already", self.full_name(ty)))
    }

    /// Adds a type constraint to the declared generic parameter `parameter`.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if `parameter` is not a declared generic parameter.
    pub fn add_constraint(&self, parameter: TypeId, constraint: TypeId) -> Result<()> {
        match self.node(parameter) {
            TypeNode::GenericParameter(generic) => match &generic.constraints {
                ParameterConstraints::Declared(constraints) => {
                    constraints.push(constraint);
                    Ok(())
                }
                ParameterConstraints::Specialized { .. } => Err(malformed_error!(
                    "Constraints of specialized parameter {} are derived",
                    generic.name
                )),
            },
            _ => Err(malformed_error!(
                "{} is not a generic parameter",
                self.full_name(parameter)
            )),
        }
    }
}
