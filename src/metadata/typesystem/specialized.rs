//! Specialized members of generic instances and specialized nested types.
//!
//! The members of a generic instance (or of a nested type of one) are not declared anywhere;
//! they are derived from the members of the instance's template. Deriving them eagerly would
//! specialize every member of every instance ever mentioned in a signature, so instead each
//! instance carries a [`MemberTable`] that is populated on first enumeration or lookup.
//!
//! # Population
//!
//! Population walks the member lists of the *partially specialized* template: the definition
//! itself for an instance of a definition, or the specialized nested type one layer further in.
//! For each member one specialized wrapper is created, recording the definition it ultimately
//! stems from and the member it was specialized from:
//!
//! - **Fields**, **properties** and **events** get their types specialized right away
//! - **Methods** get fresh method generic parameters and a signature computed on first use
//! - **Property and event accessors** are mapped to the specialized methods of the same table
//! - **Nested types** become specialized nested types of the context
//!
//! Names are indexed twice, case-sensitive and case-insensitive.
//!
//! # Thread Safety
//!
//! Tables are published through [`InitOnce`](crate::metadata::typesystem::InitOnce): concurrent
//! readers wait for the populating thread, later reads are lock-free. A lookup on the very table
//! being populated (from within population, on the same thread) observes an empty table and
//! records a diagnostic.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::metadata::{
    diagnostics::DiagnosticCategory,
    typesystem::{
        node::ParameterConstraints, ArgumentSource, EventId, EventNode, FieldId, FieldNode,
        GenericParameterOwner, InitOnce, MemberId, MemberOrigin, MethodId, MethodNode,
        MethodOrigin, MethodSignature, PropertyId, PropertyNode, TypeHost, TypeId, TypeNode,
        TypeShape,
    },
};

/// Member lists and name indices of one generic instance or specialized nested type.
#[derive(Debug, Default)]
pub(crate) struct MemberTable {
    pub(crate) fields: Vec<FieldId>,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) events: Vec<EventId>,
    pub(crate) nested_types: Vec<TypeId>,
    by_name: HashMap<String, Vec<MemberId>>,
    by_name_ignore_case: HashMap<String, Vec<MemberId>>,
}

impl MemberTable {
    fn index(&mut self, name: &str, member: MemberId) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .push(member);
        self.by_name_ignore_case
            .entry(name.to_lowercase())
            .or_default()
            .push(member);
    }

    fn lookup(&self, name: &str, ignore_case: bool) -> &[MemberId] {
        let found = if ignore_case {
            self.by_name_ignore_case.get(&name.to_lowercase())
        } else {
            self.by_name.get(name)
        };
        found.map_or(&[], Vec::as_slice)
    }
}

impl TypeHost {
    /// Returns the member table of `ty`, populating it on first access.
    ///
    /// `None` for anything but generic instances and specialized nested types, and for the
    /// re-entrant access during population.
    pub(crate) fn member_table(&self, ty: TypeId) -> Option<&MemberTable> {
        let cache = match self.node(ty) {
            TypeNode::Instance(instance) => &instance.cache,
            TypeNode::SpecializedNested(nested) => &nested.cache,
            _ => return None,
        };

        let table = cache.members.get_or_init(|| self.populate_members(ty));
        if table.is_none() {
            self.diagnostics().warning(
                DiagnosticCategory::Member,
                format!(
                    "Re-entrant member population of {}, observed no members",
                    self.full_name(ty)
                ),
            );
        }
        table
    }

    /// The node whose members a specialization context specializes.
    fn member_template(&self, context: TypeId) -> TypeId {
        match self.node(context) {
            TypeNode::Instance(instance) => self.resolve(instance.template),
            TypeNode::SpecializedNested(nested) => nested.partially_specialized,
            _ => context,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn populate_members(&self, context: TypeId) -> MemberTable {
        let template = self.member_template(context);
        let context_key = self.interned_key(context);
        let mut table = MemberTable::default();

        for field in self.fields(template) {
            let node = self.field(field);
            let id = self.push_field(FieldNode {
                container: context,
                name: node.name.clone(),
                ty: self.specialize_in(node.ty, context),
                flags: node.flags,
                bit_width: node.bit_width,
                sequence: node.sequence,
                offset: node.offset,
                origin: MemberOrigin::Specialized {
                    unspecialized: node.origin.unspecialized_or(field),
                    partially_specialized: field,
                },
            });
            table.fields.push(id);
            table.index(&node.name, MemberId::Field(id));
        }

        let mut specialized_methods = HashMap::new();
        for (ordinal, method) in self.methods(template).into_iter().enumerate() {
            let node = self.method(method);
            let key = self.interner().interned_key_of(&TypeShape::Method {
                container: context_key,
                name: node.name.clone(),
                arity: node.arity,
                ordinal: ordinal as u32,
            });
            let id = self.push_method(MethodNode {
                container: context,
                name: node.name.clone(),
                flags: node.flags,
                arity: node.arity,
                origin: MethodOrigin::Specialized {
                    unspecialized: node.unspecialized_or(method),
                    partially_specialized: method,
                },
                key,
                generic_params: InitOnce::new(),
                signature: InitOnce::new(),
            });
            specialized_methods.insert(method, id);
            table.methods.push(id);
            table.index(&node.name, MemberId::Method(id));
        }

        let accessor = |method: Option<MethodId>, member: &str| -> Option<MethodId> {
            let method = method?;
            let mapped = specialized_methods.get(&method).copied();
            if mapped.is_none() {
                self.diagnostics().warning(
                    DiagnosticCategory::Member,
                    format!(
                        "Accessor {} of {} is not a method of {}",
                        self.method(method).name,
                        member,
                        self.full_name(template)
                    ),
                );
            }
            mapped
        };

        for property in self.properties(template) {
            let node = self.property(property);
            let id = self.push_property(PropertyNode {
                container: context,
                name: node.name.clone(),
                ty: self.specialize_in(node.ty, context),
                parameters: node
                    .parameters
                    .iter()
                    .map(|p| self.specialize_in(*p, context))
                    .collect(),
                getter: accessor(node.getter, &node.name),
                setter: accessor(node.setter, &node.name),
                origin: MemberOrigin::Specialized {
                    unspecialized: node.origin.unspecialized_or(property),
                    partially_specialized: property,
                },
            });
            table.properties.push(id);
            table.index(&node.name, MemberId::Property(id));
        }

        for event in self.events(template) {
            let node = self.event(event);
            let id = self.push_event(EventNode {
                container: context,
                name: node.name.clone(),
                ty: self.specialize_in(node.ty, context),
                adder: accessor(node.adder, &node.name),
                remover: accessor(node.remover, &node.name),
                raiser: accessor(node.raiser, &node.name),
                origin: MemberOrigin::Specialized {
                    unspecialized: node.origin.unspecialized_or(event),
                    partially_specialized: event,
                },
            });
            table.events.push(id);
            table.index(&node.name, MemberId::Event(id));
        }

        for nested in self.nested_types(template) {
            let id = self.specialized_nested(context, nested);
            table.nested_types.push(id);
            if let Some(definition) = self.definition_of(id) {
                table.index(&definition.name, MemberId::NestedType(id));
            }
        }

        table
    }

    /// The fields of `ty`: declared fields for definitions, specialized fields for instances
    /// and specialized nested types, nothing for other nodes.
    pub fn fields(&self, ty: TypeId) -> Vec<FieldId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.fields().collect(),
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                self.members_of_resolved(ty, Self::fields)
            }
            _ => self
                .member_table(ty)
                .map(|table| table.fields.clone())
                .unwrap_or_default(),
        }
    }

    /// The methods of `ty`, see [`TypeHost::fields`].
    pub fn methods(&self, ty: TypeId) -> Vec<MethodId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.methods().collect(),
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                self.members_of_resolved(ty, Self::methods)
            }
            _ => self
                .member_table(ty)
                .map(|table| table.methods.clone())
                .unwrap_or_default(),
        }
    }

    /// The properties of `ty`, see [`TypeHost::fields`].
    pub fn properties(&self, ty: TypeId) -> Vec<PropertyId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.properties().collect(),
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                self.members_of_resolved(ty, Self::properties)
            }
            _ => self
                .member_table(ty)
                .map(|table| table.properties.clone())
                .unwrap_or_default(),
        }
    }

    /// The events of `ty`, see [`TypeHost::fields`].
    pub fn events(&self, ty: TypeId) -> Vec<EventId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.events().collect(),
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                self.members_of_resolved(ty, Self::events)
            }
            _ => self
                .member_table(ty)
                .map(|table| table.events.clone())
                .unwrap_or_default(),
        }
    }

    /// The nested types of `ty`; specialized nested types for instances and specialized nested
    /// types, see [`TypeHost::fields`].
    pub fn nested_types(&self, ty: TypeId) -> Vec<TypeId> {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.nested_types().collect(),
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                self.members_of_resolved(ty, Self::nested_types)
            }
            _ => self
                .member_table(ty)
                .map(|table| table.nested_types.clone())
                .unwrap_or_default(),
        }
    }

    fn members_of_resolved<T>(
        &self,
        ty: TypeId,
        members: impl Fn(&Self, TypeId) -> Vec<T>,
    ) -> Vec<T> {
        let resolved = self.resolve(ty);
        if resolved.is_dummy() || resolved == ty {
            Vec::new()
        } else {
            members(self, resolved)
        }
    }

    fn member_name(&self, member: MemberId) -> Option<&str> {
        match member {
            MemberId::Field(id) => Some(&self.field(id).name),
            MemberId::Method(id) => Some(&self.method(id).name),
            MemberId::Property(id) => Some(&self.property(id).name),
            MemberId::Event(id) => Some(&self.event(id).name),
            MemberId::NestedType(id) => self.definition_of(id).map(|d| d.name.as_str()),
        }
    }

    /// Finds the members of `ty` named `name`, in declaration order by kind (fields, methods,
    /// properties, events, nested types).
    ///
    /// # Arguments
    ///
    /// * `ty` - The type to search; references are resolved first
    /// * `name` - Member name
    /// * `ignore_case` - Compare names case-insensitively
    pub fn find_members(&self, ty: TypeId, name: &str, ignore_case: bool) -> Vec<MemberId> {
        match self.node(ty) {
            TypeNode::Instance(_) | TypeNode::SpecializedNested(_) => self
                .member_table(ty)
                .map(|table| table.lookup(name, ignore_case).to_vec())
                .unwrap_or_default(),
            TypeNode::Definition(definition) => {
                let lowered = ignore_case.then(|| name.to_lowercase());
                let matches = |candidate: &str| match &lowered {
                    Some(lowered) => candidate.to_lowercase() == *lowered,
                    None => candidate == name,
                };

                definition
                    .fields()
                    .map(MemberId::Field)
                    .chain(definition.methods().map(MemberId::Method))
                    .chain(definition.properties().map(MemberId::Property))
                    .chain(definition.events().map(MemberId::Event))
                    .chain(definition.nested_types().map(MemberId::NestedType))
                    .filter(|member| self.member_name(*member).is_some_and(|n| matches(n)))
                    .collect()
            }
            TypeNode::Reference(_) | TypeNode::Modified(_) => {
                let resolved = self.resolve(ty);
                if resolved.is_dummy() || resolved == ty {
                    Vec::new()
                } else {
                    self.find_members(resolved, name, ignore_case)
                }
            }
            _ => Vec::new(),
        }
    }

    /// Finds the field `name` of `ty`.
    pub fn find_field(&self, ty: TypeId, name: &str) -> Option<FieldId> {
        self.find_members(ty, name, false)
            .into_iter()
            .find_map(|member| match member {
                MemberId::Field(id) => Some(id),
                _ => None,
            })
    }

    /// Finds the first method `name` of `ty`.
    pub fn find_method(&self, ty: TypeId, name: &str) -> Option<MethodId> {
        self.find_members(ty, name, false)
            .into_iter()
            .find_map(|member| match member {
                MemberId::Method(id) => Some(id),
                _ => None,
            })
    }

    /// Finds the nested type `name` with `arity` own generic parameters.
    ///
    /// For generic instances and specialized nested types the specialized nested type is
    /// returned. Returns [`TypeId::DUMMY`] if there is none.
    pub fn find_nested_type(&self, ty: TypeId, name: &str, arity: u16) -> TypeId {
        self.nested_types(ty)
            .into_iter()
            .find(|nested| {
                self.definition_of(*nested)
                    .is_some_and(|d| d.name == name && d.arity == arity)
            })
            .unwrap_or(TypeId::DUMMY)
    }

    /// The `Invoke` method of the delegate `ty`.
    ///
    /// Returns `None` if `ty` is not a delegate, or a malformed one without `Invoke`.
    pub fn invoke_method(&self, ty: TypeId) -> Option<MethodId> {
        if !self.is_delegate(ty) {
            return None;
        }
        self.find_method(ty, "Invoke")
    }

    /// The generic parameters of `method`.
    ///
    /// Specialized generic methods own fresh parameters, created on first access. Method
    /// instances have none.
    pub fn method_generic_parameters(&self, method: MethodId) -> &[TypeId] {
        let node = self.method(method);
        if let Some(params) = node.generic_params.get() {
            return params;
        }

        let params = node.generic_params.get_or_init(|| match node.origin {
            MethodOrigin::Specialized {
                partially_specialized,
                ..
            } if node.arity > 0 => {
                let templates = self.method_generic_parameters(partially_specialized).to_vec();
                self.fresh_generic_parameters(
                    GenericParameterOwner::Method(method),
                    node.key,
                    &templates,
                )
            }
            _ => Vec::new(),
        });

        match params {
            Some(params) => params,
            None => {
                self.diagnostics().warning(
                    DiagnosticCategory::Generic,
                    format!("Re-entrant creation of generic parameters for {}", node.name),
                );
                &[]
            }
        }
    }

    /// The signature of `method`.
    ///
    /// Signatures of specialized methods and method instances are specialized on first access.
    /// Returns `None` only for the re-entrant access during that specialization.
    pub fn method_signature(&self, method: MethodId) -> Option<&MethodSignature> {
        let node = self.method(method);
        if let Some(signature) = node.signature.get() {
            return Some(signature);
        }

        let signature = node.signature.get_or_init(|| match &node.origin {
            MethodOrigin::Specialized {
                partially_specialized,
                ..
            } => self.specialize_signature(*partially_specialized, |ty| {
                self.specialize_for_method(ty, method)
            }),
            MethodOrigin::Instance { generic, .. } => self.specialize_signature(*generic, |ty| {
                self.substitute(ty, ArgumentSource::Method(method))
            }),
            MethodOrigin::Definition => MethodSignature::new(TypeId::DUMMY, Vec::new()),
        });

        if signature.is_none() {
            self.diagnostics().warning(
                DiagnosticCategory::Member,
                format!("Re-entrant specialization of the signature of {}", node.name),
            );
        }
        signature
    }

    fn specialize_signature(
        &self,
        template: MethodId,
        specialize: impl FnMut(TypeId) -> TypeId,
    ) -> MethodSignature {
        match self.method_signature(template) {
            Some(signature) => signature
                .map_types(specialize)
                .unwrap_or_else(|| signature.clone()),
            None => MethodSignature::new(TypeId::DUMMY, Vec::new()),
        }
    }

    /// The type constraints of the generic parameter `parameter`.
    ///
    /// Constraints of fresh parameters are their template's constraints, specialized for the
    /// owner on first access.
    pub fn constraints(&self, parameter: TypeId) -> Vec<TypeId> {
        let TypeNode::GenericParameter(generic) = self.node(parameter) else {
            return Vec::new();
        };

        match &generic.constraints {
            ParameterConstraints::Declared(constraints) => {
                constraints.iter().map(|(_, ty)| *ty).collect()
            }
            ParameterConstraints::Specialized { template, resolved } => resolved
                .get_or_init(|| {
                    self.constraints(*template)
                        .into_iter()
                        .map(|constraint| match generic.owner {
                            GenericParameterOwner::Type(owner) => {
                                self.specialize_in(constraint, owner)
                            }
                            GenericParameterOwner::Method(owner) => {
                                self.specialize_for_method(constraint, owner)
                            }
                        })
                        .collect()
                })
                .cloned()
                .unwrap_or_else(|| {
                    self.diagnostics().warning(
                        DiagnosticCategory::Generic,
                        format!("Re-entrant specialization of constraints of {}", generic.name),
                    );
                    Vec::new()
                }),
        }
    }

    /// Populates the member tables of `types` in parallel.
    ///
    /// Tables are populated on demand anyway; warming them up front moves the cost out of
    /// later, possibly latency sensitive, lookups.
    pub fn populate_members_parallel(&self, types: &[TypeId]) {
        types.par_iter().for_each(|ty| {
            let _ = self.member_table(*ty);
        });
    }
}
