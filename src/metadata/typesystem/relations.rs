//! Type relations: equivalence, derivation, assignment compatibility and merging.
//!
//! These are the queries a verifier or decompiler asks about a type graph. All of them work on
//! [`TypeId`]s of any node kind and follow references, modifiers, instances and specialized
//! nested types as needed. None of them fails; an unresolvable type simply relates to nothing.
//!
//! # Equivalence
//!
//! - [`TypeHost::equivalent`] compares interned keys, so a by-name reference is equivalent to the
//!   definition it names and independently built instances are equivalent
//! - [`TypeHost::equivalent_resolving`] resolves both sides first
//! - [`TypeHost::equivalent_relaxed`] additionally treats any two method generic parameters at
//!   the same position as equal, for matching signatures of unrelated method instantiations
//!
//! # Hierarchy
//!
//! Base classes and interface lists of generic instances and specialized nested types are
//! specialized from their template on first access and cached.
//!
//! # Merging
//!
//! [`TypeHost::merged_type`] computes the type of a stack slot at a control flow join. It is
//! deliberately not symmetric: the fallback order (equivalent types, equivalent stack types,
//! common base class, left implements right, right implements left, `System.Object`) matches the
//! verifier rather than a least upper bound.

use std::collections::HashSet;

use crate::metadata::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    typesystem::{
        CustomModifier, GenericParamFlags, InitOnce, MethodSignature, TypeFlags, TypeHost, TypeId,
        TypeNode,
    },
};

/// Upper bound on the length of a base class chain.
const MAX_HIERARCHY_DEPTH: usize = 256;

impl TypeHost {
    fn has_flag(&self, ty: TypeId, flag: TypeFlags) -> bool {
        self.definition_of(ty)
            .is_some_and(|definition| definition.flags.contains(flag))
    }

    /// True for interfaces and instances of generic interfaces.
    pub fn is_interface(&self, ty: TypeId) -> bool {
        !matches!(self.node(ty), TypeNode::GenericParameter(_))
            && self.has_flag(ty, TypeFlags::INTERFACE)
    }

    /// True for enumerations.
    pub fn is_enum(&self, ty: TypeId) -> bool {
        !matches!(self.node(ty), TypeNode::GenericParameter(_))
            && self.has_flag(ty, TypeFlags::ENUM)
    }

    /// True for delegates.
    pub fn is_delegate(&self, ty: TypeId) -> bool {
        !matches!(self.node(ty), TypeNode::GenericParameter(_))
            && self.has_flag(ty, TypeFlags::DELEGATE)
    }

    /// True for value types, including enumerations and generic parameters constrained to
    /// non-nullable value types.
    pub fn is_value_type(&self, ty: TypeId) -> bool {
        match self.node(ty) {
            TypeNode::GenericParameter(parameter) => parameter
                .flags
                .contains(GenericParamFlags::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT),
            TypeNode::Definition(_)
            | TypeNode::Reference(_)
            | TypeNode::Instance(_)
            | TypeNode::SpecializedNested(_)
            | TypeNode::Modified(_) => self.has_flag(ty, TypeFlags::VALUE_TYPE),
            _ => false,
        }
    }

    /// True for types whose values are object references: classes, interfaces, arrays and
    /// generic parameters constrained to reference types.
    ///
    /// A generic parameter constrained (transitively) by itself is not a reference type; the
    /// cycle is reported as a diagnostic.
    pub fn is_reference_type(&self, ty: TypeId) -> bool {
        self.is_reference_type_within(ty, &mut HashSet::new())
    }

    fn is_reference_type_within(&self, ty: TypeId, visiting: &mut HashSet<TypeId>) -> bool {
        match self.node(ty) {
            TypeNode::Vector(_) | TypeNode::Matrix(_) => true,
            TypeNode::GenericParameter(parameter) => {
                if parameter
                    .flags
                    .contains(GenericParamFlags::REFERENCE_TYPE_CONSTRAINT)
                {
                    return true;
                }
                if !visiting.insert(ty) {
                    self.diagnostics().push(
                        Diagnostic::new(
                            DiagnosticSeverity::Warning,
                            DiagnosticCategory::Type,
                            format!("Generic parameter {} constrains itself", parameter.name),
                        )
                        .with_type_index(ty.0),
                    );
                    return false;
                }

                let value_type = self.core().value_type;
                let result = self.constraints(ty).into_iter().any(|constraint| {
                    !self.is_interface(constraint)
                        && !self.equivalent_resolving(constraint, value_type)
                        && self.is_reference_type_within(constraint, visiting)
                });
                visiting.remove(&ty);
                result
            }
            TypeNode::Definition(_)
            | TypeNode::Reference(_)
            | TypeNode::Instance(_)
            | TypeNode::SpecializedNested(_)
            | TypeNode::Modified(_) => self
                .definition_of(ty)
                .is_some_and(|definition| !definition.flags.contains(TypeFlags::VALUE_TYPE)),
            _ => false,
        }
    }

    /// The underlying integral type of the enumeration `ty` (the type of its first instance
    /// field); `ty` itself for anything else.
    pub fn underlying_type(&self, ty: TypeId) -> TypeId {
        if !self.is_enum(ty) {
            return ty;
        }

        self.fields(ty)
            .into_iter()
            .map(|field| self.field(field))
            .find(|field| field.is_instance_field())
            .map_or(ty, |field| field.ty)
    }

    fn cached_or_degraded(
        &self,
        ty: TypeId,
        cell: &InitOnce<TypeId>,
        compute: impl FnOnce() -> TypeId,
    ) -> TypeId {
        match cell.get_or_init(compute) {
            Some(value) => *value,
            None => {
                self.diagnostics().warning(
                    DiagnosticCategory::Type,
                    format!("Re-entrant base class computation of {}", self.full_name(ty)),
                );
                TypeId::DUMMY
            }
        }
    }

    /// The direct base class of `ty`.
    ///
    /// Arrays derive from `System.Array`; generic parameters from their class constraint, else
    /// `System.ValueType` or `System.Object`. Returns [`TypeId::DUMMY`] if there is none
    /// (`System.Object`, interfaces, pointers, unresolved references).
    pub fn base_class(&self, ty: TypeId) -> TypeId {
        match self.node(ty) {
            TypeNode::Definition(definition) => definition.base_class().unwrap_or(TypeId::DUMMY),
            TypeNode::Reference(_) => {
                let resolved = self.resolve(ty);
                if resolved.is_dummy() {
                    TypeId::DUMMY
                } else {
                    self.base_class(resolved)
                }
            }
            TypeNode::Modified(modified) => self.base_class(modified.unmodified),
            TypeNode::Instance(instance) => {
                self.cached_or_degraded(ty, &instance.cache.base_class, || {
                    let template = self.resolve(instance.template);
                    let base = self.base_class(template);
                    if base.is_dummy() {
                        base
                    } else {
                        self.specialize_in(base, ty)
                    }
                })
            }
            TypeNode::SpecializedNested(nested) => {
                self.cached_or_degraded(ty, &nested.cache.base_class, || {
                    let base = self.base_class(nested.partially_specialized);
                    if base.is_dummy() {
                        base
                    } else {
                        self.specialize_in(base, ty)
                    }
                })
            }
            TypeNode::Vector(_) | TypeNode::Matrix(_) => self.core().array,
            TypeNode::GenericParameter(parameter) => self
                .constraints(ty)
                .into_iter()
                .find(|constraint| !self.is_interface(*constraint))
                .unwrap_or(
                    if parameter
                        .flags
                        .contains(GenericParamFlags::NOT_NULLABLE_VALUE_TYPE_CONSTRAINT)
                    {
                        self.core().value_type
                    } else {
                        self.core().object
                    },
                ),
            TypeNode::Dummy
            | TypeNode::Pointer(_)
            | TypeNode::ManagedPointer(_)
            | TypeNode::FunctionPointer(_) => TypeId::DUMMY,
        }
    }

    /// The interfaces `ty` declares to implement directly.
    ///
    /// Interface constraints for generic parameters.
    pub fn interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let (context, cache) = match self.node(ty) {
            TypeNode::Definition(definition) => return definition.interfaces().collect(),
            TypeNode::Reference(_) => {
                let resolved = self.resolve(ty);
                return if resolved.is_dummy() {
                    Vec::new()
                } else {
                    self.interfaces(resolved)
                };
            }
            TypeNode::Modified(modified) => return self.interfaces(modified.unmodified),
            TypeNode::GenericParameter(_) => {
                return self
                    .constraints(ty)
                    .into_iter()
                    .filter(|constraint| self.is_interface(*constraint))
                    .collect()
            }
            TypeNode::Instance(instance) => (self.resolve(instance.template), &instance.cache),
            TypeNode::SpecializedNested(nested) => (nested.partially_specialized, &nested.cache),
            _ => return Vec::new(),
        };

        let interfaces = cache.interfaces.get_or_init(|| {
            self.interfaces(context)
                .into_iter()
                .map(|interface| self.specialize_in(interface, ty))
                .collect()
        });
        match interfaces {
            Some(interfaces) => interfaces.clone(),
            None => {
                self.diagnostics().warning(
                    DiagnosticCategory::Type,
                    format!("Re-entrant interface computation of {}", self.full_name(ty)),
                );
                Vec::new()
            }
        }
    }

    /// The base class chain of `ty`, starting with `ty` itself.
    ///
    /// A cyclic chain (through base classes or class constraints) is cut before the first
    /// repeated type and reported as a diagnostic.
    pub fn hierarchy(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = ty;
        while !current.is_dummy() {
            if !seen.insert(current) {
                self.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Type,
                        format!("Cyclic base class chain through {}", self.full_name(current)),
                    )
                    .with_type_index(ty.0),
                );
                break;
            }
            if chain.len() == MAX_HIERARCHY_DEPTH {
                self.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Error,
                        DiagnosticCategory::Type,
                        format!("Base class chain of {} is too long", self.full_name(ty)),
                    )
                    .with_type_index(ty.0)
                    .with_depth(chain.len()),
                );
                break;
            }
            chain.push(current);
            current = self.base_class(current);
        }
        chain
    }

    /// Interned-key equality.
    pub fn equivalent(&self, a: TypeId, b: TypeId) -> bool {
        a == b || self.interned_key(a) == self.interned_key(b)
    }

    /// Equivalence after resolving both sides; unresolvable sides are compared as they are.
    pub fn equivalent_resolving(&self, a: TypeId, b: TypeId) -> bool {
        let resolve = |ty: TypeId| {
            let resolved = self.resolve(ty);
            if resolved.is_dummy() {
                ty
            } else {
                resolved
            }
        };
        self.equivalent(resolve(a), resolve(b))
    }

    /// Equivalence that treats method generic parameters at equal positions as equal,
    /// regardless of the method owning them.
    pub fn equivalent_relaxed(&self, a: TypeId, b: TypeId) -> bool {
        if self.equivalent(a, b) {
            return true;
        }

        let all = |x: &[TypeId], y: &[TypeId]| {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|(x, y)| self.equivalent_relaxed(*x, *y))
        };
        let modifiers = |x: &[CustomModifier], y: &[CustomModifier]| {
            x.len() == y.len()
                && x.iter().zip(y).all(|(x, y)| {
                    x.optional == y.optional && self.equivalent_relaxed(x.modifier, y.modifier)
                })
        };
        let signatures = |x: &MethodSignature, y: &MethodSignature| {
            x.calling_convention == y.calling_convention
                && x.has_this == y.has_this
                && x.return_by_ref == y.return_by_ref
                && self.equivalent_relaxed(x.returns, y.returns)
                && all(&x.parameters, &y.parameters)
                && all(&x.extra_parameters, &y.extra_parameters)
        };

        match (self.node(a), self.node(b)) {
            (TypeNode::GenericParameter(x), TypeNode::GenericParameter(y)) => {
                x.is_method_parameter() && y.is_method_parameter() && x.index == y.index
            }
            (TypeNode::Instance(x), TypeNode::Instance(y)) => {
                self.equivalent_relaxed(x.template, y.template) && all(&x.arguments, &y.arguments)
            }
            (TypeNode::SpecializedNested(x), TypeNode::SpecializedNested(y)) => {
                self.equivalent(x.unspecialized, y.unspecialized)
                    && self.equivalent_relaxed(x.containing, y.containing)
            }
            (TypeNode::Vector(x), TypeNode::Vector(y)) => {
                self.equivalent_relaxed(x.element, y.element)
            }
            (TypeNode::Matrix(x), TypeNode::Matrix(y)) => {
                x.rank == y.rank
                    && x.sizes == y.sizes
                    && x.lower_bounds == y.lower_bounds
                    && self.equivalent_relaxed(x.element, y.element)
            }
            (TypeNode::Pointer(x), TypeNode::Pointer(y)) => {
                self.equivalent_relaxed(x.target, y.target)
            }
            (TypeNode::ManagedPointer(x), TypeNode::ManagedPointer(y)) => {
                self.equivalent_relaxed(x.target, y.target)
            }
            (TypeNode::Modified(x), TypeNode::Modified(y)) => {
                self.equivalent_relaxed(x.unmodified, y.unmodified)
                    && modifiers(&x.modifiers, &y.modifiers)
            }
            (TypeNode::FunctionPointer(x), TypeNode::FunctionPointer(y)) => {
                signatures(&x.signature, &y.signature)
            }
            _ => false,
        }
    }

    /// True if `base` is a (transitive, proper) base class of `ty`.
    pub fn derives_from(&self, ty: TypeId, base: TypeId) -> bool {
        self.hierarchy(ty)
            .into_iter()
            .skip(1)
            .any(|ancestor| self.equivalent_resolving(ancestor, base))
    }

    /// True if `ty`, one of its base classes, or one of the interfaces those implement
    /// (transitively) is equivalent to `interface`.
    pub fn implements(&self, ty: TypeId, interface: TypeId) -> bool {
        let mut pending: Vec<TypeId> = self
            .hierarchy(ty)
            .into_iter()
            .flat_map(|ancestor| self.interfaces(ancestor))
            .collect();
        let mut seen = HashSet::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(self.interned_key(current)) {
                continue;
            }
            if self.equivalent_resolving(current, interface) {
                return true;
            }
            pending.extend(self.interfaces(current));
        }
        false
    }

    /// True if a value of type `source` may be stored in a location of type `target`.
    ///
    /// That is the case for equivalent types, reference types deriving from `target`, types
    /// implementing `target`, interfaces stored as `System.Object`, and arrays of equal shape
    /// whose element types are assignment compatible.
    pub fn is_assignable_to(&self, source: TypeId, target: TypeId) -> bool {
        if self.equivalent_resolving(source, target) {
            return true;
        }
        if self.is_reference_type(source) && self.derives_from(source, target) {
            return true;
        }
        if self.implements(source, target) {
            return true;
        }
        if self.is_interface(source) && self.equivalent_resolving(target, self.core().object) {
            return true;
        }

        match (self.node(source).as_array(), self.node(target).as_array()) {
            (Some(from), Some(to)) => {
                from.is_vector() == to.is_vector()
                    && from.rank() == to.rank()
                    && self.is_assignable_to(from.element_type(), to.element_type())
            }
            _ => false,
        }
    }

    /// The most derived class both `a` and `b` derive from (or are).
    pub fn most_derived_common_base_class(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        let ancestors: HashSet<_> = self
            .hierarchy(a)
            .into_iter()
            .map(|ancestor| self.interned_key(ancestor))
            .collect();

        self.hierarchy(b)
            .into_iter()
            .find(|ancestor| ancestors.contains(&self.interned_key(*ancestor)))
    }

    /// The type of a stack slot at a control flow join of `a` and `b`.
    pub fn merged_type(&self, a: TypeId, b: TypeId) -> TypeId {
        if self.equivalent(a, b) {
            return a;
        }

        let stack_a = self.stack_type(a);
        if self.equivalent(stack_a, self.stack_type(b)) {
            return stack_a;
        }

        let resolved_a = self.resolve(a);
        let resolved_b = self.resolve(b);
        if !resolved_a.is_dummy() && !resolved_b.is_dummy() {
            if let Some(common) = self.most_derived_common_base_class(resolved_a, resolved_b) {
                return common;
            }
        }

        if !resolved_a.is_dummy() && self.implements(resolved_a, b) {
            return b;
        }
        if !resolved_b.is_dummy() && self.implements(resolved_b, a) {
            return a;
        }

        self.core().object
    }
}
