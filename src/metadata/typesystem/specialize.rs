//! Rebase and substitute: the two specialization transforms.
//!
//! Specialization replaces the generic parameters occurring in a type by something else, while
//! rebuilding every node on the path from the root to the replaced parameters. The two
//! transforms differ only in what a parameter is replaced with:
//!
//! - **Rebase** ([`TypeHost::rebase`]) redirects parameters of a partially specialized template
//!   to the fresh parameters of a specialized nested type or specialized method. This is needed
//!   because a nested type (or method) of a generic instance owns its own parameters, distinct
//!   from the ones of its definition.
//! - **Substitute** ([`TypeHost::substitute`]) replaces parameters by the positional arguments
//!   of a generic type instance or generic method instance.
//!
//! Both match parameters by the interned key of their owner and their position; names play no
//! role. A parameter whose owner does not appear in the chain is returned unchanged, and a node
//! none of whose constituents changed is returned as is, so specializing a closed type is free.
//!
//! # Degradation
//!
//! Neither transform fails. An argument position outside the argument list yields
//! [`TypeId::DUMMY`], and so does nesting deeper than
//! [`HostConfig::max_specialization_depth`](crate::metadata::typesystem::HostConfig); both are
//! recorded in the host's diagnostics.
//!
//! # Example
//!
//! ```rust
//! use cilmodel::prelude::*;
//!
//! let host = TypeHost::new();
//! let boxed = TypeBuilder::class(&host, "Demo", "Box").generic_params(&["T"]).declare()?;
//! let t = host.generic_parameters(boxed)[0];
//! let box_of_int = host.instantiate(boxed, &[host.core().int32])?;
//!
//! let list_of_t = host.vector(t);
//! let specialized = host.substitute(list_of_t, ArgumentSource::Type(box_of_int));
//! assert_eq!(specialized, host.vector(host.core().int32));
//!
//! let closed = host.vector(host.core().string);
//! assert_eq!(host.substitute(closed, ArgumentSource::Type(box_of_int)), closed);
//! # Ok::<(), cilmodel::Error>(())
//! ```

use crate::metadata::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    typesystem::{
        CustomModifier, GenericParameter, MethodId, MethodOrigin, TypeHost, TypeId, TypeNode,
    },
};

/// The owner of the fresh parameters a rebase redirects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseTarget {
    /// A specialized nested type
    Type(TypeId),
    /// A specialized method
    Method(MethodId),
}

/// The owner of the arguments a substitution reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentSource {
    /// A generic type instance, or a specialized nested type (whose owning instance is used)
    Type(TypeId),
    /// A generic method instance
    Method(MethodId),
}

/// Replacement policy for generic parameters during a walk.
trait ParameterMap {
    /// Returns the replacement of the parameter `ty`, or `ty` itself.
    fn map(&self, host: &TypeHost, ty: TypeId, parameter: &GenericParameter) -> TypeId;
}

struct Rebase(RebaseTarget);

impl ParameterMap for Rebase {
    fn map(&self, host: &TypeHost, ty: TypeId, parameter: &GenericParameter) -> TypeId {
        match self.0 {
            RebaseTarget::Type(nested) => {
                if parameter.is_method_parameter() {
                    ty
                } else {
                    host.rebase_type_parameter(ty, parameter, nested)
                }
            }
            RebaseTarget::Method(method) => {
                let node = host.method(method);
                if !parameter.is_method_parameter() {
                    return host.rebase_type_parameter(ty, parameter, node.container);
                }

                let MethodOrigin::Specialized {
                    partially_specialized,
                    ..
                } = node.origin
                else {
                    return ty;
                };
                if parameter.owner_key != host.method(partially_specialized).key {
                    return ty;
                }

                let fresh = host.method_generic_parameters(method);
                host.argument_at(fresh, ty, parameter)
            }
        }
    }
}

struct Substitute(ArgumentSource);

impl ParameterMap for Substitute {
    fn map(&self, host: &TypeHost, ty: TypeId, parameter: &GenericParameter) -> TypeId {
        match self.0 {
            ArgumentSource::Type(source) => {
                if parameter.is_method_parameter() {
                    ty
                } else {
                    host.substitute_type_parameter(ty, parameter, source)
                }
            }
            ArgumentSource::Method(instance) => {
                if !parameter.is_method_parameter() {
                    return ty;
                }

                match &host.method(instance).origin {
                    MethodOrigin::Instance { generic, arguments }
                        if parameter.owner_key == host.method(*generic).key =>
                    {
                        host.argument_at(arguments, ty, parameter)
                    }
                    _ => ty,
                }
            }
        }
    }
}

impl TypeHost {
    /// Redirects the parameters of a partially specialized template to the fresh parameters of
    /// `target`.
    ///
    /// For [`RebaseTarget::Type`], a type parameter is redirected if its owner is the partially
    /// specialized template of the target or of one of the specialized nested types enclosing
    /// it. For [`RebaseTarget::Method`], method parameters of the partially specialized method are
    /// redirected to the method's fresh parameters, and type parameters are rebased through the
    /// method's container.
    pub fn rebase(&self, ty: TypeId, target: RebaseTarget) -> TypeId {
        self.specialize_with(ty, &Rebase(target), 0)
    }

    /// Replaces parameters by the positional arguments of `source`.
    ///
    /// For [`ArgumentSource::Type`], a type parameter is replaced if its owner is the template
    /// of the instance, walking outward through the owning instances when that template is a
    /// specialized nested type. For [`ArgumentSource::Method`], parameters of the generic method
    /// are replaced by the arguments of the method instance.
    pub fn substitute(&self, ty: TypeId, source: ArgumentSource) -> TypeId {
        self.specialize_with(ty, &Substitute(source), 0)
    }

    /// Specializes a type taken from the template of `context` as a member type of `context`.
    ///
    /// `context` is a generic instance (substitute only) or a specialized nested type (rebase
    /// onto it, then substitute with its owning instance). Any other context leaves `ty` as is.
    pub fn specialize_in(&self, ty: TypeId, context: TypeId) -> TypeId {
        match self.node(context) {
            TypeNode::Instance(_) => self.substitute(ty, ArgumentSource::Type(context)),
            TypeNode::SpecializedNested(_) => {
                let rebased = self.rebase(ty, RebaseTarget::Type(context));
                self.substitute(rebased, ArgumentSource::Type(context))
            }
            _ => ty,
        }
    }

    /// Specializes a type taken from the partially specialized version of the specialized
    /// method `method`: rebase onto the method, then substitute with its container.
    pub(crate) fn specialize_for_method(&self, ty: TypeId, method: MethodId) -> TypeId {
        let rebased = self.rebase(ty, RebaseTarget::Method(method));
        match self.node(self.method(method).container) {
            TypeNode::Instance(_) | TypeNode::SpecializedNested(_) => self.substitute(
                rebased,
                ArgumentSource::Type(self.method(method).container),
            ),
            _ => rebased,
        }
    }

    fn argument_at(&self, arguments: &[TypeId], ty: TypeId, parameter: &GenericParameter) -> TypeId {
        match arguments.get(usize::from(parameter.index)) {
            Some(argument) => *argument,
            None => {
                self.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Generic,
                        format!(
                            "Generic parameter {} at position {} has no argument ({} supplied)",
                            parameter.name,
                            parameter.index,
                            arguments.len()
                        ),
                    )
                    .with_type_index(ty.0),
                );
                TypeId::DUMMY
            }
        }
    }

    fn rebase_type_parameter(
        &self,
        ty: TypeId,
        parameter: &GenericParameter,
        start: TypeId,
    ) -> TypeId {
        let mut current = start;
        loop {
            let TypeNode::SpecializedNested(nested) = self.node(current) else {
                return ty;
            };
            if parameter.owner_key == self.interned_key(nested.partially_specialized) {
                let fresh = self.nested_generic_parameters(current, nested);
                return self.argument_at(fresh, ty, parameter);
            }
            current = nested.containing;
        }
    }

    fn substitute_type_parameter(
        &self,
        ty: TypeId,
        parameter: &GenericParameter,
        source: TypeId,
    ) -> TypeId {
        let mut current = match self.node(source) {
            TypeNode::SpecializedNested(nested) => nested.instance,
            _ => source,
        };

        loop {
            let TypeNode::Instance(instance) = self.node(current) else {
                return ty;
            };
            if parameter.owner_key == self.interned_key(instance.template) {
                return self.argument_at(&instance.arguments, ty, parameter);
            }
            match self.node(instance.template) {
                TypeNode::SpecializedNested(nested) => current = nested.instance,
                _ => return ty,
            }
        }
    }

    fn specialize_with(&self, ty: TypeId, map: &dyn ParameterMap, depth: usize) -> TypeId {
        if depth > self.config().max_specialization_depth {
            self.diagnostics().push(
                Diagnostic::new(
                    DiagnosticSeverity::Error,
                    DiagnosticCategory::Generic,
                    "Specialization depth exceeded",
                )
                .with_type_index(ty.0)
                .with_depth(depth),
            );
            return TypeId::DUMMY;
        }

        let next = |inner: TypeId| self.specialize_with(inner, map, depth + 1);
        match self.node(ty) {
            TypeNode::GenericParameter(parameter) => map.map(self, ty, parameter),
            TypeNode::Instance(instance) => {
                let template = next(instance.template);
                let arguments: Vec<TypeId> = instance.arguments.iter().map(|a| next(*a)).collect();
                if template == instance.template && arguments == instance.arguments {
                    ty
                } else {
                    self.instantiate_unchecked(template, arguments)
                }
            }
            TypeNode::SpecializedNested(nested) => {
                let containing = next(nested.containing);
                if containing == nested.containing {
                    ty
                } else {
                    self.specialized_nested(containing, nested.unspecialized)
                }
            }
            TypeNode::Vector(vector) => {
                let element = next(vector.element);
                if element == vector.element {
                    ty
                } else {
                    self.vector(element)
                }
            }
            TypeNode::Matrix(matrix) => {
                let element = next(matrix.element);
                if element == matrix.element {
                    ty
                } else {
                    self.matrix(
                        element,
                        matrix.rank,
                        matrix.lower_bounds.clone(),
                        matrix.sizes.clone(),
                    )
                }
            }
            TypeNode::Pointer(pointer) => {
                let target = next(pointer.target);
                if target == pointer.target {
                    ty
                } else {
                    self.pointer(target)
                }
            }
            TypeNode::ManagedPointer(pointer) => {
                let target = next(pointer.target);
                if target == pointer.target {
                    ty
                } else {
                    self.managed_pointer(target)
                }
            }
            TypeNode::Modified(modified) => {
                let unmodified = next(modified.unmodified);
                let modifiers: Vec<CustomModifier> = modified
                    .modifiers
                    .iter()
                    .map(|m| CustomModifier {
                        optional: m.optional,
                        modifier: next(m.modifier),
                    })
                    .collect();
                if unmodified == modified.unmodified && modifiers == modified.modifiers {
                    ty
                } else {
                    self.modified(unmodified, modifiers)
                }
            }
            TypeNode::FunctionPointer(pointer) => match pointer.signature.map_types(next) {
                Some(signature) => self.function_pointer(signature),
                None => ty,
            },
            // Definitions and references are closed; the dummy stays the dummy
            TypeNode::Dummy | TypeNode::Definition(_) | TypeNode::Reference(_) => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        metadata::typesystem::{
            node::ParameterConstraints, CallingConvention, GenericParamFlags,
            GenericParameterOwner, HostConfig, InternTable, MethodSignature, TypeBuilder,
        },
        test::Fixture,
    };

    #[test]
    fn substitute_replaces_by_position() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let int32 = host.core().int32;
        let string = host.core().string;

        let [k, v] = fixture.pair_params();
        let pair = host.instantiate(fixture.pair, &[int32, string]).unwrap();

        let source = ArgumentSource::Type(pair);
        assert_eq!(host.substitute(k, source), int32);
        assert_eq!(host.substitute(v, source), string);
        assert_eq!(
            host.substitute(host.managed_pointer(v), source),
            host.managed_pointer(string)
        );
    }

    #[test]
    fn unrelated_parameters_are_untouched() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let box_of_int = host
            .instantiate(fixture.boxed, &[host.core().int32])
            .unwrap();

        let [k, _] = fixture.pair_params();
        let ty = host.pointer(host.vector(k));
        assert_eq!(host.substitute(ty, ArgumentSource::Type(box_of_int)), ty);
    }

    #[test]
    fn walks_modifiers_and_function_pointers() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let int32 = host.core().int32;
        let t = fixture.box_param();
        let box_of_int = host.instantiate(fixture.boxed, &[int32]).unwrap();
        let source = ArgumentSource::Type(box_of_int);

        let modifier = fixture.is_volatile;
        let modified = host.modified(t, vec![CustomModifier::required(modifier)]);
        assert_eq!(
            host.substitute(modified, source),
            host.modified(int32, vec![CustomModifier::required(modifier)])
        );

        let signature = MethodSignature::new(t, vec![host.vector(t)])
            .with_calling_convention(CallingConvention::VarArg)
            .with_extra_parameters(vec![t]);
        let pointer = host.function_pointer(signature);
        let expected = host.function_pointer(
            MethodSignature::new(int32, vec![host.vector(int32)])
                .with_calling_convention(CallingConvention::VarArg)
                .with_extra_parameters(vec![int32]),
        );
        assert_eq!(host.substitute(pointer, source), expected);
    }

    #[test]
    fn matrix_bounds_are_carried() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let int32 = host.core().int32;
        let t = fixture.box_param();
        let box_of_int = host.instantiate(fixture.boxed, &[int32]).unwrap();

        let matrix = host.matrix(t, 2, vec![1, 1], vec![4]);
        let specialized = host.substitute(matrix, ArgumentSource::Type(box_of_int));
        match host.node(specialized) {
            TypeNode::Matrix(result) => {
                assert_eq!(result.element, int32);
                assert_eq!(result.rank, 2);
                assert_eq!(result.lower_bounds, vec![1, 1]);
                assert_eq!(result.sizes, vec![4]);
            }
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn instances_are_rebuilt_canonically() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let int32 = host.core().int32;
        let t = fixture.box_param();

        let box_of_t = host.instantiate(fixture.boxed, &[t]).unwrap();
        let box_of_int = host.instantiate(fixture.boxed, &[int32]).unwrap();
        assert_eq!(
            host.substitute(box_of_t, ArgumentSource::Type(box_of_int)),
            box_of_int
        );
    }

    #[test]
    fn out_of_range_argument_degrades() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let [_, v] = fixture.pair_params();

        // Box has a single argument, so a parameter at position 1 keyed under Box has none
        let stray = host.declare_generic_parameter(
            GenericParameterOwner::Type(fixture.boxed),
            host.interned_key(fixture.boxed),
            1,
            "U".to_string(),
            GenericParamFlags::empty(),
            ParameterConstraints::Declared(boxcar::Vec::new()),
        );
        let box_of_int = host
            .instantiate(fixture.boxed, &[host.core().int32])
            .unwrap();

        assert_eq!(
            host.substitute(stray, ArgumentSource::Type(box_of_int)),
            TypeId::DUMMY
        );
        assert!(host.diagnostics().has_warnings());
        assert_eq!(host.substitute(v, ArgumentSource::Type(box_of_int)), v);
    }

    #[test]
    fn depth_limit_degrades() {
        let host = TypeHost::with_config(
            HostConfig::default().with_max_specialization_depth(2),
            Arc::new(InternTable::new()),
        );
        let boxed = TypeBuilder::class(&host, "Demo", "Box")
            .generic_params(&["T"])
            .declare()
            .unwrap();
        let t = host.generic_parameters(boxed)[0];
        let box_of_int = host.instantiate(boxed, &[host.core().int32]).unwrap();

        let deep = host.vector(host.vector(host.vector(host.vector(t))));
        let result = host.substitute(deep, ArgumentSource::Type(box_of_int));
        assert!(host.diagnostics().has_errors());
        assert_ne!(result, deep);
    }

    #[test]
    fn method_instance_substitution() {
        let fixture = Fixture::new();
        let host = &fixture.host;
        let string = host.core().string;

        let map = host.find_method(fixture.boxed, "Map").unwrap();
        let u = host.method_generic_parameters(map)[0];
        let instance = host.instantiate_method(map, &[string]).unwrap();

        assert_eq!(host.substitute(u, ArgumentSource::Method(instance)), string);
        assert_eq!(
            host.substitute(fixture.box_param(), ArgumentSource::Method(instance)),
            fixture.box_param()
        );
    }
}
