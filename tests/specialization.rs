//! Integration tests for generic specialization.
//!
//! These tests build small generic type graphs through the public API and check the laws
//! specialization has to obey: substituting twice changes nothing, closed types come back as
//! the identical node, and members of nested generic types see the arguments of every
//! enclosing instance.

use std::sync::Arc;

use cilmodel::prelude::*;
use rayon::prelude::*;

/// `class Box<T> { T value; class Inner { T item; } }`
fn declare_box(host: &TypeHost) -> Result<(TypeId, TypeId)> {
    let boxed = TypeBuilder::class(host, "Demo", "Box`1")
        .generic_params(&["T"])
        .declare()?;
    let t = host.generic_parameters(boxed)[0];
    host.add_field(boxed, FieldDecl::new("value", t))?;

    let inner = TypeBuilder::class(host, "", "Inner")
        .nested_in(boxed)
        .declare()?;
    host.add_field(inner, FieldDecl::new("item", t))?;
    Ok((boxed, inner))
}

/// A sample of open types over `t`, covering every structural node kind.
fn open_types(host: &TypeHost, boxed: TypeId, t: TypeId) -> Result<Vec<TypeId>> {
    let modifier = TypeBuilder::class(host, "Demo", "IsConst").declare()?;
    Ok(vec![
        t,
        host.vector(t),
        host.matrix(t, 3, vec![0, 1], vec![2]),
        host.pointer(t),
        host.managed_pointer(host.vector(t)),
        host.modified(t, vec![CustomModifier::optional(modifier)]),
        host.function_pointer(MethodSignature::new(t, vec![host.pointer(t)])),
        host.instantiate(boxed, &[host.vector(t)])?,
        host.core().string,
    ])
}

#[test]
fn substitution_is_idempotent() -> Result<()> {
    let host = TypeHost::new();
    let (boxed, _) = declare_box(&host)?;
    let t = host.generic_parameters(boxed)[0];

    let types = open_types(&host, boxed, t)?;
    let contexts = [
        host.instantiate(boxed, &[host.core().int32])?,
        host.instantiate(boxed, &[host.vector(host.core().string)])?,
    ];
    for context in contexts {
        let source = ArgumentSource::Type(context);
        for &ty in &types {
            let once = host.substitute(ty, source);
            let twice = host.substitute(once, source);
            assert_eq!(host.interned_key(once), host.interned_key(twice));
        }
    }
    Ok(())
}

#[test]
fn unaffected_types_are_returned_as_is() -> Result<()> {
    let host = TypeHost::new();
    let (boxed, _) = declare_box(&host)?;
    let other = TypeBuilder::class(&host, "Demo", "Other`1")
        .generic_params(&["U"])
        .declare()?;
    let u = host.generic_parameters(other)[0];

    let box_of_int = host.instantiate(boxed, &[host.core().int32])?;
    let source = ArgumentSource::Type(box_of_int);
    for ty in open_types(&host, other, u)? {
        assert_eq!(host.substitute(ty, source), ty);
    }
    Ok(())
}

#[test]
fn instances_are_interned() -> Result<()> {
    let host = TypeHost::new();
    let (boxed, inner) = declare_box(&host)?;
    let int32 = host.core().int32;

    let first = host.instantiate(boxed, &[int32])?;
    let second = host.instantiate(boxed, &[int32])?;
    assert_eq!(first, second);
    assert_eq!(host.interned_key(first), host.interned_key(second));
    assert_eq!(host.full_name(first), "Demo.Box`1<System.Int32>");

    let nested = host.find_nested_type(first, "Inner", 0);
    assert_eq!(host.unspecialized_type(nested), inner);
    let item = host.find_field(nested, "item").expect("specialized field");
    assert_eq!(host.field(item).ty(), int32);
    Ok(())
}

#[test]
fn nested_generics_see_every_enclosing_argument() -> Result<()> {
    // class Outer<T> { class Middle<U> { class Leaf { Pair<T, U> both; U[] us; } } }
    let host = TypeHost::new();
    let core = *host.core();
    let pair = TypeBuilder::class(&host, "Demo", "Pair`2")
        .generic_params(&["A", "B"])
        .declare()?;
    let outer = TypeBuilder::class(&host, "Demo", "Outer`1")
        .generic_params(&["T"])
        .declare()?;
    let middle = TypeBuilder::class(&host, "", "Middle`1")
        .nested_in(outer)
        .generic_params(&["U"])
        .declare()?;
    let leaf = TypeBuilder::class(&host, "", "Leaf")
        .nested_in(middle)
        .declare()?;
    let t = host.generic_parameters(outer)[0];
    let u = host.generic_parameters(middle)[0];
    host.add_field(leaf, FieldDecl::new("both", host.instantiate(pair, &[t, u])?))?;
    host.add_field(leaf, FieldDecl::new("us", host.vector(u)))?;

    let outer_of_int = host.instantiate(outer, &[core.int32])?;
    let middle_spec = host.find_nested_type(outer_of_int, "Middle`1", 1);
    assert!(matches!(
        host.node(middle_spec),
        TypeNode::SpecializedNested(_)
    ));

    // Middle has fresh parameters of its own under Outer<int>
    let fresh = host.generic_parameters(middle_spec);
    assert_eq!(fresh.len(), 1);
    assert_ne!(fresh[0], u);

    let middle_of_string = host.instantiate(middle_spec, &[core.string])?;
    let leaf_spec = host.find_nested_type(middle_of_string, "Leaf", 0);

    let both = host.find_field(leaf_spec, "both").expect("both");
    assert_eq!(
        host.field(both).ty(),
        host.instantiate(pair, &[core.int32, core.string])?
    );
    let us = host.find_field(leaf_spec, "us").expect("us");
    assert_eq!(host.field(us).ty(), host.vector(core.string));

    // The same leaf reached twice is the same node
    assert_eq!(host.find_nested_type(middle_of_string, "Leaf", 0), leaf_spec);
    assert!(!host.diagnostics().has_warnings());
    Ok(())
}

#[test]
fn self_instance_fields_round_trip() -> Result<()> {
    // class Node<T> { Node<T> next; }
    let host = TypeHost::new();
    let node = TypeBuilder::class(&host, "Demo", "Node`1")
        .generic_params(&["T"])
        .declare()?;
    let self_instance = host.self_instance(node);
    host.add_field(node, FieldDecl::new("next", self_instance))?;

    let node_of_int = host.instantiate(node, &[host.core().int32])?;
    let next = host.find_field(node_of_int, "next").expect("next");
    assert_eq!(host.field(next).ty(), node_of_int);
    Ok(())
}

#[test]
fn generic_method_instances() -> Result<()> {
    // class Box<T> { Pair<T, U> Zip<U>(U other); }
    let host = TypeHost::new();
    let core = *host.core();
    let pair = TypeBuilder::class(&host, "Demo", "Pair`2")
        .generic_params(&["A", "B"])
        .declare()?;
    let (boxed, _) = declare_box(&host)?;
    let t = host.generic_parameters(boxed)[0];
    let zipped = |params: &[TypeId]| {
        let returns = host
            .instantiate(pair, &[t, params[0]])
            .unwrap_or(TypeId::DUMMY);
        MethodSignature::instance(returns, vec![params[0]])
    };
    host.add_method(boxed, MethodDecl::new("Zip").generic_params(&["U"]), zipped)?;

    let box_of_int = host.instantiate(boxed, &[core.int32])?;
    let zip = host.find_method(box_of_int, "Zip").expect("Zip");
    let zip_of_string = host.instantiate_method(zip, &[core.string])?;

    let signature = host.method_signature(zip_of_string).expect("signature");
    assert_eq!(
        signature.returns,
        host.instantiate(pair, &[core.int32, core.string])?
    );
    assert_eq!(signature.parameters, vec![core.string]);
    Ok(())
}

#[test]
fn construction_contracts() -> Result<()> {
    let host = TypeHost::new();
    let (boxed, _) = declare_box(&host)?;
    let int32 = host.core().int32;

    assert!(matches!(
        host.instantiate(int32, &[int32]),
        Err(Error::TypeNotGeneric(_))
    ));
    assert!(matches!(
        host.instantiate(boxed, &[int32, int32]),
        Err(Error::GenericArity {
            expected: 1,
            found: 2
        })
    ));
    Ok(())
}

#[test]
fn concurrent_member_population() -> Result<()> {
    let host = TypeHost::new();
    let (boxed, _) = declare_box(&host)?;
    let core = *host.core();
    let arguments = [core.int32, core.string, core.float64, core.boolean];
    let instances = arguments
        .iter()
        .map(|argument| host.instantiate(boxed, &[*argument]))
        .collect::<Result<Vec<_>>>()?;

    let more = [core.int64, core.char]
        .iter()
        .map(|argument| host.instantiate(boxed, &[*argument]))
        .collect::<Result<Vec<_>>>()?;
    host.populate_members_parallel(&more);
    for instance in &more {
        assert_eq!(host.fields(*instance).len(), 1);
    }

    let observed: Vec<(TypeId, FieldId)> = (0..256)
        .into_par_iter()
        .map(|index| {
            let instance = instances[index % instances.len()];
            let field = host.find_field(instance, "value").expect("value");
            (instance, field)
        })
        .collect();

    for (instance, field) in observed {
        assert_eq!(host.fields(instance), vec![field]);
    }
    for (instance, argument) in instances.iter().zip(arguments) {
        let field = host.fields(*instance)[0];
        assert_eq!(host.field(field).ty(), argument);
    }
    assert!(!host.diagnostics().has_warnings());
    Ok(())
}

#[test]
fn shared_intern_authority() -> Result<()> {
    let table = Arc::new(InternTable::new());
    let left = TypeHost::with_config(HostConfig::default(), table.clone());
    let right = TypeHost::with_config(HostConfig::default(), table);

    let (left_box, _) = declare_box(&left)?;
    let (right_box, _) = declare_box(&right)?;
    let left_instance = left.instantiate(left_box, &[left.vector(left.core().string)])?;
    let right_instance = right.instantiate(right_box, &[right.vector(right.core().string)])?;

    assert_eq!(
        left.interned_key(left_instance),
        right.interned_key(right_instance)
    );
    Ok(())
}
