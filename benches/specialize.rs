//! Benchmarks for specialization and member population.
//!
//! Measures the hot paths of a type graph under analysis:
//! - Substituting deep open types against a generic instance
//! - Re-specializing closed types (the identity fast path)
//! - First-time member population of fresh instances
//! - Relation queries over a class hierarchy
//! - Value type layout with bit-fields

extern crate cilmodel;

use cilmodel::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

/// `class Box<T> { T value; T[] items; Box<T[]> next; }` and `Box<int>`.
fn generic_box(host: &TypeHost) -> (TypeId, TypeId) {
    let boxed = TypeBuilder::class(host, "Bench", "Box`1")
        .generic_params(&["T"])
        .declare()
        .unwrap();
    let t = host.generic_parameters(boxed)[0];
    host.add_field(boxed, FieldDecl::new("value", t)).unwrap();
    host.add_field(boxed, FieldDecl::new("items", host.vector(t)))
        .unwrap();
    let next = host.instantiate(boxed, &[host.vector(t)]).unwrap();
    host.add_field(boxed, FieldDecl::new("next", next)).unwrap();

    let box_of_int = host.instantiate(boxed, &[host.core().int32]).unwrap();
    (boxed, box_of_int)
}

/// Benchmark substituting a deeply nested open type.
/// Type: `T[][]*&` wrapped in a function pointer `T(T[], T*)`
fn bench_substitute_open(c: &mut Criterion) {
    let host = TypeHost::new();
    let (boxed, box_of_int) = generic_box(&host);
    let t = host.generic_parameters(boxed)[0];
    let deep = host.managed_pointer(host.pointer(host.vector(host.vector(t))));
    let pointer = host.function_pointer(MethodSignature::new(t, vec![deep, host.pointer(t)]));
    let source = ArgumentSource::Type(box_of_int);

    c.bench_function("substitute_open", |b| {
        b.iter(|| black_box(host.substitute(black_box(pointer), source)));
    });
}

/// Benchmark substituting a type without generic parameters.
fn bench_substitute_closed(c: &mut Criterion) {
    let host = TypeHost::new();
    let (_, box_of_int) = generic_box(&host);
    let closed = host.vector(host.vector(host.core().string));
    let source = ArgumentSource::Type(box_of_int);

    c.bench_function("substitute_closed", |b| {
        b.iter(|| black_box(host.substitute(black_box(closed), source)));
    });
}

/// Benchmark looking up a field of an instance whose members are populated already.
fn bench_find_field(c: &mut Criterion) {
    let host = TypeHost::new();
    let (_, box_of_int) = generic_box(&host);
    host.fields(box_of_int);

    c.bench_function("find_field_populated", |b| {
        b.iter(|| black_box(host.find_field(black_box(box_of_int), "next")));
    });
}

/// Benchmark populating the members of a fresh instance per iteration.
fn bench_populate_members(c: &mut Criterion) {
    c.bench_function("populate_members_fresh", |b| {
        b.iter_batched(
            || {
                let host = TypeHost::new();
                let (_, box_of_int) = generic_box(&host);
                (host, box_of_int)
            },
            |(host, box_of_int)| black_box(host.fields(box_of_int).len()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark assignment compatibility across a ten level class hierarchy.
fn bench_is_assignable(c: &mut Criterion) {
    let host = TypeHost::new();
    let marker = TypeBuilder::interface(&host, "Bench", "IMarker")
        .declare()
        .unwrap();
    let mut current = TypeBuilder::class(&host, "Bench", "Level0")
        .interface_impl(marker)
        .declare()
        .unwrap();
    for level in 1..10 {
        current = TypeBuilder::class(&host, "Bench", &format!("Level{level}"))
            .base(current)
            .declare()
            .unwrap();
    }

    c.bench_function("is_assignable_interface", |b| {
        b.iter(|| black_box(host.is_assignable_to(black_box(current), marker)));
    });
}

/// Benchmark the layout of a struct mixing plain fields and bit-fields.
fn bench_layout(c: &mut Criterion) {
    let host = TypeHost::new();
    let core = *host.core();
    let packed = TypeBuilder::value_type(&host, "Bench", "Packed")
        .declare()
        .unwrap();
    host.add_field(packed, FieldDecl::new("tag", core.uint8)).unwrap();
    for index in 0..8 {
        let field = FieldDecl::new(&format!("flag{index}"), core.int32).bit_width(3);
        host.add_field(packed, field).unwrap();
    }
    host.add_field(packed, FieldDecl::new("value", core.float64))
        .unwrap();

    c.bench_function("layout_bit_fields", |b| {
        b.iter(|| black_box(host.layout_of(black_box(packed), true)));
    });
}

criterion_group!(
    benches,
    bench_substitute_open,
    bench_substitute_closed,
    bench_find_field,
    bench_populate_members,
    bench_is_assignable,
    bench_layout
);
criterion_main!(benches);
