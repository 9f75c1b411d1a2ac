//! Lattice-operation benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench lattice
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use upperbound_rs::qualifier::UBQualifier;

/// A population of qualifiers shaped like the ones a store holds midway
/// through analyzing an indexing-heavy method.
fn population() -> Vec<UBQualifier> {
    let mut qualifiers = vec![UBQualifier::Unknown, UBQualifier::Bottom];
    for offset in -12..3 {
        qualifiers.push(UBQualifier::for_sequence("a", &offset.to_string()));
    }
    for term in ["x", "x + 1", "a.length - 1", "x - y"] {
        qualifiers.push(UBQualifier::for_sequence("a", term));
        qualifiers.push(UBQualifier::create(&["a", "b"], &[term, "0"]));
    }
    qualifiers.push(UBQualifier::create(&["a", "a", "b"], &["-1", "x", "0"]));
    qualifiers
}

fn bench_lub(c: &mut Criterion) {
    let qualifiers = population();
    c.bench_function("lub_all_pairs", |b| {
        b.iter(|| {
            for x in &qualifiers {
                for y in &qualifiers {
                    black_box(x.lub(y));
                }
            }
        })
    });
}

fn bench_glb(c: &mut Criterion) {
    let qualifiers = population();
    c.bench_function("glb_all_pairs", |b| {
        b.iter(|| {
            for x in &qualifiers {
                for y in &qualifiers {
                    black_box(x.glb(y));
                }
            }
        })
    });
}

fn bench_subtype(c: &mut Criterion) {
    let qualifiers = population();
    c.bench_function("subtype_all_pairs", |b| {
        b.iter(|| {
            for x in &qualifiers {
                for y in &qualifiers {
                    black_box(x.is_subtype(y));
                }
            }
        })
    });
}

fn bench_transfer(c: &mut Criterion) {
    let q = UBQualifier::create(&["a", "a", "b"], &["-1", "x", "0"]);
    c.bench_function("plus_offset_chain", |b| {
        b.iter(|| {
            let mut q = q.clone();
            for _ in 0..16 {
                q = black_box(q.minus_offset(1));
            }
            q
        })
    });
}

criterion_group!(benches, bench_lub, bench_glb, bench_subtype, bench_transfer);
criterion_main!(benches);
