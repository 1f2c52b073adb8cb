//! # Taxonomy Benchmarks
//!
//! Performance benchmarks for manhaj-core taxonomy reads.
//!
//! Run with: `cargo bench -p manhaj-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use manhaj_core::{
    AncestryResolver, ContentStore, MemoryStore, Node, NodeId, NodeKind, Status, TaxonomyGraph,
};
use std::hint::black_box;

fn id(i: usize) -> NodeId {
    NodeId::new(format!("n{i:05}"))
}

fn topic(i: usize) -> Node {
    Node::new(id(i), NodeKind::Topic, format!("Topic {i}"), Status::Published)
}

/// A single chain n0 -> n1 -> ... -> n(size-1).
fn create_chain(size: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_node(&topic(0), None).expect("insert");
    for i in 1..size {
        store.insert_node(&topic(i), Some(&id(i - 1))).expect("insert");
    }
    store
}

/// One hub with `size - 1` children.
fn create_star(size: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_node(&topic(0), None).expect("insert");
    for i in 1..size {
        store.insert_node(&topic(i), Some(&id(0))).expect("insert");
    }
    store
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_ancestor_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestor_path");

    for size in [16, 256, 4096].iter() {
        let store = create_chain(*size);
        let leaf = id(size - 1);

        group.bench_with_input(BenchmarkId::from_parameter(size), &leaf, |b, leaf| {
            b.iter(|| black_box(AncestryResolver::new(&store).ancestor_path(leaf)));
        });
    }

    group.finish();
}

fn bench_children(c: &mut Criterion) {
    let mut group = c.benchmark_group("children");

    for size in [10, 100, 1000].iter() {
        let store = create_star(*size);
        let hub = id(0);

        group.bench_with_input(BenchmarkId::from_parameter(size), &hub, |b, hub| {
            b.iter(|| black_box(TaxonomyGraph::new(&store).children(hub)));
        });
    }

    group.finish();
}

fn bench_link_cycle_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_cycle_check");

    for size in [16, 256, 1024].iter() {
        let store = create_chain(*size);
        let root = id(0);
        let leaf = id(size - 1);

        // Rejected link: walks the whole chain before finding the cycle.
        group.bench_with_input(
            BenchmarkId::new("rejected", size),
            &(leaf, root),
            |b, (leaf, root)| {
                b.iter(|| black_box(TaxonomyGraph::new(&store).link(leaf, root)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ancestor_path,
    bench_children,
    bench_link_cycle_check
);
criterion_main!(benches);
