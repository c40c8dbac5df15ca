// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use understory_interaction::category::EventCategory;
use understory_interaction::event::Event;
use understory_interaction::headless::{HeadlessHost, NodeId};
use understory_interaction::{Registry, TriggerOptions};

/// A chain of `depth` nested nodes under the root; the second carries `.cont`.
fn nested(depth: usize) -> (HeadlessHost, NodeId, NodeId) {
    let mut host = HeadlessHost::new();
    let mut node = host.root();
    for i in 0..depth {
        node = host.append(node, "div");
        if i == 1 {
            host.add_class(node, "cont");
        }
    }
    let root = host.root();
    (host, root, node)
}

fn registry() -> Registry<HeadlessHost> {
    let mut registry = Registry::new();
    registry.add_filter("cont", |host: &HeadlessHost, _, t| {
        t.target.and_then(|n| host.closest_with_class(n, "cont"))
    });
    registry.add_filter("never", |_: &HeadlessHost, _, _| None);
    registry.add_handler("noop", |_, inv| {
        black_box(inv.this());
        Ok(())
    });
    registry
}

fn bench_delegated_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("interaction/delegated_dispatch");

    // Cost is dominated by the ancestor walk in the filter and in routing.
    for depth in [4_usize, 16, 64] {
        let (mut host, root, leaf) = nested(depth);
        let mut registry = registry();
        registry
            .interaction("")
            .on(["click"])
            .anchors([root])
            .filters(["never", "cont@mouseenter"])
            .handler("noop")
            .enable(&mut host);
        group.throughput(Throughput::Elements(1));
        group.bench_function(BenchmarkId::new("depth", depth), |b| {
            b.iter(|| {
                let ev = Event::new("click", EventCategory::Pointer);
                black_box(host.dispatch(&mut registry, leaf, ev).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("interaction/fan_out");

    for count in [1_usize, 16, 128] {
        let (mut host, root, leaf) = nested(8);
        let mut registry = registry();
        for _ in 0..count {
            registry
                .interaction("")
                .on(["click"])
                .anchors([root])
                .handler("noop")
                .enable(&mut host);
        }
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("listeners", count), |b| {
            b.iter(|| {
                let ev = Event::new("click", EventCategory::Pointer);
                black_box(host.dispatch(&mut registry, leaf, ev).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_trigger(c: &mut Criterion) {
    let mut group = c.benchmark_group("interaction/trigger");

    for anchors in [1_usize, 8, 32] {
        let mut host = HeadlessHost::new();
        let root = host.root();
        let nodes: Vec<_> = (0..anchors).map(|_| host.append(root, "li")).collect();
        let mut registry = registry();
        registry
            .interaction("")
            .id("replay")
            .on(["click", ":ping"])
            .anchors(nodes)
            .handler("noop")
            .enable(&mut host);
        group.throughput(Throughput::Elements(2 * anchors as u64));
        group.bench_function(BenchmarkId::new("anchors", anchors), |b| {
            b.iter(|| {
                registry
                    .trigger(&mut host, "replay", TriggerOptions::default())
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(2));
    targets = bench_delegated_dispatch, bench_fan_out, bench_trigger
}
criterion_main!(benches);
