//! Rig Hierarchy Benchmarks
//!
//! - Propagating a root edit down a long bone chain
//! - Resolving multi parent elements with many weighted parents
//! - Child cache rebuilds after structural edits

use std::hint::black_box;

use armature::{ElementKey, ElementWeight, RigHierarchy, Transform};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};

fn chain(len: usize) -> (RigHierarchy, Vec<ElementKey>) {
    let mut h = RigHierarchy::new();
    let mut keys = Vec::with_capacity(len);
    let mut parent = None;
    for i in 0..len {
        let local = Transform::new(Vec3::new(0.0, 0.1, 0.0), Quat::from_rotation_z(0.01), Vec3::ONE);
        let key = h.add_bone(&format!("bone_{i}"), parent, local, false).unwrap();
        keys.push(key);
        parent = Some(key);
    }
    (h, keys)
}

fn bench_chain_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_propagation");
    for len in [16, 128, 1024] {
        let (mut h, keys) = chain(len);
        h.settings_mut().ensure_cache_validity = false;
        let root = keys[0];
        let tip = keys[len - 1];
        let mut x = 0.0_f32;

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                x += 0.001;
                h.set_local_transform(&root, &Transform::from_translation(Vec3::new(x, 0.0, 0.0)), false, true)
                    .unwrap();
                black_box(h.get_global_transform(&tip, false));
            });
        });
    }
    group.finish();
}

fn bench_multi_parent_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_parent_solve");
    for parents in [2, 4, 16] {
        let mut h = RigHierarchy::new();
        h.settings_mut().ensure_cache_validity = false;
        let mut spaces = Vec::new();
        for i in 0..parents {
            let t = Transform::new(Vec3::new(i as f32, 0.0, 0.0), Quat::from_rotation_y(i as f32 * 0.1), Vec3::ONE);
            spaces.push(h.add_bone(&format!("space_{i}"), None, t, true).unwrap());
        }
        let null = h.add_null("null", Some(spaces[0]), Transform::IDENTITY, false).unwrap();
        for space in &spaces[1..] {
            h.add_parent(&null, space, ElementWeight::FULL, false, None).unwrap();
        }
        let first = spaces[0];
        let mut y = 0.0_f32;

        group.bench_with_input(BenchmarkId::from_parameter(parents), &parents, |b, _| {
            b.iter(|| {
                y += 0.001;
                h.set_global_transform(&first, &Transform::from_translation(Vec3::new(0.0, y, 0.0)), false, true)
                    .unwrap();
                black_box(h.get_global_transform(&null, false));
            });
        });
    }
    group.finish();
}

fn bench_child_cache(c: &mut Criterion) {
    let (mut h, keys) = chain(512);
    let root = keys[0];
    c.bench_function("child_cache_rebuild_512", |b| {
        b.iter(|| {
            h.increment_topology_version();
            black_box(h.get_children(&root, true).len());
        });
    });
}

criterion_group!(benches, bench_chain_propagation, bench_multi_parent_solve, bench_child_cache);
criterion_main!(benches);
