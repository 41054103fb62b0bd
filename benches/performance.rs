// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geoanchor::{Ellipsoid, GeoTransforms, Scene};
use nalgebra::{Matrix4, Vector3};

fn bench_conversions(c: &mut Criterion) {
    let ellipsoid = Ellipsoid::wgs84();
    let llh = Vector3::new(12.4923, 41.8902, 50.0);
    let ecef = ellipsoid.llh_to_ecef(&llh);

    let mut group = c.benchmark_group("conversions");
    group.bench_function("llh_to_ecef", |b| {
        b.iter(|| ellipsoid.llh_to_ecef(black_box(&llh)))
    });
    group.bench_function("ecef_to_llh", |b| {
        b.iter(|| ellipsoid.ecef_to_llh(black_box(&ecef)))
    });
    group.bench_function("geo_transforms_rebuild", |b| {
        b.iter(|| GeoTransforms::new(black_box(ellipsoid), black_box(llh)))
    });
    group.finish();
}

fn bench_anchor_moves(c: &mut Criterion) {
    let mut scene = Scene::new();
    let entity = scene.spawn_entity(Matrix4::identity());
    let anchor = scene.attach_anchor(entity).unwrap();
    scene.register_anchor(anchor).unwrap();

    let mut group = c.benchmark_group("anchor");
    group.bench_function("move_to_llh", |b| {
        let mut lon = 0.0;
        b.iter(|| {
            lon = (lon + 0.001_f64) % 180.0;
            scene
                .move_anchor_to_longitude_latitude_height(
                    anchor,
                    black_box(Vector3::new(lon, 45.0, 100.0)),
                )
                .unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_conversions, bench_anchor_moves);
criterion_main!(benches);
