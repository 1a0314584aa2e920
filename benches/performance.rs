// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;
use polyframe_scene::config::{CsgConfig, PipelineConfig};
use polyframe_scene::geometry::{build_cube, build_cylinder, build_sphere, BooleanService};
use polyframe_scene::{render, BooleanKind, Pipeline, ScadParser};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let simple = "cube([10, 10, 10]);";
    group.bench_with_input(BenchmarkId::new("simple_cube", ""), &simple, |b, source| {
        b.iter(|| polyframe_scene::io::parse_scad(black_box(source)).unwrap());
    });

    let complex = r#"
        size = 20;
        difference() {
            cube([size, size, size]);
            translate([10, 10, 10])
                sphere(r=15);
        }
    "#;
    group.bench_with_input(BenchmarkId::new("complex", ""), &complex, |b, source| {
        b.iter(|| polyframe_scene::io::parse_scad(black_box(source)).unwrap());
    });

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    group.bench_function("cube", |b| {
        b.iter(|| build_cube(black_box(Vector3::new(10.0, 10.0, 10.0)), false).unwrap());
    });

    for segments in [32u32, 64] {
        group.bench_with_input(BenchmarkId::new("sphere", segments), &segments, |b, &segments| {
            b.iter(|| build_sphere(black_box(10.0), segments).unwrap());
        });
    }

    group.bench_function("cylinder", |b| {
        b.iter(|| build_cylinder(black_box(5.0), black_box(5.0), black_box(20.0), 32).unwrap());
    });

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    group.bench_function("cube", |b| {
        b.iter(|| render(black_box("cube([10, 10, 10]);")).unwrap());
    });

    group.bench_function("sphere", |b| {
        b.iter(|| render(black_box("sphere(r=10);")).unwrap());
    });

    group.bench_function("transform", |b| {
        b.iter(|| {
            render(black_box("translate([5, 0, 0]) rotate([0, 45, 0]) cube([10, 10, 10]);")).unwrap()
        });
    });

    group.bench_function("union", |b| {
        b.iter(|| render(black_box("union() { cube(10); translate([8, 0, 0]) cube(10); }")).unwrap());
    });

    let source = "difference() { cube(10, center=true); sphere(6, $fn=24); }";
    let mut pipeline = Pipeline::new(ScadParser, PipelineConfig::default());
    pipeline.process_source(source, None).unwrap();
    group.bench_function("cached", |b| {
        b.iter(|| pipeline.process_source(black_box(source), None).unwrap());
    });

    group.finish();
}

fn bench_boolean_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean_ops");

    let cube1 = build_cube(Vector3::new(10.0, 10.0, 10.0), false).unwrap();
    let mut cube2 = build_cube(Vector3::new(8.0, 8.0, 8.0), false).unwrap();
    cube2.transform.position = Vector3::new(5.0, 5.0, 5.0);
    let operands = [cube1, cube2];

    let uncached = CsgConfig {
        enable_cache: false,
        ..CsgConfig::default()
    };

    for kind in [BooleanKind::Union, BooleanKind::Difference, BooleanKind::Intersection] {
        let mut service = BooleanService::new(uncached.clone());
        group.bench_function(kind.as_str(), |b| {
            b.iter(|| service.evaluate(black_box(kind), black_box(&operands)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_primitives,
    bench_render,
    bench_boolean_ops
);
criterion_main!(benches);
