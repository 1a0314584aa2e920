// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end pipeline scenarios

use approx::assert_relative_eq;
use polyframe_scene::ast::{AstVisitor, Vec3};
use polyframe_scene::config::PipelineConfig;
use polyframe_scene::geometry::GeometryParams;
use polyframe_scene::pipeline::{ProgressEvent, Stage};
use polyframe_scene::scene::SceneAssembler;
use polyframe_scene::{Node, ParseError, Pipeline, ScadParser, SourceParser};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Parses to a difference with a single operand, which the visitor always rejects
struct AlwaysInvalid {
    calls: Arc<AtomicUsize>,
}

impl SourceParser for AlwaysInvalid {
    fn parse(&self, _source: &str) -> Result<Vec<Node>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Node::difference(vec![Node::cube(Vec3::repeat(1.0), false)])])
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn cube_keeps_box_parameters() {
    let mut visitor = AstVisitor::default();
    let mesh = visitor.visit(&Node::cube(Vec3::new(2.0, 3.0, 4.0), false)).unwrap();
    assert_eq!(
        mesh.params,
        GeometryParams::Box {
            width: 2.0,
            height: 3.0,
            depth: 4.0
        }
    );
}

#[test]
fn rotate_converts_degrees_to_radians() {
    let mut visitor = AstVisitor::default();
    let node = Node::rotate(
        Vec3::new(90.0, 45.0, 0.0),
        Node::cube(Vec3::repeat(1.0), false),
    );
    let mesh = visitor.visit(&node).unwrap();
    assert_relative_eq!(mesh.transform.rotation.x, PI / 2.0, epsilon = 1e-12);
    assert_relative_eq!(mesh.transform.rotation.y, PI / 4.0, epsilon = 1e-12);
    assert_relative_eq!(mesh.transform.rotation.z, 0.0, epsilon = 1e-12);
}

#[test]
fn unchanged_source_is_served_from_cache() {
    let mut pipeline = Pipeline::new(ScadParser, PipelineConfig::default());
    let source = "translate([1, 2, 3]) sphere(r = 2);";

    let first = pipeline.process_source(source, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let second = pipeline.process_source(source, Some(&tx)).unwrap();
    let events = drain(&mut rx);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stage, Stage::Complete);
    assert_eq!(events[0].progress, 100);
    assert_eq!(events[0].message, "Retrieved from cache");
    assert_eq!(second.scene, first.scene);
    assert_eq!(pipeline.cache_stats().counters.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_after_max_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let parser = AlwaysInvalid {
        calls: calls.clone(),
    };
    let mut config = PipelineConfig::default();
    config.retry.max_retries = 2;
    config.retry.base_delay_ms = 250;
    let mut pipeline = Pipeline::new(parser, config);

    let started = tokio::time::Instant::now();
    let err = pipeline.process_with_retry("difference() cube(1);", None).await.unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(err.to_string().contains("after 2 attempts"), "{}", err);
    assert_eq!(err.failed_stage(), Some(Stage::AstProcessing));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[test]
fn assembled_stats_match_inputs() {
    let mut visitor = AstVisitor::default();
    let a = visitor.visit(&Node::cube(Vec3::repeat(2.0), true)).unwrap();
    let b = visitor
        .visit(&Node::translate(Vec3::new(5.0, 0.0, 0.0), Node::sphere(1.0)))
        .unwrap();

    let (scene, camera) = SceneAssembler::default()
        .assemble_with_camera(&[a.clone(), b.clone()])
        .unwrap();
    let stats = SceneAssembler::stats(&scene);

    assert_eq!(stats.mesh_count, 2);
    assert_eq!(stats.vertex_count, a.vertex_count() + b.vertex_count());
    assert!(camera.distance() > 0.0);
}

#[test]
fn dispose_is_idempotent() {
    let mut pipeline = Pipeline::new(ScadParser, PipelineConfig::default());
    pipeline.process_source("cube(1);", None).unwrap();
    assert_eq!(pipeline.cache_stats().size, 1);

    pipeline.dispose();
    assert_eq!(pipeline.cache_stats().size, 0);
    pipeline.dispose();
    assert_eq!(pipeline.cache_stats().size, 0);

    // Still usable afterwards
    pipeline.process_source("cube(1);", None).unwrap();
}

#[test]
fn degraded_boolean_is_reported() {
    let mut config = PipelineConfig::default();
    config.visitor.enable_csg = false;
    let mut pipeline = Pipeline::new(ScadParser, config);

    let output = pipeline
        .process_source("difference() { cube(4, center = true); sphere(1); }", None)
        .unwrap();

    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.metrics.degraded_nodes, 1);
    assert_eq!(output.scene.meshes.len(), 1);
    assert_eq!(output.scene.meshes[0].name, "cube_1_16");
}
