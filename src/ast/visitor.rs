// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST visitor - converts AST nodes to mesh buffers

use super::{BooleanKind, Node, NodeKind, Primitive, TransformOp};
use crate::config::{CsgConfig, VisitorConfig};
use crate::error::{ConversionError, ConversionResult};
use crate::geometry::{
    build_cube, build_cylinder, build_sphere, BooleanKernel, BooleanService, BooleanStats,
    BspKernel, MeshBuffer,
};
use crate::metrics::ProcessingMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Why a boolean node returned its first child instead of a CSG result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradationReason {
    CsgDisabled,
    Unsupported,
    OperationFailed,
}

/// A boolean node whose result is not the real boolean of its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    pub node: String,
    pub op: BooleanKind,
    pub reason: DegradationReason,
    pub message: String,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fell back to its first child ({:?}): {}",
            self.node, self.reason, self.message
        )
    }
}

/// Walks AST nodes and produces mesh buffers
pub struct AstVisitor<K: BooleanKernel = BspKernel> {
    config: VisitorConfig,
    booleans: BooleanService<K>,
    metrics: ProcessingMetrics,
    warnings: Vec<Degradation>,
    produced: usize,
    depth: usize,
}

impl AstVisitor<BspKernel> {
    pub fn new(config: VisitorConfig, csg: CsgConfig) -> Self {
        Self::with_service(config, BooleanService::new(csg))
    }
}

impl Default for AstVisitor<BspKernel> {
    fn default() -> Self {
        Self::new(VisitorConfig::default(), CsgConfig::default())
    }
}

impl<K: BooleanKernel> AstVisitor<K> {
    pub fn with_service(config: VisitorConfig, booleans: BooleanService<K>) -> Self {
        Self {
            config,
            booleans,
            metrics: ProcessingMetrics::default(),
            warnings: Vec::new(),
            produced: 0,
            depth: 0,
        }
    }

    /// Visit a node that may be absent
    pub fn visit_optional(&mut self, node: Option<&Node>) -> ConversionResult<MeshBuffer> {
        match node {
            Some(node) => self.visit(node),
            None => {
                self.metrics.total_nodes += 1;
                self.metrics.failed_nodes += 1;
                Err(ConversionError::validation("invalid node: no node given"))
            }
        }
    }

    /// Convert `node` and its subtree into a single mesh
    pub fn visit(&mut self, node: &Node) -> ConversionResult<MeshBuffer> {
        let started = Instant::now();
        self.metrics.total_nodes += 1;
        self.depth += 1;

        let result = match &node.kind {
            NodeKind::Primitive(primitive) => self.visit_primitive(node, primitive),
            NodeKind::Boolean { op, children } => self.visit_boolean(node, *op, children),
            NodeKind::Transform { op, children } => self.visit_transform(op, children),
        };

        self.depth -= 1;
        match result {
            Ok(ref mesh) => {
                self.metrics.processed_nodes += 1;
                self.produced += 1;
                if self.depth == 0 {
                    self.metrics.memory_estimate += mesh.geometry.memory_estimate();
                }
            }
            Err(ref e) => {
                self.metrics.failed_nodes += 1;
                log::debug!("{} node {} failed: {}", node.kind.type_name(), label(node), e);
            }
        }
        // Nested visits are included in their parent's time
        if self.depth == 0 {
            self.metrics.processing_time_ms += started.elapsed().as_secs_f64() * 1000.0;
        }

        result
    }

    fn visit_primitive(&mut self, node: &Node, primitive: &Primitive) -> ConversionResult<MeshBuffer> {
        let resolution = |segments: u32| {
            if segments > 0 {
                segments
            } else {
                self.config.segments
            }
        };

        let mut mesh = match *primitive {
            Primitive::Cube { size, center } => build_cube(size, center)?,
            Primitive::Sphere { radius, segments } => build_sphere(radius, resolution(segments))?,
            Primitive::Cylinder {
                radius_top,
                radius_bottom,
                height,
                segments,
            } => build_cylinder(radius_top, radius_bottom, height, resolution(segments))?,
        };

        mesh.name = mesh_name(node);
        mesh.material = self.config.default_material.clone();
        Ok(mesh)
    }

    fn visit_boolean(
        &mut self,
        node: &Node,
        op: BooleanKind,
        children: &[Node],
    ) -> ConversionResult<MeshBuffer> {
        let mut survivors = Vec::with_capacity(children.len());
        let mut child_errors = Vec::new();
        for (index, child) in children.iter().enumerate() {
            match self.visit(child) {
                Ok(mesh) => survivors.push(mesh),
                Err(e) => child_errors.push(format!("child {}: {}", index, e)),
            }
        }

        let required = op.min_operands();
        if survivors.len() < required {
            let quantity = if required == 1 { "one" } else { "two" };
            let mut message = format!(
                "{} requires at least {} valid children, got {}",
                op,
                quantity,
                survivors.len()
            );
            if !child_errors.is_empty() {
                message.push_str(&format!(" ({})", child_errors.join("; ")));
            }
            return Err(ConversionError::validation(message));
        }
        if !child_errors.is_empty() {
            log::warn!(
                "{} at {} dropped {} failed children: {}",
                op,
                label(node),
                child_errors.len(),
                child_errors.join("; ")
            );
        }

        if survivors.len() == 1 {
            return Ok(survivors.remove(0));
        }

        let degraded = if !self.config.enable_csg {
            Some((DegradationReason::CsgDisabled, "CSG evaluation is disabled".to_string()))
        } else if !self.booleans.supports(op) {
            Some((
                DegradationReason::Unsupported,
                format!("{} is not supported by the boolean kernel", op),
            ))
        } else {
            match self.booleans.evaluate(op, &survivors) {
                Ok(mut result) => {
                    result.name = mesh_name(node);
                    return Ok(result);
                }
                Err(e) => Some((DegradationReason::OperationFailed, e.to_string())),
            }
        };

        if let Some((reason, message)) = degraded {
            let warning = Degradation {
                node: label(node),
                op,
                reason,
                message,
            };
            log::warn!("{}", warning);
            self.metrics.degraded_nodes += 1;
            self.warnings.push(warning);
        }
        Ok(survivors.swap_remove(0))
    }

    fn visit_transform(&mut self, op: &TransformOp, children: &[Node]) -> ConversionResult<MeshBuffer> {
        let child = match children {
            [child] => child,
            _ => {
                return Err(ConversionError::validation(format!(
                    "{} requires exactly one child, got {}",
                    op.type_name(),
                    children.len()
                )))
            }
        };

        let mut mesh = self.visit(child)?;
        match *op {
            TransformOp::Translate(v) => mesh.transform.position += v,
            TransformOp::Rotate(degrees) => {
                mesh.transform.rotation = degrees.map(f64::to_radians);
            }
            TransformOp::Scale(v) => {
                mesh.transform.scale.component_mul_assign(&v);
            }
        }
        Ok(mesh)
    }

    pub fn metrics(&self) -> &ProcessingMetrics {
        &self.metrics
    }

    pub fn boolean_stats(&self) -> BooleanStats {
        self.booleans.stats()
    }

    /// Degradations recorded since the last call
    pub fn take_warnings(&mut self) -> Vec<Degradation> {
        std::mem::take(&mut self.warnings)
    }

    /// Number of meshes produced since the last release
    pub fn tracked_meshes(&self) -> usize {
        self.produced
    }

    /// Forget produced meshes and reset metrics for the next run
    pub fn release(&mut self) {
        self.produced = 0;
        self.metrics = ProcessingMetrics::default();
        self.warnings.clear();
    }

    /// Also drops cached boolean results
    pub fn dispose(&mut self) {
        self.release();
        self.booleans.clear_cache();
    }
}

fn label(node: &Node) -> String {
    match node.location {
        Some(loc) => format!("{}@{}:{}", node.kind.type_name(), loc.line, loc.column),
        None => node.kind.type_name().to_string(),
    }
}

/// `{type}_{line}_{column}`, with 0 for an unknown location
fn mesh_name(node: &Node) -> String {
    let (line, column) = node
        .location
        .map(|loc| (loc.line, loc.column))
        .unwrap_or((0, 0));
    format!("{}_{}_{}", node.kind.type_name(), line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Vec3;
    use crate::geometry::csg::{KernelError, Solid};
    use crate::geometry::{GeometryParams, Mesh};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn cube(size: f64) -> Node {
        Node::cube(Vec3::new(size, size, size), false)
    }

    #[test]
    fn test_cube_parameters_preserved() {
        let mut visitor = AstVisitor::default();
        let node = Node::at(
            NodeKind::Primitive(Primitive::Cube {
                size: Vec3::new(2.0, 3.0, 4.0),
                center: false,
            }),
            3,
            5,
        );
        let mesh = visitor.visit(&node).unwrap();
        assert_eq!(
            mesh.params,
            GeometryParams::Box {
                width: 2.0,
                height: 3.0,
                depth: 4.0
            }
        );
        assert_eq!(mesh.name, "cube_3_5");
        assert_eq!(mesh.material, VisitorConfig::default().default_material);
    }

    #[test]
    fn test_sphere_uses_configured_segments() {
        let config = VisitorConfig {
            segments: 12,
            ..VisitorConfig::default()
        };
        let mut visitor = AstVisitor::new(config, CsgConfig::default());
        let mesh = visitor.visit(&Node::sphere(2.5)).unwrap();
        assert_eq!(
            mesh.params,
            GeometryParams::Sphere {
                radius: 2.5,
                segments: 12
            }
        );
        assert_eq!(mesh.name, "sphere_0_0");
    }

    #[test]
    fn test_single_child_union_is_passthrough() {
        let mut visitor = AstVisitor::default();
        let child = visitor.visit(&cube(3.0)).unwrap();
        let mesh = visitor.visit(&Node::union(vec![cube(3.0)])).unwrap();
        assert_eq!(mesh, child);
        assert!(visitor.take_warnings().is_empty());
    }

    #[test]
    fn test_difference_needs_two_children() {
        let mut visitor = AstVisitor::default();
        let err = visitor.visit(&Node::difference(vec![cube(1.0)])).unwrap_err();
        assert!(err.to_string().contains("at least two"));

        let err = visitor.visit(&Node::intersection(vec![])).unwrap_err();
        assert!(err.to_string().contains("at least two"));
    }

    #[test]
    fn test_empty_union_fails() {
        let mut visitor = AstVisitor::default();
        let err = visitor.visit(&Node::union(vec![])).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_failed_children_are_dropped() {
        let mut visitor = AstVisitor::default();
        let bad = Node::sphere(-1.0);
        let mesh = visitor
            .visit(&Node::union(vec![bad, cube(2.0)]))
            .unwrap();
        assert!(mesh.name.starts_with("cube"));
        assert_eq!(visitor.metrics().failed_nodes, 1);
        assert_eq!(visitor.metrics().total_nodes, 3);
        assert_eq!(visitor.metrics().processed_nodes, 2);
    }

    #[test]
    fn test_difference_with_transforms() {
        // difference() { cube(20); translate([10,0,0]) sphere(5); }
        let mut visitor = AstVisitor::default();
        let tree = Node::difference(vec![
            cube(20.0),
            Node::translate(Vec3::new(10.0, 0.0, 0.0), Node::sphere(5.0)),
        ]);
        let mesh = visitor.visit(&tree).unwrap();
        assert!(mesh.vertex_count() > 0);
        assert_eq!(mesh.params, GeometryParams::Csg { op: BooleanKind::Difference });
        assert!(visitor.take_warnings().is_empty());
        assert_eq!(visitor.boolean_stats().succeeded, 1);
    }

    #[test]
    fn test_rotation_converted_to_radians() {
        let mut visitor = AstVisitor::default();
        let mesh = visitor
            .visit(&Node::rotate(Vec3::new(90.0, 45.0, 0.0), cube(1.0)))
            .unwrap();
        assert_relative_eq!(mesh.transform.rotation.x, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(mesh.transform.rotation.y, FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(mesh.transform.rotation.z, 0.0);
    }

    #[test]
    fn test_translate_and_scale_compose() {
        let mut visitor = AstVisitor::default();
        let tree = Node::translate(
            Vec3::new(1.0, 2.0, 3.0),
            Node::translate(
                Vec3::new(1.0, 0.0, 0.0),
                Node::scale(Vec3::new(2.0, 3.0, 4.0), Node::scale(Vec3::new(0.5, 1.0, 1.0), cube(1.0))),
            ),
        );
        let mesh = visitor.visit(&tree).unwrap();
        assert_eq!(mesh.transform.position, Vec3::new(2.0, 2.0, 3.0));
        assert_eq!(mesh.transform.scale, Vec3::new(1.0, 3.0, 4.0));
        assert_eq!(mesh.vertex_count(), 24);
    }

    #[test]
    fn test_transform_requires_one_child() {
        let mut visitor = AstVisitor::default();
        let node = Node::new(NodeKind::Transform {
            op: TransformOp::Translate(Vec3::zeros()),
            children: vec![cube(1.0), cube(2.0)],
        });
        let err = visitor.visit(&node).unwrap_err();
        assert!(err.to_string().contains("exactly one child"));
    }

    #[test]
    fn test_absent_node_is_invalid() {
        let mut visitor = AstVisitor::default();
        let err = visitor.visit_optional(None).unwrap_err();
        assert!(err.to_string().contains("invalid node"));
        assert_eq!(visitor.metrics().failed_nodes, 1);
    }

    #[test]
    fn test_csg_disabled_degrades_to_first_child() {
        let config = VisitorConfig {
            enable_csg: false,
            ..VisitorConfig::default()
        };
        let mut visitor = AstVisitor::new(config, CsgConfig::default());
        let mesh = visitor
            .visit(&Node::union(vec![cube(1.0), cube(2.0)]))
            .unwrap();
        assert_eq!(mesh.params, GeometryParams::Box { width: 1.0, height: 1.0, depth: 1.0 });

        let warnings = visitor.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].reason, DegradationReason::CsgDisabled);
        assert_eq!(visitor.metrics().degraded_nodes, 1);
    }

    struct UnionOnly;

    impl BooleanKernel for UnionOnly {
        type Solid = Solid;

        fn from_mesh(&self, mesh: &MeshBuffer) -> Result<Solid, KernelError> {
            BspKernel::new().from_mesh(mesh)
        }

        fn union(&self, a: &Solid, b: &Solid) -> Result<Solid, KernelError> {
            BspKernel::new().union(a, b)
        }

        fn subtract(&self, _a: &Solid, _b: &Solid) -> Result<Solid, KernelError> {
            Err(KernelError("subtract unavailable".into()))
        }

        fn intersect(&self, _a: &Solid, _b: &Solid) -> Result<Solid, KernelError> {
            Err(KernelError("intersect unavailable".into()))
        }

        fn to_mesh(&self, solid: &Solid) -> Result<Mesh, KernelError> {
            BspKernel::new().to_mesh(solid)
        }

        fn supports(&self, kind: BooleanKind) -> bool {
            kind == BooleanKind::Union
        }
    }

    #[test]
    fn test_unsupported_operator_degrades() {
        let service = BooleanService::with_kernel(UnionOnly, CsgConfig::default());
        let mut visitor = AstVisitor::with_service(VisitorConfig::default(), service);

        let mesh = visitor
            .visit(&Node::intersection(vec![cube(1.0), cube(2.0)]))
            .unwrap();
        assert_eq!(mesh.name, "cube_0_0");
        assert_eq!(visitor.take_warnings()[0].reason, DegradationReason::Unsupported);

        let mesh = visitor
            .visit(&Node::union(vec![cube(1.0), cube(2.0)]))
            .unwrap();
        assert_eq!(mesh.name, "union_0_0");
    }

    #[test]
    fn test_failed_operation_degrades() {
        let mut visitor = AstVisitor::default();
        // Disjoint intersection leaves nothing behind
        let tree = Node::intersection(vec![
            cube(1.0),
            Node::translate(Vec3::new(10.0, 0.0, 0.0), cube(1.0)),
        ]);
        let mesh = visitor.visit(&tree).unwrap();
        assert_eq!(mesh.transform.position, Vec3::zeros());
        let warnings = visitor.take_warnings();
        assert_eq!(warnings[0].reason, DegradationReason::OperationFailed);
        assert!(warnings[0].message.contains("empty solid"));
    }

    #[test]
    fn test_release_resets_tracking() {
        let mut visitor = AstVisitor::default();
        visitor
            .visit(&Node::translate(Vec3::new(1.0, 0.0, 0.0), cube(1.0)))
            .unwrap();
        assert_eq!(visitor.tracked_meshes(), 2);
        assert!(visitor.metrics().memory_estimate > 0);
        visitor.release();
        assert_eq!(visitor.tracked_meshes(), 0);
        assert_eq!(visitor.metrics(), &ProcessingMetrics::default());
    }
}
