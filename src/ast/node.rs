// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST Node definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// 3D Vector type alias
pub type Vec3 = nalgebra::Vector3<f64>;

/// Position of a node in the source text (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// AST Node representing a single operation or primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: NodeKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            location: Some(SourceLocation::new(line, column)),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// `cube(size, center)`
    pub fn cube(size: Vec3, center: bool) -> Self {
        Self::new(NodeKind::Primitive(Primitive::Cube { size, center }))
    }

    /// `sphere(r)`; segments of 0 defer to the configured resolution
    pub fn sphere(radius: f64) -> Self {
        Self::new(NodeKind::Primitive(Primitive::Sphere {
            radius,
            segments: 0,
        }))
    }

    /// `cylinder(h, r1, r2)`
    pub fn cylinder(height: f64, radius_bottom: f64, radius_top: f64) -> Self {
        Self::new(NodeKind::Primitive(Primitive::Cylinder {
            radius_top,
            radius_bottom,
            height,
            segments: 0,
        }))
    }

    pub fn boolean(op: BooleanKind, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Boolean { op, children })
    }

    pub fn union(children: Vec<Node>) -> Self {
        Self::boolean(BooleanKind::Union, children)
    }

    pub fn difference(children: Vec<Node>) -> Self {
        Self::boolean(BooleanKind::Difference, children)
    }

    pub fn intersection(children: Vec<Node>) -> Self {
        Self::boolean(BooleanKind::Intersection, children)
    }

    pub fn transform(op: TransformOp, child: Node) -> Self {
        Self::new(NodeKind::Transform {
            op,
            children: vec![child],
        })
    }

    pub fn translate(v: Vec3, child: Node) -> Self {
        Self::transform(TransformOp::Translate(v), child)
    }

    pub fn rotate(degrees: Vec3, child: Node) -> Self {
        Self::transform(TransformOp::Rotate(degrees), child)
    }

    pub fn scale(v: Vec3, child: Node) -> Self {
        Self::transform(TransformOp::Scale(v), child)
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self
            .kind
            .children()
            .iter()
            .map(|child| child.count())
            .sum::<usize>()
    }
}

/// Types of AST nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Primitive(Primitive),

    Boolean { op: BooleanKind, children: Vec<Node> },

    // The parser may hand over zero or several children; the visitor rejects
    // anything other than exactly one.
    Transform { op: TransformOp, children: Vec<Node> },
}

impl NodeKind {
    pub fn children(&self) -> &[Node] {
        match self {
            NodeKind::Primitive(_) => &[],
            NodeKind::Boolean { children, .. } | NodeKind::Transform { children, .. } => children,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Primitive(p) => p.type_name(),
            NodeKind::Boolean { op, .. } => op.as_str(),
            NodeKind::Transform { op, .. } => op.type_name(),
        }
    }
}

/// Primitive solids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Cube {
        size: Vec3,
        center: bool,
    },
    Sphere {
        radius: f64,
        segments: u32,
    },
    Cylinder {
        radius_top: f64,
        radius_bottom: f64,
        height: f64,
        segments: u32,
    },
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Cube { .. } => "cube",
            Primitive::Sphere { .. } => "sphere",
            Primitive::Cylinder { .. } => "cylinder",
        }
    }
}

/// Boolean operators over two or more solids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanKind {
    Union,
    Difference,
    Intersection,
}

impl BooleanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanKind::Union => "union",
            BooleanKind::Difference => "difference",
            BooleanKind::Intersection => "intersection",
        }
    }

    /// Smallest operand count the operator accepts
    pub fn min_operands(&self) -> usize {
        match self {
            BooleanKind::Union => 1,
            BooleanKind::Difference | BooleanKind::Intersection => 2,
        }
    }
}

impl fmt::Display for BooleanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transformation operations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    Translate(Vec3),
    /// Euler angles in degrees
    Rotate(Vec3),
    Scale(Vec3),
}

impl TransformOp {
    pub fn type_name(&self) -> &'static str {
        match self {
            TransformOp::Translate(_) => "translate",
            TransformOp::Rotate(_) => "rotate",
            TransformOp::Scale(_) => "scale",
        }
    }

    pub fn vector(&self) -> Vec3 {
        match self {
            TransformOp::Translate(v) | TransformOp::Rotate(v) | TransformOp::Scale(v) => *v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_count() {
        let tree = Node::difference(vec![
            Node::cube(Vec3::new(10.0, 10.0, 10.0), false),
            Node::translate(Vec3::new(5.0, 0.0, 0.0), Node::sphere(4.0)),
        ]);
        assert_eq!(tree.count(), 4);
        assert_eq!(tree.kind.type_name(), "difference");
    }

    #[test]
    fn test_ast_json_roundtrip() {
        let tree = Node::at(
            NodeKind::Primitive(Primitive::Cube {
                size: Vec3::new(2.0, 3.0, 4.0),
                center: true,
            }),
            1,
            1,
        );
        let json = serde_json::to_string(&tree).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
    }
}
