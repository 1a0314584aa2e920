// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::{BoundingBox, BoundingSphere, Material};
use crate::ast::{BooleanKind, Vec3};
use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal
///
/// A zero normal marks the normal as not yet computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Vertex without a normal
    pub fn at(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
        }
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        if self.normal.norm_squared() == 0.0 {
            return;
        }
        // Transform normal (use inverse transpose for normals)
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        self.normal = normal_matrix
            .transform_vector(&self.normal)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros);
    }

    /// Linear interpolation towards `other`
    pub fn lerp(&self, other: &Vertex, t: f64) -> Vertex {
        Vertex {
            position: self.position + (other.position - self.position) * t,
            normal: self.normal + (other.normal - self.normal) * t,
        }
    }
}

/// Triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Indexed triangle geometry with optional precomputed bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    #[serde(skip)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip)]
    pub bounding_sphere: Option<BoundingSphere>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            bounding_box: None,
            bounding_sphere: None,
        }
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
            ..Self::new()
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Transform all vertices by a matrix; cached bounds are dropped
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for vertex in &mut self.vertices {
            vertex.transform(matrix);
        }
        self.bounding_box = None;
        self.bounding_sphere = None;
    }

    /// Compute bounding box, preferring the cached one
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
            .unwrap_or_else(|| BoundingBox::from_vertices(&self.vertices))
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Rough byte footprint: position + normal per vertex, three indices per triangle
    pub fn memory_estimate(&self) -> usize {
        self.vertices.len() * 6 * std::mem::size_of::<f32>()
            + self.triangles.len() * 3 * std::mem::size_of::<u32>()
    }

    /// True if any vertex still lacks a normal
    pub fn needs_normals(&self) -> bool {
        self.vertices.iter().any(|v| v.normal.norm_squared() == 0.0)
    }

    /// Check that every triangle references an existing vertex
    pub fn indices_in_bounds(&self) -> bool {
        let count = self.vertices.len();
        self.triangles
            .iter()
            .all(|t| t.indices.iter().all(|&i| i < count))
    }

    /// Recompute vertex normals from triangle geometry
    /// This calculates face normals and averages them at shared vertices
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let v0 = &self.vertices[triangle.indices[0]];
            let v1 = &self.vertices[triangle.indices[1]];
            let v2 = &self.vertices[triangle.indices[2]];

            // Unnormalized cross product weights each face by its area
            let face_normal = (v1.position - v0.position).cross(&(v2.position - v0.position));
            if face_normal.norm() > 1e-10 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = sum.try_normalize(1e-12).unwrap_or_else(Vector3::z);
        }
    }

    /// Precompute bounding box and sphere
    pub fn compute_bounds(&mut self) {
        self.bounding_box = Some(BoundingBox::from_vertices(&self.vertices));
        self.bounding_sphere = Some(BoundingSphere::from_vertices(&self.vertices));
    }

    /// Normals where missing, then bounds; returns whether normals were rebuilt
    pub fn optimize(&mut self) -> bool {
        let rebuilt = self.needs_normals();
        if rebuilt {
            self.recompute_normals();
        }
        self.compute_bounds();
        rebuilt
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters a mesh was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeometryParams {
    Box {
        width: f64,
        height: f64,
        depth: f64,
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
    /// Result of a boolean evaluation
    Csg { op: BooleanKind },
}

impl GeometryParams {
    pub fn type_name(&self) -> &'static str {
        match self {
            GeometryParams::Box { .. } => "box",
            GeometryParams::Sphere { .. } => "sphere",
            GeometryParams::Cylinder { .. } => "cylinder",
            GeometryParams::Csg { .. } => "csg",
        }
    }
}

/// Position / rotation (radians, applied X then Y then Z) / scale of a mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl LocalTransform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Compose translation * rotation * scale
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation.z);
        Matrix4::new_translation(&self.position)
            * (rz * ry * rx).to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

/// Geometry plus material and placement: the unit handed between stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub name: String,
    pub geometry: Mesh,
    pub params: GeometryParams,
    pub material: Material,
    pub transform: LocalTransform,
}

impl MeshBuffer {
    pub fn new(name: impl Into<String>, geometry: Mesh, params: GeometryParams) -> Self {
        Self {
            name: name.into(),
            geometry,
            params,
            material: Material::default(),
            transform: LocalTransform::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    /// Geometry with the local transform applied
    pub fn world_geometry(&self) -> Mesh {
        let mut mesh = self.geometry.clone();
        if !self.transform.is_identity() {
            mesh.transform(&self.transform.to_matrix());
        }
        mesh
    }

    /// Bounding box in parent space
    pub fn world_bounding_box(&self) -> BoundingBox {
        let local = self.geometry.bounding_box();
        if local.is_empty() || self.transform.is_identity() {
            return local;
        }
        let matrix = self.transform.to_matrix();
        BoundingBox::from_points(local.corners().iter().map(|c| matrix.transform_point(c)))
    }
}
