// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP trees
//!
//! Solids are polygon soups. Each boolean builds a BSP tree per operand,
//! clips the trees against each other and collects the surviving polygons.

use super::{Mesh, MeshBuffer, Triangle, Vertex};
use crate::ast::BooleanKind;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Tolerance used to classify points against planes
const EPSILON: f64 = 1e-5;

/// Failure inside a boolean kernel
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct KernelError(pub String);

/// Boundary-representation kernel consumed by the boolean service
pub trait BooleanKernel {
    type Solid: Clone;

    /// Convert a mesh (local transform baked in) into a solid
    fn from_mesh(&self, mesh: &MeshBuffer) -> Result<Self::Solid, KernelError>;

    fn union(&self, a: &Self::Solid, b: &Self::Solid) -> Result<Self::Solid, KernelError>;

    fn subtract(&self, a: &Self::Solid, b: &Self::Solid) -> Result<Self::Solid, KernelError>;

    fn intersect(&self, a: &Self::Solid, b: &Self::Solid) -> Result<Self::Solid, KernelError>;

    fn to_mesh(&self, solid: &Self::Solid) -> Result<Mesh, KernelError>;

    /// Whether the kernel can evaluate `kind` at all
    fn supports(&self, _kind: BooleanKind) -> bool {
        true
    }

    fn apply(
        &self,
        kind: BooleanKind,
        a: &Self::Solid,
        b: &Self::Solid,
    ) -> Result<Self::Solid, KernelError> {
        match kind {
            BooleanKind::Union => self.union(a, b),
            BooleanKind::Difference => self.subtract(a, b),
            BooleanKind::Intersection => self.intersect(a, b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    /// `None` for collinear or coincident points
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(1e-12)?;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.w
    }

    /// Split `polygon` by this plane into the four output buckets
    fn split_polygon(
        &self,
        polygon: &Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        const COPLANAR: u8 = 0;
        const FRONT: u8 = 1;
        const BACK: u8 = 2;
        const SPANNING: u8 = 3;

        let mut polygon_type = COPLANAR;
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| {
                let t = self.distance(&v.position);
                let vertex_type = if t < -EPSILON {
                    BACK
                } else if t > EPSILON {
                    FRONT
                } else {
                    COPLANAR
                };
                polygon_type |= vertex_type;
                vertex_type
            })
            .collect();

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon.clone());
                } else {
                    coplanar_back.push(polygon.clone());
                }
            }
            FRONT => front.push(polygon.clone()),
            BACK => back.push(polygon.clone()),
            _ => {
                debug_assert_eq!(polygon_type, SPANNING);
                let count = polygon.vertices.len();
                let mut f = Vec::with_capacity(count + 1);
                let mut b = Vec::with_capacity(count + 1);
                for i in 0..count {
                    let j = (i + 1) % count;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (&polygon.vertices[i], &polygon.vertices[j]);
                    if ti != BACK {
                        f.push(*vi);
                    }
                    if ti != FRONT {
                        b.push(*vi);
                    }
                    if (ti | tj) == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.position.coords))
                            / self.normal.dot(&(vj.position - vi.position));
                        let v = vi.lerp(vj, t);
                        f.push(v);
                        b.push(v);
                    }
                }
                if let Some(p) = Polygon::with_plane(f, polygon.plane) {
                    front.push(p);
                }
                if let Some(p) = Polygon::with_plane(b, polygon.plane) {
                    back.push(p);
                }
            }
        }
    }
}

/// Convex planar polygon
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vertex>,
    plane: Plane,
}

impl Polygon {
    /// `None` when the vertices do not span a plane
    pub fn new(vertices: Vec<Vertex>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(
            &vertices[0].position,
            &vertices[1].position,
            &vertices[2].position,
        )?;
        Some(Self { vertices, plane })
    }

    fn with_plane(vertices: Vec<Vertex>, plane: Plane) -> Option<Self> {
        (vertices.len() >= 3).then_some(Self { vertices, plane })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        for v in &mut self.vertices {
            v.normal = -v.normal;
        }
        self.plane.flip();
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// BSP tree node for CSG operations
#[derive(Debug, Clone, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }

        // First polygon's plane becomes the splitter
        let plane = *self.plane.get_or_insert(polygons[0].plane);

        let mut front_polys = Vec::new();
        let mut back_polys = Vec::new();
        for poly in &polygons {
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            plane.split_polygon(
                poly,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front_polys,
                &mut back_polys,
            );
            self.polygons.append(&mut coplanar_front);
            self.polygons.append(&mut coplanar_back);
        }

        if !front_polys.is_empty() {
            self.front
                .get_or_insert_with(Box::default)
                .build(front_polys);
        }
        if !back_polys.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back_polys);
        }
    }

    fn invert(&mut self) {
        for poly in &mut self.polygons {
            poly.flip();
        }
        if let Some(ref mut plane) = self.plane {
            plane.flip();
        }
        if let Some(ref mut front) = self.front {
            front.invert();
        }
        if let Some(ref mut back) = self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` that lie inside this tree
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        for poly in &polygons {
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            plane.split_polygon(
                poly,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);
        }

        let mut result = match self.front {
            Some(ref node) => node.clip_polygons(front),
            None => front,
        };
        if let Some(ref node) = self.back {
            result.extend(node.clip_polygons(back));
        }
        result
    }

    fn clip_to(&mut self, bsp: &BspNode) {
        self.polygons = bsp.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(ref mut front) = self.front {
            front.clip_to(bsp);
        }
        if let Some(ref mut back) = self.back {
            back.clip_to(bsp);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = self.polygons.clone();
        if let Some(ref front) = self.front {
            result.extend(front.all_polygons());
        }
        if let Some(ref back) = self.back {
            result.extend(back.all_polygons());
        }
        result
    }
}

/// Polygon-soup solid produced by [`BspKernel`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    polygons: Vec<Polygon>,
}

impl Solid {
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Binary space partition boolean kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct BspKernel;

impl BspKernel {
    pub fn new() -> Self {
        Self
    }
}

impl BooleanKernel for BspKernel {
    type Solid = Solid;

    fn from_mesh(&self, mesh: &MeshBuffer) -> Result<Solid, KernelError> {
        let geometry = mesh.world_geometry();
        if !geometry.indices_in_bounds() {
            return Err(KernelError(format!(
                "mesh '{}' references vertices out of range",
                mesh.name
            )));
        }
        let polygons: Vec<Polygon> = geometry
            .triangles
            .iter()
            .filter_map(|tri| Polygon::new(tri.indices.iter().map(|&i| geometry.vertices[i]).collect()))
            .collect();
        if polygons.is_empty() {
            return Err(KernelError(format!(
                "mesh '{}' has no non-degenerate faces",
                mesh.name
            )));
        }
        Ok(Solid { polygons })
    }

    fn union(&self, a: &Solid, b: &Solid) -> Result<Solid, KernelError> {
        let mut a = BspNode::new(a.polygons.clone());
        let mut b = BspNode::new(b.polygons.clone());
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        Ok(Solid {
            polygons: a.all_polygons(),
        })
    }

    fn subtract(&self, a: &Solid, b: &Solid) -> Result<Solid, KernelError> {
        let mut a = BspNode::new(a.polygons.clone());
        let mut b = BspNode::new(b.polygons.clone());
        a.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        a.invert();
        Ok(Solid {
            polygons: a.all_polygons(),
        })
    }

    fn intersect(&self, a: &Solid, b: &Solid) -> Result<Solid, KernelError> {
        let mut a = BspNode::new(a.polygons.clone());
        let mut b = BspNode::new(b.polygons.clone());
        a.invert();
        b.clip_to(&a);
        b.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        a.build(b.all_polygons());
        a.invert();
        Ok(Solid {
            polygons: a.all_polygons(),
        })
    }

    /// Fan-triangulate every polygon; vertices carry the face normal
    fn to_mesh(&self, solid: &Solid) -> Result<Mesh, KernelError> {
        let triangle_count: usize = solid.polygons.iter().map(|p| p.vertices.len() - 2).sum();
        let mut mesh = Mesh::with_capacity(triangle_count * 3, triangle_count);

        for poly in &solid.polygons {
            let normal = poly.plane.normal;
            let first = mesh.vertex_count();
            for v in &poly.vertices {
                if !v.position.coords.iter().all(|c| c.is_finite()) {
                    return Err(KernelError("solid contains non-finite vertices".into()));
                }
                mesh.add_vertex(Vertex::new(v.position, normal));
            }
            for k in 1..poly.vertices.len() - 1 {
                mesh.add_triangle(Triangle::new([first, first + k, first + k + 1]));
            }
        }

        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Vec3;
    use crate::geometry::primitives::{build_cube, build_sphere};
    use approx::assert_relative_eq;

    fn volume(mesh: &Mesh) -> f64 {
        mesh.triangles
            .iter()
            .map(|t| {
                let a = mesh.vertices[t.indices[0]].position.coords;
                let b = mesh.vertices[t.indices[1]].position.coords;
                let c = mesh.vertices[t.indices[2]].position.coords;
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    fn cube_at(size: f64, offset: Vec3) -> MeshBuffer {
        let mut cube = build_cube(Vec3::new(size, size, size), false).unwrap();
        cube.transform.position = offset;
        cube
    }

    fn run(kind: BooleanKind, a: &MeshBuffer, b: &MeshBuffer) -> Mesh {
        let kernel = BspKernel::new();
        let sa = kernel.from_mesh(a).unwrap();
        let sb = kernel.from_mesh(b).unwrap();
        let solid = kernel.apply(kind, &sa, &sb).unwrap();
        kernel.to_mesh(&solid).unwrap()
    }

    #[test]
    fn test_csg_union_overlapping_cubes() {
        let a = cube_at(2.0, Vec3::zeros());
        let b = cube_at(2.0, Vec3::new(1.0, 0.0, 0.0));
        let mesh = run(BooleanKind::Union, &a, &b);
        assert_relative_eq!(volume(&mesh), 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_csg_difference_cubes() {
        let a = cube_at(2.0, Vec3::zeros());
        let b = cube_at(2.0, Vec3::new(1.0, 0.0, 0.0));
        let mesh = run(BooleanKind::Difference, &a, &b);
        assert_relative_eq!(volume(&mesh), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_csg_intersection_cubes() {
        let a = cube_at(2.0, Vec3::zeros());
        let b = cube_at(2.0, Vec3::new(1.0, 1.0, 0.0));
        let mesh = run(BooleanKind::Intersection, &a, &b);
        assert_relative_eq!(volume(&mesh), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_csg_disjoint_intersection_is_empty() {
        let a = cube_at(1.0, Vec3::zeros());
        let b = cube_at(1.0, Vec3::new(5.0, 0.0, 0.0));
        let mesh = run(BooleanKind::Intersection, &a, &b);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_csg_difference_sphere_from_cube() {
        let mut a = build_cube(Vec3::new(20.0, 20.0, 20.0), true).unwrap();
        a.name = "block".into();
        let b = build_sphere(10.0, 16).unwrap();
        let mesh = run(BooleanKind::Difference, &a, &b);
        assert!(mesh.vertex_count() > 0);
        let v = volume(&mesh);
        assert!(v > 0.0 && v < 8000.0);
        assert!(!mesh.needs_normals());
    }

    #[test]
    fn test_degenerate_faces_are_skipped() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Vertex::at(Point3::origin()));
        let b = mesh.add_vertex(Vertex::at(Point3::new(1.0, 0.0, 0.0)));
        let c = mesh.add_vertex(Vertex::at(Point3::new(2.0, 0.0, 0.0)));
        mesh.add_triangle(Triangle::new([a, b, c]));
        let buffer = MeshBuffer::new(
            "line",
            mesh,
            crate::geometry::GeometryParams::Csg {
                op: BooleanKind::Union,
            },
        );
        assert!(BspKernel::new().from_mesh(&buffer).is_err());
    }
}
