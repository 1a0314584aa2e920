// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding volume utilities

use super::Vertex;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        Self::from_points(vertices.iter().map(|v| v.position))
    }

    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Self {
        let mut bbox = Self::empty();
        for point in points {
            bbox.expand_to_include(&point);
        }
        bbox
    }

    /// True until at least one point has been included
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);

        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Grow to enclose `other`; empty boxes are ignored
    pub fn union(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.expand_to_include(&other.min);
        self.expand_to_include(&other.max);
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    /// Largest side length
    pub fn max_extent(&self) -> f64 {
        self.size().max()
    }

    pub fn volume(&self) -> f64 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// The eight corner points, used to re-bound under a transform
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(b.x, b.y, b.z),
            Point3::new(a.x, b.y, b.z),
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bounding sphere around a box's center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl BoundingSphere {
    /// Smallest sphere centered on the box center that contains every vertex
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let bbox = BoundingBox::from_vertices(vertices);
        if bbox.is_empty() {
            return Self {
                center: Point3::origin(),
                radius: 0.0,
            };
        }
        let center = bbox.center();
        let radius = vertices
            .iter()
            .map(|v| (v.position - center).norm())
            .fold(0.0_f64, f64::max);
        Self { center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        bbox.expand_to_include(&Point3::new(1.0, 2.0, 3.0));
        bbox.expand_to_include(&Point3::new(-1.0, -2.0, -3.0));

        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max_extent(), 6.0);
    }

    #[test]
    fn test_union_ignores_empty() {
        let mut bbox = BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        bbox.union(&BoundingBox::empty());
        assert_eq!(bbox.max, Point3::new(1.0, 1.0, 1.0));

        bbox.union(&BoundingBox::new(
            Point3::new(-2.0, 0.0, 0.0),
            Point3::new(0.0, 0.5, 4.0),
        ));
        assert_eq!(bbox.min, Point3::new(-2.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(1.0, 1.0, 4.0));
    }

    #[test]
    fn test_bounding_sphere() {
        let vertices = [
            Vertex::new(Point3::new(-1.0, 0.0, 0.0), Vector3::x()),
            Vertex::new(Point3::new(1.0, 0.0, 0.0), Vector3::x()),
        ];
        let sphere = BoundingSphere::from_vertices(&vertices);
        assert_eq!(sphere.center, Point3::origin());
        assert!((sphere.radius - 1.0).abs() < 1e-12);
    }
}
