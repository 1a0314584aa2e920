// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator

use super::{GeometryParams, Mesh, MeshBuffer, Triangle, Vertex};
use crate::ast::Vec3;
use crate::error::{ConversionError, ConversionResult};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Fewest segments that still enclose a volume
pub const MIN_SEGMENTS: u32 = 3;

fn check_dimension(name: &str, value: f64) -> ConversionResult<()> {
    if !value.is_finite() {
        return Err(ConversionError::construction(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value < 0.0 {
        return Err(ConversionError::construction(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_segments(segments: u32) -> ConversionResult<()> {
    if segments < MIN_SEGMENTS {
        return Err(ConversionError::construction(format!(
            "at least {} segments required, got {}",
            MIN_SEGMENTS, segments
        )));
    }
    Ok(())
}

/// Box with its min corner at the origin, or centered when `center` is set
pub fn build_cube(size: Vec3, center: bool) -> ConversionResult<MeshBuffer> {
    check_dimension("cube width", size.x)?;
    check_dimension("cube height", size.y)?;
    check_dimension("cube depth", size.z)?;
    if size.x == 0.0 || size.y == 0.0 || size.z == 0.0 {
        return Err(ConversionError::construction(format!(
            "cube [{}, {}, {}] has no volume",
            size.x, size.y, size.z
        )));
    }

    let params = GeometryParams::Box {
        width: size.x,
        height: size.y,
        depth: size.z,
    };
    Ok(MeshBuffer::new("box", generate_cube_mesh(size, center), params))
}

/// UV sphere centered at the origin
pub fn build_sphere(radius: f64, segments: u32) -> ConversionResult<MeshBuffer> {
    check_dimension("sphere radius", radius)?;
    check_segments(segments)?;
    if radius == 0.0 {
        return Err(ConversionError::construction("sphere radius must be positive"));
    }

    let params = GeometryParams::Sphere { radius, segments };
    Ok(MeshBuffer::new(
        "sphere",
        generate_sphere_mesh(radius, segments),
        params,
    ))
}

/// Cylinder or truncated cone standing on the XY plane, extending along +Z
pub fn build_cylinder(
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
    segments: u32,
) -> ConversionResult<MeshBuffer> {
    check_dimension("cylinder top radius", radius_top)?;
    check_dimension("cylinder bottom radius", radius_bottom)?;
    check_dimension("cylinder height", height)?;
    check_segments(segments)?;
    if height == 0.0 {
        return Err(ConversionError::construction("cylinder height must be positive"));
    }
    if radius_top == 0.0 && radius_bottom == 0.0 {
        return Err(ConversionError::construction(
            "cylinder needs at least one positive radius",
        ));
    }

    let params = GeometryParams::Cylinder {
        radius_top,
        radius_bottom,
        height,
        segments,
    };
    Ok(MeshBuffer::new(
        "cylinder",
        generate_cone_mesh(height, radius_bottom, radius_top, segments),
        params,
    ))
}

fn generate_cube_mesh(size: Vec3, center: bool) -> Mesh {
    let mut mesh = Mesh::with_capacity(24, 12);

    let origin = if center { -size / 2.0 } else { Vector3::zeros() };
    let (min_x, max_x) = (origin.x, origin.x + size.x);
    let (min_y, max_y) = (origin.y, origin.y + size.y);
    let (min_z, max_z) = (origin.z, origin.z + size.z);

    // 8 corners of the cube
    let positions = [
        Point3::new(min_x, min_y, min_z),
        Point3::new(max_x, min_y, min_z),
        Point3::new(max_x, max_y, min_z),
        Point3::new(min_x, max_y, min_z),
        Point3::new(min_x, min_y, max_z),
        Point3::new(max_x, min_y, max_z),
        Point3::new(max_x, max_y, max_z),
        Point3::new(min_x, max_y, max_z),
    ];

    // 6 faces as counter-clockwise quads, each with its own vertices for flat normals
    let faces = [
        ([4, 5, 6, 7], Vector3::new(0.0, 0.0, 1.0)),
        ([1, 0, 3, 2], Vector3::new(0.0, 0.0, -1.0)),
        ([5, 1, 2, 6], Vector3::new(1.0, 0.0, 0.0)),
        ([0, 4, 7, 3], Vector3::new(-1.0, 0.0, 0.0)),
        ([7, 6, 2, 3], Vector3::new(0.0, 1.0, 0.0)),
        ([0, 1, 5, 4], Vector3::new(0.0, -1.0, 0.0)),
    ];

    for (quad, normal) in faces {
        let [a, b, c, d] = quad.map(|i| mesh.add_vertex(Vertex::new(positions[i], normal)));
        mesh.add_triangle(Triangle::new([a, b, c]));
        mesh.add_triangle(Triangle::new([a, c, d]));
    }

    mesh
}

fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let slices = segments as usize;
    let rings = (segments as usize / 2).max(2);
    let mut mesh = Mesh::with_capacity(2 + (rings - 1) * slices, 2 * rings * slices);

    let vertex = |phi: f64, theta: f64| {
        let normal = Vector3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
        Vertex::new(Point3::from(normal * radius), normal)
    };

    let north = mesh.add_vertex(vertex(0.0, 0.0));

    // Interior rings, excluding both poles
    let mut ring_start = Vec::with_capacity(rings - 1);
    for i in 1..rings {
        let phi = PI * i as f64 / rings as f64;
        ring_start.push(mesh.vertex_count());
        for j in 0..slices {
            let theta = 2.0 * PI * j as f64 / slices as f64;
            mesh.add_vertex(vertex(phi, theta));
        }
    }

    let south = mesh.add_vertex(vertex(PI, 0.0));

    let first = ring_start[0];
    for j in 0..slices {
        let next = (j + 1) % slices;
        mesh.add_triangle(Triangle::new([north, first + j, first + next]));
    }

    for pair in ring_start.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        for j in 0..slices {
            let next = (j + 1) % slices;
            mesh.add_triangle(Triangle::new([upper + j, lower + j, lower + next]));
            mesh.add_triangle(Triangle::new([upper + j, lower + next, upper + next]));
        }
    }

    let last = ring_start[ring_start.len() - 1];
    for j in 0..slices {
        let next = (j + 1) % slices;
        mesh.add_triangle(Triangle::new([south, last + next, last + j]));
    }

    mesh
}

fn generate_cone_mesh(height: f64, r1: f64, r2: f64, segments: u32) -> Mesh {
    let segments = segments as usize;
    let mut mesh = Mesh::new();

    // A zero radius collapses that rim into a single apex vertex
    let rim = |mesh: &mut Mesh, radius: f64, z: f64| -> Vec<usize> {
        if radius == 0.0 {
            let apex = mesh.add_vertex(Vertex::at(Point3::new(0.0, 0.0, z)));
            return vec![apex; segments];
        }
        (0..segments)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / segments as f64;
                mesh.add_vertex(Vertex::at(Point3::new(
                    radius * angle.cos(),
                    radius * angle.sin(),
                    z,
                )))
            })
            .collect()
    };

    let bottom = rim(&mut mesh, r1, 0.0);
    let top = rim(&mut mesh, r2, height);

    if r1 > 0.0 {
        let bottom_center = mesh.add_vertex(Vertex::at(Point3::new(0.0, 0.0, 0.0)));
        for i in 0..segments {
            let next = (i + 1) % segments;
            mesh.add_triangle(Triangle::new([bottom_center, bottom[next], bottom[i]]));
        }
    }

    if r2 > 0.0 {
        let top_center = mesh.add_vertex(Vertex::at(Point3::new(0.0, 0.0, height)));
        for i in 0..segments {
            let next = (i + 1) % segments;
            mesh.add_triangle(Triangle::new([top_center, top[i], top[next]]));
        }
    }

    // Side triangles reuse rim vertices to keep the surface manifold
    for i in 0..segments {
        let next = (i + 1) % segments;
        let (bi, bn, ti, tn) = (bottom[i], bottom[next], top[i], top[next]);
        if r1 > 0.0 {
            mesh.add_triangle(Triangle::new([bi, bn, ti]));
        }
        if r2 > 0.0 {
            mesh.add_triangle(Triangle::new([ti, bn, tn]));
        }
    }

    // Averages normals at shared vertices
    mesh.recompute_normals();
    mesh
}
