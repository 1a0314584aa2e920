// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and operations

pub mod primitives;
pub mod csg;
mod mesh;
mod material;
mod boolean;
mod bbox;

pub use mesh::{GeometryParams, LocalTransform, Mesh, MeshBuffer, Triangle, Vertex};
pub use material::{Color, Material};
pub use boolean::{BooleanService, BooleanStats};
pub use bbox::{BoundingBox, BoundingSphere};
pub use csg::{BooleanKernel, BspKernel, KernelError};
pub use primitives::{build_cube, build_cylinder, build_sphere};
