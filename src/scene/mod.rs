// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene module - scene graph, camera framing and assembly

mod assembler;
mod camera;
mod graph;

pub use assembler::{OptimizationReport, SceneAssembler, SceneStats};
pub use camera::Camera;
pub use graph::{Fog, Helper, Light, LightKind, SceneGraph, ShadowParams};
