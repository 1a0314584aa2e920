// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene assembler - lights, helpers and camera around a list of meshes

use super::{Camera, Fog, Helper, Light, LightKind, SceneGraph, ShadowParams};
use crate::config::SceneConfig;
use crate::error::{ConversionError, ConversionResult};
use crate::geometry::{Color, MeshBuffer};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Counts gathered by walking a scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStats {
    pub mesh_count: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Distinct materials
    pub material_count: usize,
    pub light_count: usize,
    /// Bytes
    pub memory_estimate: usize,
}

/// What an optimization pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub meshes_visited: usize,
    pub normals_rebuilt: usize,
}

/// Builds scene graphs from mesh buffers
#[derive(Debug, Clone, Default)]
pub struct SceneAssembler {
    config: SceneConfig,
}

impl SceneAssembler {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Clone `meshes` into a new scene with background, lights and helpers
    pub fn assemble(&self, meshes: &[MeshBuffer]) -> ConversionResult<SceneGraph> {
        validate_meshes(meshes)?;

        let mut scene = SceneGraph::new(self.config.background);
        scene.fog = self.config.fog.as_ref().map(|fog| Fog {
            color: fog.color,
            near: fog.near,
            far: fog.far,
        });

        if self.config.enable_lighting {
            scene.lights = self.light_rig();
        }
        if self.config.show_grid {
            scene.helpers.push(Helper::Grid {
                size: self.config.grid_size,
                divisions: self.config.grid_divisions,
            });
        }
        if self.config.show_axes {
            scene.helpers.push(Helper::Axes {
                size: self.config.axes_size,
            });
        }

        scene.meshes = meshes.to_vec();
        log::debug!(
            "assembled scene with {} meshes, {} lights, {} helpers",
            scene.meshes.len(),
            scene.lights.len(),
            scene.helpers.len()
        );
        Ok(scene)
    }

    /// [`assemble`](Self::assemble) plus a camera framing every mesh
    pub fn assemble_with_camera(&self, meshes: &[MeshBuffer]) -> ConversionResult<(SceneGraph, Camera)> {
        let scene = self.assemble(meshes)?;
        let camera = Camera::frame(&scene.bounding_box(), &self.config.camera);
        Ok((scene, camera))
    }

    /// Ambient, shadow-casting key, point fill and rim light
    fn light_rig(&self) -> Vec<Light> {
        let shadow = self.config.enable_shadows.then(ShadowParams::default);
        vec![
            Light {
                name: "ambient".into(),
                kind: LightKind::Ambient,
                color: Color::from_hex(0x404040),
                intensity: 0.4,
            },
            Light {
                name: "key".into(),
                kind: LightKind::Directional {
                    position: Point3::new(10.0, 10.0, 5.0),
                    target: Point3::origin(),
                    shadow,
                },
                color: Color::from_hex(0xffffff),
                intensity: 0.8,
            },
            Light {
                name: "fill".into(),
                kind: LightKind::Point {
                    position: Point3::new(-10.0, -10.0, -5.0),
                    distance: 0.0,
                },
                color: Color::from_hex(0x4080ff),
                intensity: 0.3,
            },
            Light {
                name: "rim".into(),
                kind: LightKind::Directional {
                    position: Point3::new(0.0, 0.0, -10.0),
                    target: Point3::origin(),
                    shadow: None,
                },
                color: Color::from_hex(0xff8040),
                intensity: 0.2,
            },
        ]
    }

    /// Recompute missing normals and bounding volumes of every mesh
    pub fn optimize(&self, scene: &mut SceneGraph) -> ConversionResult<OptimizationReport> {
        let mut report = OptimizationReport::default();
        for (index, mesh) in scene.meshes.iter_mut().enumerate() {
            if !mesh.geometry.indices_in_bounds() {
                return Err(ConversionError::SceneAssembly {
                    index,
                    message: format!("mesh '{}' has out-of-range indices", mesh.name),
                });
            }
            if mesh.geometry.optimize() {
                report.normals_rebuilt += 1;
            }
            report.meshes_visited += 1;
        }
        Ok(report)
    }

    /// Walk the scene and count its contents
    pub fn stats(scene: &SceneGraph) -> SceneStats {
        let mut materials = HashSet::new();
        let mut stats = SceneStats {
            light_count: scene.lights.len(),
            ..SceneStats::default()
        };
        for mesh in &scene.meshes {
            stats.mesh_count += 1;
            stats.vertex_count += mesh.vertex_count();
            stats.triangle_count += mesh.triangle_count();
            stats.memory_estimate += mesh.geometry.memory_estimate();
            materials.insert(mesh.material.key());
        }
        stats.material_count = materials.len();
        stats
    }
}

fn validate_meshes(meshes: &[MeshBuffer]) -> ConversionResult<()> {
    if meshes.is_empty() {
        return Err(ConversionError::validation(
            "scene assembly requires at least one mesh",
        ));
    }
    for (index, mesh) in meshes.iter().enumerate() {
        if mesh.geometry.is_empty() {
            return Err(ConversionError::SceneAssembly {
                index,
                message: format!("mesh '{}' has no geometry", mesh.name),
            });
        }
        if let Err(message) = mesh.material.validate() {
            return Err(ConversionError::SceneAssembly { index, message });
        }
    }
    Ok(())
}
