// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene graph types

use crate::geometry::{BoundingBox, Color, MeshBuffer};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Shadow map settings for a shadow-casting light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowParams {
    pub map_size: u32,
    pub near: f64,
    pub far: f64,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            map_size: 2048,
            near: 0.5,
            far: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Ambient,
    Directional {
        position: Point3<f64>,
        target: Point3<f64>,
        shadow: Option<ShadowParams>,
    },
    Point {
        position: Point3<f64>,
        /// 0 means unlimited range
        distance: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub fn casts_shadow(&self) -> bool {
        matches!(
            self.kind,
            LightKind::Directional {
                shadow: Some(_),
                ..
            }
        )
    }
}

/// Visual aids drawn alongside the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Helper {
    Grid { size: f64, divisions: u32 },
    Axes { size: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Color,
    pub near: f64,
    pub far: f64,
}

/// Renderable scene; owns every mesh, light and helper it contains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub background: Color,
    pub fog: Option<Fog>,
    pub lights: Vec<Light>,
    pub helpers: Vec<Helper>,
    pub meshes: Vec<MeshBuffer>,
}

impl SceneGraph {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            fog: None,
            lights: Vec::new(),
            helpers: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// Union of every mesh's bounding box in scene space
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for mesh in &self.meshes {
            bbox.union(&mesh.world_bounding_box());
        }
        bbox
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshBuffer> {
        self.meshes.iter().find(|m| m.name == name)
    }
}
