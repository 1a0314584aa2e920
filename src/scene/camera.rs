// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Automatic camera framing

use crate::config::CameraConfig;
use crate::geometry::BoundingBox;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Offset direction from the scene center, per unit of distance
pub const VIEW_DIRECTION: [f64; 3] = [0.7, 0.7, 0.7];

/// Perspective camera looking at `target`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub position: Point3<f64>,
    pub target: Point3<f64>,
}

impl Camera {
    /// Place the camera `2 × max extent` away from the box center
    pub fn frame(bbox: &BoundingBox, config: &CameraConfig) -> Self {
        let (center, extent) = if bbox.is_empty() {
            (Point3::origin(), 0.0)
        } else {
            (bbox.center(), bbox.max_extent())
        };

        let mut distance = 2.0 * extent;
        if distance <= 0.0 {
            distance = config.min_distance;
        }

        let offset = Vector3::from(VIEW_DIRECTION) * distance;
        Self {
            fov: config.fov,
            near: config.near,
            far: config.far.max(distance * 4.0),
            position: center + offset,
            target: center,
        }
    }

    pub fn distance(&self) -> f64 {
        (self.position - self.target).norm()
    }
}
