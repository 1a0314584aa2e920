// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface material descriptors

use serde::{Deserialize, Serialize};

/// Linear RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_hex(&self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }
}

/// PBR-style material assigned to every mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub wireframe: bool,
    pub opacity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x4a90e2),
            metalness: 0.1,
            roughness: 0.6,
            wireframe: false,
            opacity: 1.0,
        }
    }
}

impl Material {
    /// Check that every factor is finite and inside its range
    pub fn validate(&self) -> Result<(), String> {
        let unit = |name: &str, value: f32| {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(format!("material {} must be within [0, 1], got {}", name, value))
            }
        };
        unit("metalness", self.metalness)?;
        unit("roughness", self.roughness)?;
        unit("opacity", self.opacity)?;
        unit("color.r", self.color.r)?;
        unit("color.g", self.color.g)?;
        unit("color.b", self.color.b)
    }

    /// Hashable identity used when counting distinct materials
    pub fn key(&self) -> [u32; 7] {
        [
            self.color.r.to_bits(),
            self.color.g.to_bits(),
            self.color.b.to_bits(),
            self.metalness.to_bits(),
            self.roughness.to_bits(),
            self.wireframe as u32,
            self.opacity.to_bits(),
        ]
    }
}
