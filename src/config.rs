// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline configuration system

use crate::geometry::{Color, Material};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file looked up by [`PipelineConfig::load`]
pub const CONFIG_FILE: &str = "polyframe-scene.toml";

/// AST visitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorConfig {
    /// Resolution for curved primitives whose node does not set one
    pub segments: u32,
    /// Evaluate boolean nodes; when off the first child is returned
    pub enable_csg: bool,
    /// Material assigned to every primitive
    pub default_material: Material,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            segments: 32,
            enable_csg: true,
            default_material: Material::default(),
        }
    }
}

/// Boolean solid service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsgConfig {
    pub enable_cache: bool,
    pub cache_capacity: usize,
    /// Recompute missing normals and precompute bounds on results
    pub optimize: bool,
}

impl Default for CsgConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_capacity: 100,
            optimize: true,
        }
    }
}

/// Linear fog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FogConfig {
    pub color: Color,
    pub near: f64,
    pub far: f64,
}

/// Automatic camera framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    /// Used when the scene has no extent (a single point)
    pub min_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            min_distance: 5.0,
        }
    }
}

/// Scene assembler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: Color,
    pub fog: Option<FogConfig>,
    pub enable_lighting: bool,
    pub enable_shadows: bool,
    pub show_grid: bool,
    pub grid_size: f64,
    pub grid_divisions: u32,
    pub show_axes: bool,
    pub axes_size: f64,
    pub camera: CameraConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: Color::from_hex(0x2a2a2a),
            fog: None,
            enable_lighting: true,
            enable_shadows: true,
            show_grid: true,
            grid_size: 20.0,
            grid_divisions: 20,
            show_axes: true,
            axes_size: 5.0,
            camera: CameraConfig::default(),
        }
    }
}

/// Whole-pipeline retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles each time
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Backoff before the attempt following `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enable_cache: bool,
    pub cache_capacity: usize,
    pub enable_optimization: bool,
    pub visitor: VisitorConfig,
    pub csg: CsgConfig,
    pub scene: SceneConfig,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_capacity: 50,
            enable_optimization: true,
            visitor: VisitorConfig::default(),
            csg: CsgConfig::default(),
            scene: SceneConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply `POLYFRAME_*` overrides; unparsable values are ignored
    pub fn apply_env(&mut self) {
        if let Some(segments) = env_parse("POLYFRAME_SEGMENTS") {
            self.visitor.segments = segments;
        }
        if let Some(enable_csg) = env_parse("POLYFRAME_ENABLE_CSG") {
            self.visitor.enable_csg = enable_csg;
        }
        if let Some(max_retries) = env_parse("POLYFRAME_MAX_RETRIES") {
            self.retry.max_retries = max_retries;
        }
        if let Some(capacity) = env_parse("POLYFRAME_CACHE_CAPACITY") {
            self.cache_capacity = capacity;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}
