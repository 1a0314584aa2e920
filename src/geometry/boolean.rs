// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean solid service: validation, caching and metrics around a CSG kernel

use super::csg::{BooleanKernel, BspKernel};
use super::{GeometryParams, MeshBuffer};
use crate::ast::BooleanKind;
use crate::cache::{CacheCounters, InsertionCache};
use crate::config::CsgConfig;
use crate::error::{ConversionError, ConversionResult};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

/// Counters for every `evaluate` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub average_duration_ms: f64,
    pub cache: CacheCounters,
}

/// Evaluates union / difference / intersection over mesh buffers
pub struct BooleanService<K: BooleanKernel = BspKernel> {
    kernel: K,
    config: CsgConfig,
    cache: InsertionCache<String, MeshBuffer>,
    stats: BooleanStats,
}

impl BooleanService<BspKernel> {
    pub fn new(config: CsgConfig) -> Self {
        Self::with_kernel(BspKernel::new(), config)
    }
}

impl Default for BooleanService<BspKernel> {
    fn default() -> Self {
        Self::new(CsgConfig::default())
    }
}

impl<K: BooleanKernel> BooleanService<K> {
    pub fn with_kernel(kernel: K, config: CsgConfig) -> Self {
        let cache = InsertionCache::new(config.cache_capacity);
        Self {
            kernel,
            config,
            cache,
            stats: BooleanStats::default(),
        }
    }

    pub fn supports(&self, kind: BooleanKind) -> bool {
        self.kernel.supports(kind)
    }

    /// Fold `buffers` left to right with `kind`
    pub fn evaluate(&mut self, kind: BooleanKind, buffers: &[MeshBuffer]) -> ConversionResult<MeshBuffer> {
        let started = Instant::now();
        self.stats.total += 1;

        let result = self.evaluate_inner(kind, buffers);

        match result {
            Ok(_) => self.stats.succeeded += 1,
            Err(ref e) => {
                self.stats.failed += 1;
                log::debug!("{} of {} operands failed: {}", kind, buffers.len(), e);
            }
        }
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        let n = self.stats.total as f64;
        self.stats.average_duration_ms += (elapsed - self.stats.average_duration_ms) / n;

        result
    }

    fn evaluate_inner(&mut self, kind: BooleanKind, buffers: &[MeshBuffer]) -> ConversionResult<MeshBuffer> {
        validate_operands(kind, buffers)?;

        let key = self
            .config
            .enable_cache
            .then(|| cache_key(kind, buffers));
        if let Some(ref key) = key {
            if let Some(hit) = self.cache.get(key) {
                log::debug!("{} cache hit for {} operands", kind, buffers.len());
                // Geometry is keyed; the material always follows the first operand
                return Ok(hit.with_material(buffers[0].material.clone()));
            }
        }

        let mut result = self.run_kernel(kind, buffers)?;
        if self.config.optimize {
            result.geometry.optimize();
        }

        if let Some(key) = key {
            if let Some(evicted) = self.cache.insert(key, result.clone()) {
                log::debug!("evicted boolean cache entry {}", evicted);
            }
        }
        Ok(result)
    }

    fn run_kernel(&self, kind: BooleanKind, buffers: &[MeshBuffer]) -> ConversionResult<MeshBuffer> {
        if !self.kernel.supports(kind) {
            return Err(ConversionError::BooleanOperation {
                index: 0,
                message: format!("{} is not supported by the kernel", kind),
            });
        }

        let kernel_error = |index: usize| {
            move |e: super::csg::KernelError| ConversionError::BooleanOperation {
                index,
                message: e.to_string(),
            }
        };

        let mut solid = self.kernel.from_mesh(&buffers[0]).map_err(kernel_error(0))?;
        for (index, operand) in buffers.iter().enumerate().skip(1) {
            let next = self.kernel.from_mesh(operand).map_err(kernel_error(index))?;
            solid = self
                .kernel
                .apply(kind, &solid, &next)
                .map_err(kernel_error(index))?;
        }

        let last = buffers.len() - 1;
        let geometry = self.kernel.to_mesh(&solid).map_err(kernel_error(last))?;
        if geometry.is_empty() {
            return Err(ConversionError::BooleanOperation {
                index: last,
                message: format!("{} produced an empty solid", kind),
            });
        }
        if !geometry.indices_in_bounds() {
            return Err(ConversionError::BooleanOperation {
                index: last,
                message: format!("{} produced triangles indexing past the vertex list", kind),
            });
        }

        Ok(MeshBuffer::new(
            format!("csg_{}", kind),
            geometry,
            GeometryParams::Csg { op: kind },
        )
        .with_material(buffers[0].material.clone()))
    }

    pub fn stats(&self) -> BooleanStats {
        BooleanStats {
            cache: self.cache.stats(),
            ..self.stats
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn config(&self) -> &CsgConfig {
        &self.config
    }
}

fn validate_operands(kind: BooleanKind, buffers: &[MeshBuffer]) -> ConversionResult<()> {
    if buffers.is_empty() {
        return Err(ConversionError::validation(format!(
            "{} requires at least one mesh",
            kind
        )));
    }
    if buffers.len() < kind.min_operands() {
        return Err(ConversionError::validation(format!(
            "{} requires at least two meshes, got {}",
            kind,
            buffers.len()
        )));
    }
    for (index, buffer) in buffers.iter().enumerate() {
        if buffer.geometry.is_empty() {
            return Err(ConversionError::validation(format!(
                "mesh at index {} ('{}') has no vertex data",
                index, buffer.name
            )));
        }
    }
    Ok(())
}

/// Cheap structural fingerprint: vertex count, first and last vertex, placement
fn fingerprint(buffer: &MeshBuffer) -> u64 {
    let mut hasher = DefaultHasher::new();
    let vertices = &buffer.geometry.vertices;
    vertices.len().hash(&mut hasher);
    buffer.geometry.triangles.len().hash(&mut hasher);
    for vertex in [vertices.first(), vertices.last()].into_iter().flatten() {
        for c in vertex.position.coords.iter() {
            c.to_bits().hash(&mut hasher);
        }
    }
    let t = &buffer.transform;
    for c in t.position.iter().chain(t.rotation.iter()).chain(t.scale.iter()) {
        c.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

fn cache_key(kind: BooleanKind, buffers: &[MeshBuffer]) -> String {
    let mut key = String::from(kind.as_str());
    for buffer in buffers {
        key.push_str(&format!(":{:016x}", fingerprint(buffer)));
    }
    key
}
