// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Staged source-to-scene orchestration with caching and retry

use super::progress::{ProgressReporter, ProgressSender, Stage};
use super::SourceParser;
use crate::ast::{AstVisitor, Degradation, Node};
use crate::cache::{CacheCounters, InsertionCache};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::geometry::{BooleanKernel, BooleanService, BspKernel, MeshBuffer};
use crate::metrics::ProcessingMetrics;
use crate::scene::{Camera, SceneAssembler, SceneGraph};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Everything a successful run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub scene: SceneGraph,
    pub camera: Camera,
    /// Meshes as the visitor produced them, before assembly
    pub meshes: Vec<MeshBuffer>,
    pub metrics: ProcessingMetrics,
    /// Boolean nodes that fell back to their first child
    pub warnings: Vec<Degradation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCacheStats {
    pub size: usize,
    /// Source hashes, oldest first
    pub keys: Vec<String>,
    pub counters: CacheCounters,
}

/// Runs parse, AST conversion, scene assembly and optimization
pub struct Pipeline<P: SourceParser, K: BooleanKernel = BspKernel> {
    parser: P,
    config: PipelineConfig,
    visitor: AstVisitor<K>,
    assembler: SceneAssembler,
    cache: InsertionCache<String, PipelineOutput>,
}

impl<P: SourceParser> Pipeline<P, BspKernel> {
    pub fn new(parser: P, config: PipelineConfig) -> Self {
        Self::with_kernel(parser, BspKernel::new(), config)
    }
}

impl<P: SourceParser, K: BooleanKernel> Pipeline<P, K> {
    pub fn with_kernel(parser: P, kernel: K, config: PipelineConfig) -> Self {
        let booleans = BooleanService::with_kernel(kernel, config.csg.clone());
        Self {
            visitor: AstVisitor::with_service(config.visitor.clone(), booleans),
            assembler: SceneAssembler::new(config.scene.clone()),
            cache: InsertionCache::new(config.cache_capacity),
            parser,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on `source`, reporting progress on `progress`
    pub fn process_source(
        &mut self,
        source: &str,
        progress: Option<&ProgressSender>,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut reporter = ProgressReporter::new(progress);
        let key = source_key(source);

        if self.config.enable_cache {
            if let Some(mut cached) = self.cache.get(&key) {
                log::debug!("pipeline cache hit for {}", &key[..12]);
                let counters = self.cache.stats();
                cached.metrics.cache_hits = counters.hits;
                cached.metrics.cache_misses = counters.misses;
                reporter.enter(Stage::Complete, "Retrieved from cache");
                return Ok(cached);
            }
        }

        let result = self.run_stages(source, &mut reporter);
        let mut output = match result {
            Ok(output) => output,
            Err(e) => {
                log::error!("{}", e);
                reporter.fail(e.to_string());
                return Err(e);
            }
        };

        if self.config.enable_cache {
            if let Some(evicted) = self.cache.insert(key, output.clone()) {
                log::debug!("pipeline cache evicted {}", &evicted[..12]);
            }
            let counters = self.cache.stats();
            output.metrics.cache_hits = counters.hits;
            output.metrics.cache_misses = counters.misses;
        }

        log::info!(
            "pipeline complete: {} nodes, {} meshes in {}",
            output.metrics.total_nodes,
            output.scene.meshes.len(),
            ProcessingMetrics::format_time(reporter.elapsed_ms())
        );
        reporter.enter(Stage::Complete, "Scene ready");
        Ok(output)
    }

    fn run_stages(
        &mut self,
        source: &str,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<PipelineOutput, PipelineError> {
        reporter.enter(Stage::Parsing, "Parsing source");
        let statements = self.parser.parse(source).map_err(|source| PipelineError::Parse {
            stage: Stage::Parsing,
            source,
        })?;
        log::debug!(
            "parsed {} statements with {} nodes",
            statements.len(),
            statements.iter().map(Node::count).sum::<usize>()
        );

        reporter.enter(Stage::AstProcessing, "Building geometry");
        self.visitor.release();
        let meshes = statements
            .iter()
            .map(|statement| self.visitor.visit(statement))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::stage(Stage::AstProcessing, e))?;
        let mut metrics = self.visitor.metrics().clone();
        let warnings = self.visitor.take_warnings();

        reporter.enter(Stage::SceneGeneration, "Assembling scene");
        let (mut scene, camera) = self
            .assembler
            .assemble_with_camera(&meshes)
            .map_err(|e| PipelineError::stage(Stage::SceneGeneration, e))?;

        if self.config.enable_optimization {
            reporter.enter(Stage::Optimization, "Optimizing scene");
            match self.assembler.optimize(&mut scene) {
                Ok(report) => log::debug!(
                    "optimized {} meshes, rebuilt normals on {}",
                    report.meshes_visited,
                    report.normals_rebuilt
                ),
                Err(e) => log::warn!("scene optimization failed: {}", e),
            }
        }

        metrics.processing_time_ms = reporter.elapsed_ms();
        Ok(PipelineOutput {
            scene,
            camera,
            meshes,
            metrics,
            warnings,
        })
    }

    /// [`process_source`](Self::process_source) with exponential backoff between attempts
    pub async fn process_with_retry(
        &mut self,
        source: &str,
        progress: Option<&ProgressSender>,
    ) -> Result<PipelineOutput, PipelineError> {
        let attempts = self.config.retry.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.process_source(source, progress) {
                Ok(output) => return Ok(output),
                Err(e) if attempt >= attempts => {
                    return Err(PipelineError::RetriesExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.config.retry.delay_after(attempt);
                    log::warn!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn cache_stats(&self) -> PipelineCacheStats {
        PipelineCacheStats {
            size: self.cache.len(),
            keys: self.cache.keys().cloned().collect(),
            counters: self.cache.stats(),
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop cached scenes and every boolean result; safe to call repeatedly
    pub fn dispose(&mut self) {
        self.cache.clear();
        self.visitor.dispose();
        log::debug!("pipeline disposed");
    }
}

/// Hex sha256 of the source text
pub fn source_key(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
