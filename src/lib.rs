// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe Scene
//!
//! Converts a solid-modeling AST into a renderable scene graph: primitive
//! meshes, CSG boolean evaluation, lighting, camera framing, staged progress
//! reporting, and result caching with retry.

pub mod ast;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod scene;

pub use ast::{AstVisitor, BooleanKind, Degradation, Node, NodeKind, Primitive, TransformOp};
pub use config::PipelineConfig;
pub use error::{ConversionError, ParseError, PipelineError};
pub use geometry::{BooleanService, Mesh, MeshBuffer};
pub use io::{import_scad_file, parse_scad, ScadParser};
pub use pipeline::{Pipeline, PipelineOutput, ProgressEvent, SourceParser, Stage};
pub use scene::{Camera, SceneAssembler, SceneGraph};

/// Run the full pipeline on OpenSCAD source with the default configuration
pub fn render(source: &str) -> Result<PipelineOutput, PipelineError> {
    Pipeline::new(ScadParser, PipelineConfig::default()).process_source(source, None)
}
