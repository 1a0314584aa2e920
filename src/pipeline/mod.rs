// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline module - source text to scene graph

mod orchestrator;
mod progress;

pub use orchestrator::{source_key, Pipeline, PipelineCacheStats, PipelineOutput};
pub use progress::{ProgressEvent, ProgressSender, Stage};

use crate::ast::Node;
use crate::error::ParseError;

/// Turns source text into its top-level AST statements
///
/// Each statement becomes one mesh in the scene.
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError>;
}
