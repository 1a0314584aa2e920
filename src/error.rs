// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error taxonomy for the conversion pipeline

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors raised while turning an AST into meshes and scenes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Malformed AST node, missing children, or invalid mesh input
    #[error("validation failed: {0}")]
    Validation(String),

    /// A primitive builder rejected its parameters
    #[error("geometry construction failed: {0}")]
    GeometryConstruction(String),

    /// The boolean kernel failed on the operand at `index`
    #[error("boolean operation failed at operand {index}: {message}")]
    BooleanOperation { index: usize, message: String },

    /// An input mesh could not be placed into a scene
    #[error("scene assembly failed for mesh {index}: {message}")]
    SceneAssembly { index: usize, message: String },
}

impl ConversionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn construction(message: impl Into<String>) -> Self {
        Self::GeometryConstruction(message.into())
    }
}

/// Failure reported by an injected source parser
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

/// Errors surfaced by the pipeline orchestrator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Parse {
        stage: Stage,
        #[source]
        source: ParseError,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ConversionError,
    },

    #[error("Pipeline failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<PipelineError> },
}

impl PipelineError {
    pub fn stage(stage: Stage, source: ConversionError) -> Self {
        Self::Stage { stage, source }
    }

    /// Stage the error is attributed to, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Parse { stage, .. } | Self::Stage { stage, .. } => Some(*stage),
            Self::RetriesExhausted { last, .. } => last.failed_stage(),
        }
    }
}

pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_names_stage() {
        let err = PipelineError::stage(
            Stage::AstProcessing,
            ConversionError::validation("Transform node requires exactly one child"),
        );
        let message = err.to_string();
        assert!(message.starts_with("ast-processing stage failed"));
        assert!(message.contains("exactly one child"));
    }

    #[test]
    fn test_retries_exhausted_message() {
        let last = PipelineError::Parse {
            stage: Stage::Parsing,
            source: ParseError::at("unexpected token", 3, 7),
        };
        let err = PipelineError::RetriesExhausted {
            attempts: 2,
            last: Box::new(last),
        };
        assert!(err.to_string().contains("after 2 attempts"));
        assert_eq!(err.failed_stage(), Some(Stage::Parsing));
    }
}
