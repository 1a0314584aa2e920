// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use crate::ast::Degradation;
use crate::error::PipelineError;
use crate::metrics::ProcessingMetrics;
use crate::pipeline::PipelineOutput;
use crate::scene::{SceneAssembler, SceneStats};
use colored::*;
use serde::Serialize;

/// Machine-readable summary printed by `render --json`
#[derive(Debug, Clone, Serialize)]
pub struct RenderSummary<'a> {
    pub file: &'a str,
    pub stats: SceneStats,
    pub camera: &'a crate::scene::Camera,
    pub metrics: &'a ProcessingMetrics,
    pub warnings: Vec<String>,
}

impl<'a> RenderSummary<'a> {
    pub fn new(file: &'a str, output: &'a PipelineOutput) -> Self {
        Self {
            file,
            stats: SceneAssembler::stats(&output.scene),
            camera: &output.camera,
            metrics: &output.metrics,
            warnings: output.warnings.iter().map(Degradation::to_string).collect(),
        }
    }
}

/// CLI reporter for formatted output
pub struct Reporter;

impl Reporter {
    /// Report a finished render with scene statistics
    pub fn report_render(file: &str, output: &PipelineOutput) {
        let stats = SceneAssembler::stats(&output.scene);
        let metrics = &output.metrics;

        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Rendered:".bold(), file.cyan());
        println!("{}", "━".repeat(80).bright_black());

        Self::print_value("Meshes", stats.mesh_count.to_string());
        Self::print_value("Vertices", stats.vertex_count.to_string());
        Self::print_value("Triangles", stats.triangle_count.to_string());
        Self::print_value("Materials", stats.material_count.to_string());
        Self::print_value("Lights", stats.light_count.to_string());
        Self::print_value("Memory", Self::format_bytes(stats.memory_estimate));

        println!("\n{}", "Processing:".bold());
        let rate = format!("{:.1}%", metrics.success_rate());
        println!(
            "  {} {} of {} ({})",
            "Nodes:".bright_black(),
            metrics.processed_nodes.to_string().cyan(),
            metrics.total_nodes,
            if metrics.failed_nodes == 0 {
                rate.green()
            } else {
                rate.yellow()
            }
        );
        println!(
            "  {} {}",
            "Time:".bright_black(),
            metrics.processing_time_str().yellow()
        );

        let camera = &output.camera;
        println!("\n{}", "Camera:".bold());
        println!(
            "  {} ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2})",
            "View:".bright_black(),
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.target.x,
            camera.target.y,
            camera.target.z
        );

        for warning in &output.warnings {
            Self::report_warning(&warning.to_string());
        }
        println!("{}", "━".repeat(80).bright_black());
    }

    /// Report a pipeline failure, with the source position for parse errors
    pub fn report_pipeline_error(file: &str, error: &PipelineError) {
        let mut message = error.to_string();
        if let Some((line, column)) = Self::parse_position(error) {
            message = format!("{}:{}:{}: {}", file, line, column, message);
        }
        Self::report_error(&message);
    }

    fn parse_position(error: &PipelineError) -> Option<(usize, usize)> {
        match error {
            PipelineError::Parse { source, .. } => source.line.zip(source.column),
            PipelineError::RetriesExhausted { last, .. } => Self::parse_position(last),
            PipelineError::Stage { .. } => None,
        }
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    fn print_value(name: &str, value: String) {
        println!("  {} {}", format!("{}:", name).bright_black(), value.cyan());
    }

    fn format_bytes(bytes: usize) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KiB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}
