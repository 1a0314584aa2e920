// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Processing metrics

use serde::{Deserialize, Serialize};

/// Counters collected while converting one AST
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub total_nodes: usize,
    pub processed_nodes: usize,
    pub failed_nodes: usize,
    /// Boolean nodes that fell back to their first child
    pub degraded_nodes: usize,
    pub processing_time_ms: f64,
    /// Bytes, estimated from the vertex and triangle counts of produced meshes
    pub memory_estimate: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f32 {
        if self.total_nodes == 0 {
            0.0
        } else {
            (self.processed_nodes as f32 / self.total_nodes as f32) * 100.0
        }
    }

    /// Format time in human-readable format
    pub fn format_time(ms: f64) -> String {
        if ms < 1000.0 {
            format!("{:.1}ms", ms)
        } else {
            format!("{:.2}s", ms / 1000.0)
        }
    }

    pub fn processing_time_str(&self) -> String {
        Self::format_time(self.processing_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let metrics = ProcessingMetrics {
            total_nodes: 4,
            processed_nodes: 3,
            failed_nodes: 1,
            ..ProcessingMetrics::default()
        };
        assert_eq!(metrics.success_rate(), 75.0);
        assert_eq!(ProcessingMetrics::new().success_rate(), 0.0);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(ProcessingMetrics::format_time(500.0), "500.0ms");
        assert_eq!(ProcessingMetrics::format_time(1500.0), "1.50s");
    }
}
