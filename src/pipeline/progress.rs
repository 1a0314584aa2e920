// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline stages and progress events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Channel the pipeline reports progress on
pub type ProgressSender = UnboundedSender<ProgressEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Idle,
    Parsing,
    AstProcessing,
    SceneGeneration,
    Optimization,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Parsing => "parsing",
            Stage::AstProcessing => "ast-processing",
            Stage::SceneGeneration => "scene-generation",
            Stage::Optimization => "optimization",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        }
    }

    /// Fixed progress percentage reported on entering the stage
    pub fn checkpoint(&self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::Parsing => 10,
            Stage::AstProcessing => 30,
            Stage::SceneGeneration => 70,
            Stage::Optimization => 90,
            Stage::Complete => 100,
            Stage::Failed => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 0 to 100
    pub progress: u8,
    pub message: String,
    pub time_elapsed_ms: f64,
    /// Linear extrapolation from the elapsed time; absent at 0 and 100
    pub estimated_remaining_ms: Option<f64>,
}

/// Emits events for one run, timed from its creation
///
/// At most one terminal event is sent; anything after it is dropped.
pub(crate) struct ProgressReporter<'a> {
    sender: Option<&'a ProgressSender>,
    started: Instant,
    last_progress: u8,
    finished: bool,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sender: Option<&'a ProgressSender>) -> Self {
        Self {
            sender,
            started: Instant::now(),
            last_progress: 0,
            finished: false,
        }
    }

    pub(crate) fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Report entering `stage` at its checkpoint
    pub(crate) fn enter(&mut self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, stage.checkpoint(), message.into());
    }

    /// Report a failure at the last reached percentage
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.emit(Stage::Failed, self.last_progress, message.into());
    }

    fn emit(&mut self, stage: Stage, progress: u8, message: String) {
        if self.finished {
            log::trace!("run already finished; {} event discarded", stage);
            return;
        }
        self.finished = stage.is_terminal();
        if stage != Stage::Failed {
            self.last_progress = progress;
        }
        let Some(sender) = self.sender else {
            return;
        };

        let time_elapsed_ms = self.elapsed_ms();
        let estimated_remaining_ms = (progress > 0 && progress < 100 && stage != Stage::Failed)
            .then(|| time_elapsed_ms / f64::from(progress) * f64::from(100 - progress));

        let event = ProgressEvent {
            stage,
            progress,
            message,
            time_elapsed_ms,
            estimated_remaining_ms,
        };
        if sender.send(event).is_err() {
            log::trace!("progress receiver dropped; {} event discarded", stage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::AstProcessing.to_string(), "ast-processing");
        assert_eq!(Stage::SceneGeneration.to_string(), "scene-generation");
        assert_eq!(
            serde_json::to_string(&Stage::AstProcessing).unwrap(),
            "\"ast-processing\""
        );
    }

    #[test]
    fn test_checkpoints_increase() {
        let stages = [
            Stage::Parsing,
            Stage::AstProcessing,
            Stage::SceneGeneration,
            Stage::Optimization,
            Stage::Complete,
        ];
        let values: Vec<u8> = stages.iter().map(Stage::checkpoint).collect();
        assert_eq!(values, vec![10, 30, 70, 90, 100]);
    }

    #[test]
    fn test_failure_keeps_last_progress() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(Some(&tx));
        reporter.enter(Stage::Parsing, "Parsing source");
        reporter.enter(Stage::AstProcessing, "Building geometry");
        reporter.fail("boom");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.progress, 10);
        assert!(first.estimated_remaining_ms.is_some());
        let _ = rx.try_recv().unwrap();
        let failed = rx.try_recv().unwrap();
        assert_eq!(failed.stage, Stage::Failed);
        assert_eq!(failed.progress, 30);
        assert_eq!(failed.estimated_remaining_ms, None);
    }

    #[test]
    fn test_single_terminal_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(Some(&tx));
        reporter.enter(Stage::Parsing, "Parsing source");
        reporter.fail("boom");
        reporter.enter(Stage::Complete, "Scene ready");
        reporter.fail("again");

        let stages: Vec<Stage> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.stage)
            .collect();
        assert_eq!(stages, vec![Stage::Parsing, Stage::Failed]);
        assert!(Stage::Complete.is_terminal());
        assert!(!Stage::Optimization.is_terminal());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(Some(&tx));
        reporter.enter(Stage::Complete, "done");
    }
}
