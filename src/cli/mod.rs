// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output helpers for the polyframe-scene binary

pub mod reporter;

pub use reporter::{RenderSummary, Reporter};
