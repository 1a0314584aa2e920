// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - reading and parsing source files

mod importer;
mod parser;

pub use importer::{import_scad_file, read_scad_file};
pub use parser::{parse_scad, ScadParser};
