// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SCAD file importer

use crate::ast::Node;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a .scad file
pub fn read_scad_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).with_context(|| format!("Failed to read SCAD file: {}", path.display()))
}

/// Import a .scad file and parse it into its top-level statements
pub fn import_scad_file(path: impl AsRef<Path>) -> Result<Vec<Node>> {
    let path = path.as_ref();
    let source = read_scad_file(path)?;
    super::parse_scad(&source).with_context(|| format!("Failed to parse SCAD file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_scad_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cube([10, 10, 10]);")?;
        writeln!(file, "sphere(2);")?;

        let nodes = import_scad_file(file.path())?;
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|node| matches!(node.kind, NodeKind::Primitive(_))));
        Ok(())
    }

    #[test]
    fn test_parse_failure_names_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cube(")?;

        let err = import_scad_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse SCAD file"));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = read_scad_file("/nonexistent/model.scad").unwrap_err();
        assert!(err.to_string().contains("Failed to read SCAD file"));
    }
}
