// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Abstract Syntax Tree module
//! 
//! Defines the AST structure for OpenSCAD-compatible operations and the
//! visitor that turns it into meshes

mod node;
mod visitor;

pub use node::{BooleanKind, Node, NodeKind, Primitive, SourceLocation, TransformOp, Vec3};
pub use visitor::{AstVisitor, Degradation, DegradationReason};
