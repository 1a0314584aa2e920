// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD parser using pest

use crate::ast::{BooleanKind, Node, NodeKind, Primitive, SourceLocation, TransformOp, Vec3};
use crate::error::ParseError;
use crate::pipeline::SourceParser;
use pest::error::LineColLocation;
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;

#[derive(Parser)]
#[grammar = "io/scad.pest"]
struct ScadGrammar;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;
type ParseResult<T> = Result<T, ParseError>;

/// Parser for the OpenSCAD subset understood by the visitor
#[derive(Debug, Clone, Copy, Default)]
pub struct ScadParser;

impl SourceParser for ScadParser {
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        parse_scad(source)
    }
}

/// Parse OpenSCAD source code into its top-level statements
///
/// The result is never empty; a program without geometry is an error.
pub fn parse_scad(source: &str) -> ParseResult<Vec<Node>> {
    let program = ScadGrammar::parse(Rule::program, source)
        .map_err(grammar_error)?
        .next()
        .ok_or_else(|| ParseError::new("empty parse tree"))?;

    let mut scope = Scope::default();
    let mut statements = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::statement {
            statements.extend(scope.statement(pair)?);
        }
    }

    if statements.is_empty() {
        return Err(ParseError::new("source contains no geometry"));
    }
    Ok(statements)
}

fn grammar_error(e: pest::error::Error<Rule>) -> ParseError {
    let (line, column) = match e.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    ParseError::at(e.variant.message().into_owned(), line, column)
}

fn location(pair: &Pair<'_>) -> SourceLocation {
    let (line, column) = pair.as_span().start_pos().line_col();
    SourceLocation::new(line, column)
}

fn error_at(loc: SourceLocation, message: impl Into<String>) -> ParseError {
    ParseError::at(message, loc.line, loc.column)
}

fn implicit_union(mut nodes: Vec<Node>) -> Option<Node> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(Node::union(nodes)),
    }
}

/// Variables visible at the current point of the program
#[derive(Default)]
struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    fn statement(&mut self, pair: Pair<'_>) -> ParseResult<Option<Node>> {
        let Some(inner) = pair.into_inner().next() else {
            return Ok(None);
        };

        match inner.as_rule() {
            Rule::assignment => {
                self.assign(inner)?;
                Ok(None)
            }
            Rule::primitive_stmt => self.primitive(inner).map(Some),
            Rule::transform_stmt => self.transform(inner),
            Rule::boolean_stmt => self.boolean(inner),
            Rule::block => self.block(inner).map(implicit_union),
            _ => Ok(None),
        }
    }

    fn assign(&mut self, pair: Pair<'_>) -> ParseResult<()> {
        let loc = location(&pair);
        let mut inner = pair.into_inner();
        let (Some(name), Some(expr)) = (inner.next(), inner.next()) else {
            return Err(error_at(loc, "malformed assignment"));
        };
        let value = self.expr(expr)?;
        self.vars.insert(name.as_str().to_string(), value);
        Ok(())
    }

    /// Statements of a `{ ... }` block; assignments inside stay local to it
    fn block(&mut self, pair: Pair<'_>) -> ParseResult<Vec<Node>> {
        let saved = self.vars.clone();
        let mut nodes = Vec::new();
        let mut result = Ok(());
        for stmt in pair.into_inner() {
            match self.statement(stmt) {
                Ok(node) => nodes.extend(node),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.vars = saved;
        result.map(|_| nodes)
    }

    fn body(&mut self, pair: Option<Pair<'_>>) -> ParseResult<Vec<Node>> {
        let Some(pair) = pair else {
            return Ok(Vec::new());
        };
        // block_or_stmt wraps exactly one block or statement
        let inner = match pair.as_rule() {
            Rule::block_or_stmt => match pair.into_inner().next() {
                Some(inner) => inner,
                None => return Ok(Vec::new()),
            },
            _ => pair,
        };

        match inner.as_rule() {
            Rule::block => self.block(inner),
            Rule::statement => Ok(self.statement(inner)?.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// Split a call into its arguments and optional child body
    fn call<'i>(&self, pair: Pair<'i>) -> ParseResult<(Params, Option<Pair<'i>>)> {
        let mut params = Params::new(location(&pair));
        let mut body = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::param_list => params = self.params(inner, params.location)?,
                Rule::block_or_stmt => body = Some(inner),
                _ => {}
            }
        }
        Ok((params, body))
    }

    fn primitive(&mut self, pair: Pair<'_>) -> ParseResult<Node> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::new("empty primitive"))?;
        let rule = inner.as_rule();
        let (params, _) = self.call(inner)?;
        let loc = params.location;

        let node = match rule {
            Rule::cube_stmt => {
                let size = params
                    .vector("size", Some(0))?
                    .unwrap_or_else(|| Vec3::repeat(1.0));
                let center = params.flag("center", Some(1))?.unwrap_or(false);
                Node::new(NodeKind::Primitive(Primitive::Cube { size, center }))
            }
            Rule::sphere_stmt => {
                let radius = match params.number("r", Some(0))? {
                    Some(r) => r,
                    None => params.number("d", None)?.map(|d| d / 2.0).unwrap_or(1.0),
                };
                let segments = self.segments(&params)?;
                Node::new(NodeKind::Primitive(Primitive::Sphere { radius, segments }))
            }
            Rule::cylinder_stmt => return self.cylinder(&params),
            _ => return Err(error_at(loc, "unknown primitive")),
        };
        Ok(node.with_location(loc))
    }

    fn cylinder(&self, params: &Params) -> ParseResult<Node> {
        let loc = params.location;
        let height = params.number("h", Some(0))?.unwrap_or(1.0);

        let radius = match params.number("r", None)? {
            Some(r) => r,
            None => params.number("d", None)?.map(|d| d / 2.0).unwrap_or(1.0),
        };
        let radius_bottom = match params.number("r1", Some(1))? {
            Some(r) => r,
            None => params.number("d1", None)?.map(|d| d / 2.0).unwrap_or(radius),
        };
        let radius_top = match params.number("r2", Some(2))? {
            Some(r) => r,
            None => params.number("d2", None)?.map(|d| d / 2.0).unwrap_or(radius),
        };
        let center = params.flag("center", Some(3))?.unwrap_or(false);
        let segments = self.segments(params)?;

        let node = Node::new(NodeKind::Primitive(Primitive::Cylinder {
            radius_top,
            radius_bottom,
            height,
            segments,
        }))
        .with_location(loc);

        if center {
            // Cylinders are built from z = 0 up; shift down to center them
            return Ok(Node::translate(Vec3::new(0.0, 0.0, -height / 2.0), node).with_location(loc));
        }
        Ok(node)
    }

    /// `$fn` from the call, else from an enclosing assignment, else 0
    fn segments(&self, params: &Params) -> ParseResult<u32> {
        let explicit = params.number("$fn", None)?;
        let inherited = match self.vars.get("$fn") {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        };
        Ok(explicit.or(inherited).map_or(0, |n| n.max(0.0).round() as u32))
    }

    fn transform(&mut self, pair: Pair<'_>) -> ParseResult<Option<Node>> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::new("empty transform"))?;
        let rule = inner.as_rule();
        let (params, body) = self.call(inner)?;
        let loc = params.location;

        let op = match rule {
            Rule::translate_stmt => {
                TransformOp::Translate(params.vector("v", Some(0))?.unwrap_or_else(Vec3::zeros))
            }
            Rule::rotate_stmt => {
                // A scalar angle rotates about Z
                let degrees = match params.value("a", Some(0)) {
                    Some(Value::Number(angle)) => Vec3::new(0.0, 0.0, *angle),
                    Some(value) => value.to_vec3(loc)?,
                    None => Vec3::zeros(),
                };
                TransformOp::Rotate(degrees)
            }
            Rule::scale_stmt => {
                TransformOp::Scale(params.vector("v", Some(0))?.unwrap_or_else(|| Vec3::repeat(1.0)))
            }
            _ => return Err(error_at(loc, "unknown transform")),
        };

        let children = self.body(body)?;
        let Some(child) = implicit_union(children) else {
            log::debug!("dropping {} with no children at {}:{}", op.type_name(), loc.line, loc.column);
            return Ok(None);
        };
        Ok(Some(Node::transform(op, child).with_location(loc)))
    }

    fn boolean(&mut self, pair: Pair<'_>) -> ParseResult<Option<Node>> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| ParseError::new("empty boolean"))?;
        let op = match inner.as_rule() {
            Rule::union_stmt => BooleanKind::Union,
            Rule::difference_stmt => BooleanKind::Difference,
            Rule::intersection_stmt => BooleanKind::Intersection,
            _ => return Err(error_at(location(&inner), "unknown boolean operation")),
        };
        let (params, body) = self.call(inner)?;

        let children = self.body(body)?;
        if children.is_empty() {
            return Ok(None);
        }
        Ok(Some(Node::boolean(op, children).with_location(params.location)))
    }

    fn params(&self, pair: Pair<'_>, location: SourceLocation) -> ParseResult<Params> {
        let mut params = Params::new(location);

        for param in pair.into_inner() {
            let mut param_inner = param.into_inner();
            let Some(first) = param_inner.next() else {
                continue;
            };

            match (first.as_rule(), param_inner.next()) {
                (Rule::ident, Some(expr)) => {
                    let value = self.expr(expr)?;
                    params.named.insert(first.as_str().to_string(), value);
                }
                _ => {
                    let value = self.expr(first)?;
                    params.positional.push(value);
                }
            }
        }

        Ok(params)
    }

    fn expr(&self, pair: Pair<'_>) -> ParseResult<Value> {
        let loc = location(&pair);
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| error_at(loc, "empty expression"))?;

        match inner.as_rule() {
            Rule::number => inner
                .as_str()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|e| error_at(loc, format!("invalid number '{}': {}", inner.as_str(), e))),
            Rule::vector => {
                let mut values = Vec::new();
                if let Some(expr_list) = inner.into_inner().next() {
                    for expr in expr_list.into_inner() {
                        match self.expr(expr)? {
                            Value::Number(n) => values.push(n),
                            other => {
                                return Err(error_at(
                                    loc,
                                    format!("vector elements must be numbers, got {}", other.type_name()),
                                ))
                            }
                        }
                    }
                }
                Ok(Value::Vector(values))
            }
            Rule::boolean => Ok(Value::Boolean(inner.as_str() == "true")),
            Rule::ident => self
                .vars
                .get(inner.as_str())
                .cloned()
                .ok_or_else(|| error_at(loc, format!("unknown variable '{}'", inner.as_str()))),
            _ => Err(error_at(loc, "unsupported expression")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Vector(Vec<f64>),
    Boolean(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Vector(_) => "vector",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Numbers fill every axis; short vectors pad with zero
    fn to_vec3(&self, loc: SourceLocation) -> ParseResult<Vec3> {
        match self {
            Value::Number(n) => Ok(Vec3::repeat(*n)),
            Value::Vector(v) => match v.as_slice() {
                [x] => Ok(Vec3::repeat(*x)),
                [x, y] => Ok(Vec3::new(*x, *y, 0.0)),
                [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
                _ => Err(error_at(
                    loc,
                    format!("expected 1 to 3 components, got {}", v.len()),
                )),
            },
            Value::Boolean(_) => Err(error_at(loc, "expected a vector, got boolean")),
        }
    }
}

/// Call arguments
struct Params {
    location: SourceLocation,
    named: HashMap<String, Value>,
    positional: Vec<Value>,
}

impl Params {
    fn new(location: SourceLocation) -> Self {
        Self {
            location,
            named: HashMap::new(),
            positional: Vec::new(),
        }
    }

    /// Named argument, falling back to the positional one at `index`
    fn value(&self, name: &str, index: Option<usize>) -> Option<&Value> {
        self.named
            .get(name)
            .or_else(|| index.and_then(|i| self.positional.get(i)))
    }

    fn number(&self, name: &str, index: Option<usize>) -> ParseResult<Option<f64>> {
        match self.value(name, index) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(error_at(
                self.location,
                format!("'{}' must be a number, got {}", name, other.type_name()),
            )),
        }
    }

    fn vector(&self, name: &str, index: Option<usize>) -> ParseResult<Option<Vec3>> {
        self.value(name, index)
            .map(|value| value.to_vec3(self.location))
            .transpose()
    }

    fn flag(&self, name: &str, index: Option<usize>) -> ParseResult<Option<bool>> {
        match self.value(name, index) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(error_at(
                self.location,
                format!("'{}' must be a boolean, got {}", name, other.type_name()),
            )),
        }
    }
}
