//! The build stack shared between the parser's reduce events and the filter
//! builder.
//!
//! Every closed grammar production pushes one [`BuildResult`]; parent
//! productions pop their operands back off in reverse order. Typed pop
//! helpers return an error string describing the shape mismatch, which the
//! builder converts into a positioned semantic error.

use chrono::Duration;

use crate::ast::{Expr, Filter};
use crate::geometry::Coordinate;
use crate::node::NodeType;
use crate::parser::SourceToken;
use crate::value::Value;

/// An intermediate result produced by closing one grammar production.
#[derive(Debug, Clone)]
pub enum Built {
    Expression(Expr),
    Filter(Filter),
    Coordinate(Coordinate),
    Ring(Vec<Coordinate>),
    Identifier(String),
    Duration(Duration),
    /// Marks where a nestable variable-arity production opened, so its
    /// closing run pop stops at its own operands.
    Begin,
}

impl Built {
    fn shape_name(&self) -> &'static str {
        match self {
            Built::Expression(_) => "expression",
            Built::Filter(_) => "filter",
            Built::Coordinate(_) => "coordinate",
            Built::Ring(_) => "ring",
            Built::Identifier(_) => "identifier",
            Built::Duration(_) => "duration",
            Built::Begin => "begin mark",
        }
    }
}

/// A stack entry: the built result plus the token and production that
/// produced it, kept for error reporting and run detection.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub built: Built,
    pub token: SourceToken,
    pub node: NodeType,
}

/// LIFO stack of intermediate build results.
#[derive(Debug, Default)]
pub struct ResultStack {
    items: Vec<BuildResult>,
}

impl ResultStack {
    pub fn new() -> Self {
        ResultStack { items: Vec::new() }
    }

    pub fn push(&mut self, built: Built, token: SourceToken, node: NodeType) {
        self.items.push(BuildResult { built, token, node });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&BuildResult> {
        self.items.last()
    }

    pub fn pop(&mut self) -> Result<BuildResult, String> {
        self.items
            .pop()
            .ok_or_else(|| "build stack is empty".to_string())
    }

    pub fn pop_expression(&mut self) -> Result<Expr, String> {
        match self.pop()?.built {
            Built::Expression(expr) => Ok(expr),
            other => Err(format!("expected an expression, found {}", other.shape_name())),
        }
    }

    pub fn pop_filter(&mut self) -> Result<Filter, String> {
        match self.pop()?.built {
            Built::Filter(filter) => Ok(filter),
            other => Err(format!("expected a filter, found {}", other.shape_name())),
        }
    }

    /// Pop a literal value off the stack.
    pub fn pop_literal(&mut self) -> Result<Value, String> {
        match self.pop()?.built {
            Built::Expression(Expr::Literal(value)) => Ok(value),
            Built::Expression(_) => Err("expected a literal, found a computed expression".into()),
            other => Err(format!("expected a literal, found {}", other.shape_name())),
        }
    }

    /// Pop a numeric literal as f64.
    pub fn pop_number(&mut self) -> Result<f64, String> {
        let value = self.pop_literal()?;
        value
            .as_double()
            .ok_or_else(|| format!("expected a number, found {}", value.kind_name()))
    }

    /// Pop a string literal.
    pub fn pop_string(&mut self) -> Result<String, String> {
        match self.pop_literal()? {
            Value::Str(s) => Ok(s),
            other => Err(format!("expected a string, found {}", other.kind_name())),
        }
    }

    pub fn pop_coordinate(&mut self) -> Result<Coordinate, String> {
        match self.pop()?.built {
            Built::Coordinate(c) => Ok(c),
            other => Err(format!("expected a coordinate, found {}", other.shape_name())),
        }
    }

    pub fn pop_ring(&mut self) -> Result<Vec<Coordinate>, String> {
        match self.pop()?.built {
            Built::Ring(ring) => Ok(ring),
            other => Err(format!("expected a ring, found {}", other.shape_name())),
        }
    }

    pub fn pop_identifier(&mut self) -> Result<String, String> {
        match self.pop()?.built {
            Built::Identifier(id) => Ok(id),
            other => Err(format!("expected an identifier, found {}", other.shape_name())),
        }
    }

    /// Pop the contiguous run of top entries matching `pred`, returned in
    /// source order (deepest first). Variable-arity productions collect
    /// their children this way.
    pub fn pop_run(&mut self, pred: impl Fn(NodeType) -> bool) -> Vec<BuildResult> {
        let mut run = Vec::new();
        while self.items.last().is_some_and(|top| pred(top.node)) {
            if let Some(top) = self.items.pop() {
                run.push(top);
            }
        }
        run.reverse();
        run
    }

    /// Pop the top run of coordinates, in source order.
    pub fn pop_coordinate_run(&mut self) -> Result<Vec<Coordinate>, String> {
        let run = self.pop_run(NodeType::is_coordinate);
        if run.is_empty() {
            return Err("expected at least one coordinate".into());
        }
        run.into_iter()
            .map(|entry| match entry.built {
                Built::Coordinate(c) => Ok(c),
                other => Err(format!("expected a coordinate, found {}", other.shape_name())),
            })
            .collect()
    }
}
