//! Constructors for filter and geometry nodes.
//!
//! The factory is the single place tree nodes are made, so validation
//! (DE-9IM patterns, ring closure, reference-system codes) and
//! normalization (negation wrapping, conjunction flattening) happen once.
//! It is stateless and injected into the builder, so embedders can
//! construct trees directly without going through the parser.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::ast::{CompareOp, Expr, Filter, Like, SpatialOp};
use crate::crs::{self, Crs, CrsError};
use crate::geometry::{Coordinate, Envelope, Geometry, Polygon, Shape};
use crate::value::Value;

/// A node constructor rejected its arguments.
#[derive(Debug)]
pub enum FactoryError {
    /// A RELATE pattern that is not nine characters over `T F * 0 1 2`
    InvalidRelatePattern(String),

    /// Reference-system resolution failed
    Crs(CrsError),

    /// Structurally invalid operands
    InvalidArgument(String),
}

impl std::fmt::Display for FactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryError::InvalidRelatePattern(pattern) => {
                write!(f, "invalid DE-9IM pattern '{}'", pattern)
            }
            FactoryError::Crs(err) => write!(f, "{}", err),
            FactoryError::InvalidArgument(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for FactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FactoryError::Crs(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CrsError> for FactoryError {
    fn from(err: CrsError) -> Self {
        FactoryError::Crs(err)
    }
}

/// Stateless constructor set for filters, expressions and geometries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterFactory;

impl FilterFactory {
    pub fn new() -> Self {
        FilterFactory
    }

    // ----- logic -----

    /// Conjunction. Nested conjunction children are flattened so chained
    /// `AND`s build one n-ary node.
    pub fn and(&self, children: Vec<Filter>) -> Filter {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Filter::And(grandchildren) => flat.extend(grandchildren),
                other => flat.push(other),
            }
        }
        Filter::And(flat)
    }

    /// Disjunction, flattened like [`FilterFactory::and`].
    pub fn or(&self, children: Vec<Filter>) -> Filter {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Filter::Or(grandchildren) => flat.extend(grandchildren),
                other => flat.push(other),
            }
        }
        Filter::Or(flat)
    }

    pub fn not(&self, filter: Filter) -> Filter {
        Filter::Not(Box::new(filter))
    }

    // ----- comparisons and predicates -----

    pub fn compare(&self, op: CompareOp, left: Expr, right: Expr) -> Filter {
        Filter::Compare { op, left, right }
    }

    /// `<>` is negated equality; there is no distinct node for it.
    pub fn not_equal(&self, left: Expr, right: Expr) -> Filter {
        self.not(self.compare(CompareOp::Equal, left, right))
    }

    pub fn between(&self, test: Expr, lower: Expr, upper: Expr) -> Filter {
        Filter::Between { test, lower, upper }
    }

    pub fn like(&self, expr: Expr, pattern: impl Into<String>, case_insensitive: bool) -> Filter {
        Filter::Like(Like::new(expr, pattern, case_insensitive))
    }

    pub fn is_null(&self, expr: Expr) -> Filter {
        Filter::IsNull(expr)
    }

    /// Membership test: `expr IN (a, b, ...)` builds a disjunction of
    /// equality comparisons, one per element.
    pub fn in_list(&self, test: Expr, elements: Vec<Expr>) -> Result<Filter, FactoryError> {
        if elements.is_empty() {
            return Err(FactoryError::InvalidArgument(
                "IN requires at least one element".to_string(),
            ));
        }
        let mut children: Vec<Filter> = elements
            .into_iter()
            .map(|element| self.compare(CompareOp::Equal, test.clone(), element))
            .collect();
        if children.len() == 1 {
            return Ok(children.pop().unwrap_or(Filter::Exclude));
        }
        Ok(self.or(children))
    }

    /// Id filter; duplicate ids collapse.
    pub fn id(&self, ids: impl IntoIterator<Item = String>) -> Filter {
        Filter::Id(ids.into_iter().collect::<BTreeSet<String>>())
    }

    // ----- spatial -----

    pub fn spatial(&self, op: SpatialOp, left: Expr, right: Expr) -> Filter {
        Filter::Spatial { op, left, right }
    }

    /// DE-9IM relation. The pattern must be exactly nine characters over
    /// `T`, `F`, `*`, `0`, `1`, `2` (case-insensitive for T/F).
    pub fn relate(
        &self,
        left: Expr,
        right: Expr,
        pattern: impl Into<String>,
    ) -> Result<Filter, FactoryError> {
        let pattern = pattern.into().to_ascii_uppercase();
        let valid = pattern.len() == 9
            && pattern.chars().all(|c| matches!(c, 'T' | 'F' | '*' | '0' | '1' | '2'));
        if !valid {
            return Err(FactoryError::InvalidRelatePattern(pattern));
        }
        Ok(Filter::Relate { left, right, pattern })
    }

    /// Bounding-box filter. Bounds arrive in grammar order (min-x, min-y,
    /// max-x, max-y); the envelope normalizes them. A present `crs`
    /// identifier must resolve.
    pub fn bbox(
        &self,
        expr: Expr,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        crs: Option<&str>,
    ) -> Result<Filter, FactoryError> {
        let crs = match crs {
            Some(identifier) => Some(crs::resolve(identifier)?),
            None => None,
        };
        Ok(Filter::BBox {
            expr,
            bounds: Envelope::new(min_x, min_y, max_x, max_y),
            crs,
        })
    }

    pub fn distance(
        &self,
        left: Expr,
        right: Expr,
        distance: f64,
        units: Option<String>,
        within: bool,
    ) -> Result<Filter, FactoryError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(FactoryError::InvalidArgument(
                "distance must be a non-negative number".to_string(),
            ));
        }
        Ok(Filter::Distance {
            left,
            right,
            distance,
            units,
            within,
        })
    }

    // ----- temporal -----
    //
    // Temporal constructors dispatch on the built operand's value: an
    // instant operand becomes an ordering comparison, a period operand
    // becomes a comparison against the matching endpoint or an interval
    // node.

    pub fn before(&self, test: Expr, operand: Expr) -> Result<Filter, FactoryError> {
        match Self::temporal_operand(&operand)? {
            TemporalOperand::Instant(t) => {
                Ok(self.compare(CompareOp::Less, test, Expr::Literal(Value::Instant(t))))
            }
            TemporalOperand::Period { begin, .. } => {
                Ok(self.compare(CompareOp::Less, test, Expr::Literal(Value::Instant(begin))))
            }
        }
    }

    pub fn after(&self, test: Expr, operand: Expr) -> Result<Filter, FactoryError> {
        match Self::temporal_operand(&operand)? {
            TemporalOperand::Instant(t) => {
                Ok(self.compare(CompareOp::Greater, test, Expr::Literal(Value::Instant(t))))
            }
            TemporalOperand::Period { end, .. } => {
                Ok(self.compare(CompareOp::Greater, test, Expr::Literal(Value::Instant(end))))
            }
        }
    }

    /// DURING requires a period operand.
    pub fn during(&self, test: Expr, operand: Expr) -> Result<Filter, FactoryError> {
        match Self::temporal_operand(&operand)? {
            TemporalOperand::Period { begin, end } => {
                Ok(Filter::Interval { test, begin, end })
            }
            TemporalOperand::Instant(_) => Err(FactoryError::InvalidArgument(
                "DURING requires a period operand".to_string(),
            )),
        }
    }

    pub fn before_or_during(&self, test: Expr, operand: Expr) -> Result<Filter, FactoryError> {
        match Self::temporal_operand(&operand)? {
            TemporalOperand::Period { end, .. } => Ok(self.compare(
                CompareOp::LessEqual,
                test,
                Expr::Literal(Value::Instant(end)),
            )),
            TemporalOperand::Instant(_) => Err(FactoryError::InvalidArgument(
                "BEFORE OR DURING requires a period operand".to_string(),
            )),
        }
    }

    pub fn during_or_after(&self, test: Expr, operand: Expr) -> Result<Filter, FactoryError> {
        match Self::temporal_operand(&operand)? {
            TemporalOperand::Period { begin, .. } => Ok(self.compare(
                CompareOp::GreaterEqual,
                test,
                Expr::Literal(Value::Instant(begin)),
            )),
            TemporalOperand::Instant(_) => Err(FactoryError::InvalidArgument(
                "DURING OR AFTER requires a period operand".to_string(),
            )),
        }
    }

    fn temporal_operand(operand: &Expr) -> Result<TemporalOperand, FactoryError> {
        match operand.as_literal() {
            Some(Value::Instant(t)) => Ok(TemporalOperand::Instant(*t)),
            Some(Value::Period { begin, end }) => Ok(TemporalOperand::Period {
                begin: *begin,
                end: *end,
            }),
            _ => Err(FactoryError::InvalidArgument(
                "temporal predicates require a date-time or period operand".to_string(),
            )),
        }
    }

    // ----- geometry -----

    pub fn point(&self, coordinate: Coordinate) -> Geometry {
        Geometry::new(Shape::Point(coordinate))
    }

    pub fn line_string(&self, coordinates: Vec<Coordinate>) -> Result<Geometry, FactoryError> {
        if coordinates.len() < 2 {
            return Err(FactoryError::InvalidArgument(
                "a line string requires at least two coordinates".to_string(),
            ));
        }
        Ok(Geometry::new(Shape::LineString(coordinates)))
    }

    /// Rings must be closed (first coordinate equal to the last) and carry
    /// at least four coordinates.
    pub fn linear_ring(&self, coordinates: Vec<Coordinate>) -> Result<Vec<Coordinate>, FactoryError> {
        if coordinates.len() < 4 {
            return Err(FactoryError::InvalidArgument(
                "a ring requires at least four coordinates".to_string(),
            ));
        }
        if coordinates.first() != coordinates.last() {
            return Err(FactoryError::InvalidArgument(
                "a ring must be closed".to_string(),
            ));
        }
        Ok(coordinates)
    }

    /// Rings arrive in source order: shell first, then holes.
    pub fn polygon(&self, mut rings: Vec<Vec<Coordinate>>) -> Result<Geometry, FactoryError> {
        if rings.is_empty() {
            return Err(FactoryError::InvalidArgument(
                "a polygon requires at least one ring".to_string(),
            ));
        }
        let shell = rings.remove(0);
        Ok(Geometry::new(Shape::Polygon(Polygon {
            shell,
            holes: rings,
        })))
    }

    pub fn multi_point(&self, coordinates: Vec<Coordinate>) -> Geometry {
        Geometry::new(Shape::MultiPoint(coordinates))
    }

    pub fn multi_line_string(&self, lines: Vec<Vec<Coordinate>>) -> Geometry {
        Geometry::new(Shape::MultiLineString(lines))
    }

    pub fn multi_polygon(&self, polygons: Vec<Polygon>) -> Geometry {
        Geometry::new(Shape::MultiPolygon(polygons))
    }

    pub fn collection(&self, children: Vec<Geometry>) -> Geometry {
        Geometry::new(Shape::Collection(children))
    }

    /// Envelope bounds in grammar order: min-x, max-x, max-y, min-y.
    pub fn envelope(&self, min_x: f64, max_x: f64, max_y: f64, min_y: f64) -> Geometry {
        Geometry::new(Shape::Envelope(Envelope::new(min_x, min_y, max_x, max_y)))
    }

    pub fn tag_crs(&self, geometry: Geometry, crs: Crs) -> Geometry {
        Geometry {
            shape: geometry.shape,
            crs: Some(crs),
        }
    }
}

enum TemporalOperand {
    Instant(DateTime<Utc>),
    Period {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}
