//! The default reducer: builds filter and expression trees from the
//! parser's reduce events.
//!
//! Each event pops the production's operands off the [`ResultStack`],
//! constructs the node through the injected [`FilterFactory`] and pushes
//! the result back. The match over [`NodeType`] is exhaustive, so an
//! unhandled production is a compile error here rather than a runtime
//! surprise.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::ast::{ArithOp, CompareOp, Expr, Filter, SpatialOp};
use crate::error::{CompileError, ErrorKind};
use crate::factory::{FactoryError, FilterFactory};
use crate::geometry::{Coordinate, Shape};
use crate::node::NodeType;
use crate::parser::{Reducer, SourceToken};
use crate::property::PropertyRef;
use crate::stack::{Built, ResultStack};
use crate::value::Value;

pub struct FilterBuilder {
    source: String,
    factory: FilterFactory,
    stack: ResultStack,
    last_token: SourceToken,
}

impl FilterBuilder {
    pub fn new(source: impl Into<String>, factory: FilterFactory) -> Self {
        FilterBuilder {
            source: source.into(),
            factory,
            stack: ResultStack::new(),
            last_token: SourceToken {
                text: String::new(),
                position: 0,
                index: 0,
            },
        }
    }

    /// Take the finished filter. Exactly one filter must remain on the
    /// stack.
    pub fn finish_filter(mut self) -> Result<Filter, CompileError> {
        let token = self.last_token.clone();
        let filter = self
            .stack
            .pop_filter()
            .map_err(|msg| self.semantic(&token, msg))?;
        if !self.stack.is_empty() {
            return Err(self.semantic(&token, "unconsumed operands after building the filter"));
        }
        Ok(filter)
    }

    /// Take the finished expression. Exactly one expression must remain.
    pub fn finish_expression(mut self) -> Result<Expr, CompileError> {
        let token = self.last_token.clone();
        let expr = self
            .stack
            .pop_expression()
            .map_err(|msg| self.semantic(&token, msg))?;
        if !self.stack.is_empty() {
            return Err(self.semantic(&token, "unconsumed operands after building the expression"));
        }
        Ok(expr)
    }

    /// Take `count` finished filters, in source order.
    pub fn finish_filter_list(mut self, count: usize) -> Result<Vec<Filter>, CompileError> {
        let token = self.last_token.clone();
        let mut filters = Vec::with_capacity(count);
        for _ in 0..count {
            let filter = self
                .stack
                .pop_filter()
                .map_err(|msg| self.semantic(&token, msg))?;
            filters.push(filter);
        }
        if !self.stack.is_empty() {
            return Err(self.semantic(&token, "unconsumed operands after building the filter list"));
        }
        filters.reverse();
        Ok(filters)
    }

    // ----- plumbing -----

    fn semantic(&self, token: &SourceToken, message: impl Into<String>) -> CompileError {
        CompileError::new(
            ErrorKind::SemanticBuild,
            message,
            token.text.clone(),
            token.index,
            token.position,
            self.source.clone(),
        )
    }

    fn factory_failure(&self, token: &SourceToken, err: FactoryError) -> CompileError {
        let kind = match &err {
            FactoryError::Crs(_) => ErrorKind::CrsResolution,
            _ => ErrorKind::SemanticBuild,
        };
        CompileError::new(
            kind,
            err.to_string(),
            token.text.clone(),
            token.index,
            token.position,
            self.source.clone(),
        )
        .with_cause(err)
    }

    fn push_expr(&mut self, expr: Expr, token: &SourceToken, node: NodeType) {
        self.stack.push(Built::Expression(expr), token.clone(), node);
    }

    fn push_filter(&mut self, filter: Filter, token: &SourceToken, node: NodeType) {
        self.stack.push(Built::Filter(filter), token.clone(), node);
    }

    fn pop_expr(&mut self, token: &SourceToken) -> Result<Expr, CompileError> {
        self.stack
            .pop_expression()
            .map_err(|msg| self.semantic(token, msg))
    }

    fn pop_filter(&mut self, token: &SourceToken) -> Result<Filter, CompileError> {
        self.stack
            .pop_filter()
            .map_err(|msg| self.semantic(token, msg))
    }

    fn pop_number(&mut self, token: &SourceToken) -> Result<f64, CompileError> {
        self.stack
            .pop_number()
            .map_err(|msg| self.semantic(token, msg))
    }

    fn pop_string(&mut self, token: &SourceToken) -> Result<String, CompileError> {
        self.stack
            .pop_string()
            .map_err(|msg| self.semantic(token, msg))
    }

    // ----- literal construction -----

    fn build_integer(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let value = token
            .text
            .parse::<i64>()
            .map_err(|_| self.semantic(token, format!("invalid integer '{}'", token.text)))?;
        let value = match i32::try_from(value) {
            Ok(small) => Value::Int(small),
            Err(_) => Value::Long(value),
        };
        self.push_expr(Expr::Literal(value), token, NodeType::IntegerLiteral);
        Ok(())
    }

    fn build_float(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let value = token
            .text
            .parse::<f64>()
            .map_err(|_| self.semantic(token, format!("invalid number '{}'", token.text)))?;
        self.push_expr(
            Expr::Literal(Value::Double(value)),
            token,
            NodeType::FloatingLiteral,
        );
        Ok(())
    }

    fn build_instant(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let instant = parse_instant(&token.text)
            .ok_or_else(|| self.semantic(token, format!("invalid date-time '{}'", token.text)))?;
        self.push_expr(
            Expr::Literal(Value::Instant(instant)),
            token,
            NodeType::DateTimeLiteral,
        );
        Ok(())
    }

    fn build_duration(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let duration = parse_duration(&token.text)
            .ok_or_else(|| self.semantic(token, format!("invalid duration '{}'", token.text)))?;
        self.stack
            .push(Built::Duration(duration), token.clone(), NodeType::DurationLiteral);
        Ok(())
    }

    /// A period is built from its two parts: instant/instant,
    /// instant/duration or duration/instant.
    fn build_period(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let second = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
        let first = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
        let (begin, end) = match (first.built, second.built) {
            (
                Built::Expression(Expr::Literal(Value::Instant(begin))),
                Built::Expression(Expr::Literal(Value::Instant(end))),
            ) => (begin, end),
            (Built::Expression(Expr::Literal(Value::Instant(begin))), Built::Duration(d)) => {
                (begin, begin + d)
            }
            (Built::Duration(d), Built::Expression(Expr::Literal(Value::Instant(end)))) => {
                (end - d, end)
            }
            _ => {
                return Err(self.semantic(
                    token,
                    "a period joins two instants or an instant and a duration",
                ));
            }
        };
        if end < begin {
            return Err(self.semantic(token, "period end precedes its begin"));
        }
        self.push_expr(
            Expr::Literal(Value::Period { begin, end }),
            token,
            NodeType::Period,
        );
        Ok(())
    }

    /// Unary minus re-forms the original lexeme with a leading `-` and
    /// reparses it under the literal's own subtype, so the sign never
    /// changes the numeric kind.
    fn build_negative(&mut self, token: &SourceToken) -> Result<(), CompileError> {
        let operand = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
        let lexeme = format!("-{}", operand.token.text);
        let value = match (&operand.built, operand.node) {
            (Built::Expression(Expr::Literal(Value::Int(_))), _) => {
                lexeme.parse::<i32>().ok().map(Value::Int)
            }
            (Built::Expression(Expr::Literal(Value::Long(_))), _) => {
                lexeme.parse::<i64>().ok().map(Value::Long)
            }
            (Built::Expression(Expr::Literal(Value::Float(_))), _) => {
                lexeme.parse::<f32>().ok().map(Value::Float)
            }
            (Built::Expression(Expr::Literal(Value::Double(_))), _) => {
                lexeme.parse::<f64>().ok().map(Value::Double)
            }
            _ => None,
        };
        let value = value.ok_or_else(|| {
            self.semantic(token, format!("cannot negate literal '{}'", operand.token.text))
        })?;
        self.push_expr(Expr::Literal(value), token, operand.node);
        Ok(())
    }

    // ----- compound helpers -----

    fn build_compare(
        &mut self,
        op: CompareOp,
        token: &SourceToken,
    ) -> Result<(), CompileError> {
        let right = self.pop_expr(token)?;
        let left = self.pop_expr(token)?;
        let filter = self.factory.compare(op, left, right);
        self.push_filter(filter, token, NodeType::Equal);
        Ok(())
    }

    fn build_arithmetic(&mut self, op: ArithOp, token: &SourceToken, node: NodeType) -> Result<(), CompileError> {
        let right = self.pop_expr(token)?;
        let left = self.pop_expr(token)?;
        self.push_expr(
            Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            token,
            node,
        );
        Ok(())
    }

    fn build_like(
        &mut self,
        token: &SourceToken,
        case_insensitive: bool,
        negated: bool,
    ) -> Result<(), CompileError> {
        let pattern = self.pop_string(token)?;
        let expr = self.pop_expr(token)?;
        let mut filter = self.factory.like(expr, pattern, case_insensitive);
        if negated {
            filter = self.factory.not(filter);
        }
        self.push_filter(filter, token, NodeType::Like);
        Ok(())
    }

    fn build_between(&mut self, token: &SourceToken, negated: bool) -> Result<(), CompileError> {
        let upper = self.pop_expr(token)?;
        let lower = self.pop_expr(token)?;
        let test = self.pop_expr(token)?;
        let mut filter = self.factory.between(test, lower, upper);
        if negated {
            filter = self.factory.not(filter);
        }
        self.push_filter(filter, token, NodeType::Between);
        Ok(())
    }

    fn build_in(&mut self, token: &SourceToken, negated: bool) -> Result<(), CompileError> {
        let elements: Result<Vec<Expr>, String> = self
            .stack
            .pop_run(|node| node == NodeType::InListElement)
            .into_iter()
            .map(|entry| match entry.built {
                Built::Expression(expr) => Ok(expr),
                _ => Err("IN elements must be expressions".to_string()),
            })
            .collect();
        let elements = elements.map_err(|msg| self.semantic(token, msg))?;
        let test = self.pop_expr(token)?;
        let mut filter = self
            .factory
            .in_list(test, elements)
            .map_err(|err| self.factory_failure(token, err))?;
        if negated {
            filter = self.factory.not(filter);
        }
        self.push_filter(filter, token, NodeType::In);
        Ok(())
    }

    fn build_id(&mut self, token: &SourceToken, negated: bool) -> Result<(), CompileError> {
        let ids: Result<Vec<String>, String> = self
            .stack
            .pop_run(|node| node == NodeType::FeatureId)
            .into_iter()
            .map(|entry| match entry.built {
                Built::Identifier(id) => Ok(id),
                _ => Err("feature ids must be quoted strings".to_string()),
            })
            .collect();
        let ids = ids.map_err(|msg| self.semantic(token, msg))?;
        if ids.is_empty() {
            return Err(self.semantic(token, "an id filter requires at least one id"));
        }
        let mut filter = self.factory.id(ids);
        if negated {
            filter = self.factory.not(filter);
        }
        self.push_filter(filter, token, NodeType::Id);
        Ok(())
    }

    fn build_spatial(&mut self, op: SpatialOp, token: &SourceToken) -> Result<(), CompileError> {
        let right = self.pop_expr(token)?;
        let left = self.pop_expr(token)?;
        let filter = self.factory.spatial(op, left, right);
        self.push_filter(filter, token, NodeType::Intersects);
        Ok(())
    }

    fn build_temporal(
        &mut self,
        token: &SourceToken,
        make: impl Fn(&FilterFactory, Expr, Expr) -> Result<Filter, FactoryError>,
    ) -> Result<(), CompileError> {
        let operand = self.pop_expr(token)?;
        let test = self.pop_expr(token)?;
        let filter =
            make(&self.factory, test, operand).map_err(|err| self.factory_failure(token, err))?;
        self.push_filter(filter, token, NodeType::Before);
        Ok(())
    }

    fn build_bbox(&mut self, token: &SourceToken, with_crs: bool) -> Result<(), CompileError> {
        let crs = if with_crs {
            Some(self.pop_string(token)?)
        } else {
            None
        };
        // Grammar order is min-x, min-y, max-x, max-y; the stack reverses.
        let max_y = self.pop_number(token)?;
        let max_x = self.pop_number(token)?;
        let min_y = self.pop_number(token)?;
        let min_x = self.pop_number(token)?;
        let expr = self.pop_expr(token)?;
        let filter = self
            .factory
            .bbox(expr, min_x, min_y, max_x, max_y, crs.as_deref())
            .map_err(|err| self.factory_failure(token, err))?;
        self.push_filter(filter, token, NodeType::BBox);
        Ok(())
    }

    fn build_distance(&mut self, token: &SourceToken, within: bool) -> Result<(), CompileError> {
        let units = self.pop_string(token)?;
        let distance = self.pop_number(token)?;
        let right = self.pop_expr(token)?;
        let left = self.pop_expr(token)?;
        let filter = self
            .factory
            .distance(left, right, distance, Some(units), within)
            .map_err(|err| self.factory_failure(token, err))?;
        self.push_filter(filter, token, NodeType::DWithin);
        Ok(())
    }

    // ----- geometry helpers -----

    fn build_coordinate(&mut self, token: &SourceToken, three_d: bool) -> Result<(), CompileError> {
        let coordinate = if three_d {
            let z = self.pop_number(token)?;
            let y = self.pop_number(token)?;
            let x = self.pop_number(token)?;
            Coordinate::xyz(x, y, z)
        } else {
            let y = self.pop_number(token)?;
            let x = self.pop_number(token)?;
            Coordinate::xy(x, y)
        };
        let node = if three_d {
            NodeType::Coordinate3
        } else {
            NodeType::Coordinate2
        };
        self.stack.push(Built::Coordinate(coordinate), token.clone(), node);
        Ok(())
    }

    fn pop_coordinates(&mut self, token: &SourceToken) -> Result<Vec<Coordinate>, CompileError> {
        self.stack
            .pop_coordinate_run()
            .map_err(|msg| self.semantic(token, msg))
    }

    fn pop_line_run(&mut self, token: &SourceToken) -> Result<Vec<Vec<Coordinate>>, CompileError> {
        let run = self.stack.pop_run(|node| node == NodeType::LineStringMember);
        if run.is_empty() {
            return Err(self.semantic(token, "expected at least one line string"));
        }
        run.into_iter()
            .map(|entry| match entry.built {
                Built::Expression(Expr::Literal(Value::Geometry(g))) => match g.shape {
                    Shape::LineString(coords) => Ok(coords),
                    _ => Err(self.semantic(token, "expected a line string")),
                },
                _ => Err(self.semantic(token, "expected a line string")),
            })
            .collect()
    }

    fn push_geometry(
        &mut self,
        geometry: crate::geometry::Geometry,
        token: &SourceToken,
        node: NodeType,
    ) {
        self.push_expr(Expr::Literal(Value::Geometry(geometry)), token, node);
    }
}

impl Reducer for FilterBuilder {
    fn reduce(&mut self, node: NodeType, token: &SourceToken) -> Result<(), CompileError> {
        self.last_token = token.clone();
        match node {
            // Literals
            NodeType::IntegerLiteral => self.build_integer(token),
            NodeType::FloatingLiteral => self.build_float(token),
            NodeType::StringLiteral => {
                self.push_expr(
                    Expr::Literal(Value::Str(token.text.clone())),
                    token,
                    NodeType::StringLiteral,
                );
                Ok(())
            }
            NodeType::BooleanLiteral => {
                let value = token.text.eq_ignore_ascii_case("true");
                self.push_expr(
                    Expr::Literal(Value::Bool(value)),
                    token,
                    NodeType::BooleanLiteral,
                );
                Ok(())
            }
            NodeType::DateTimeLiteral => self.build_instant(token),
            NodeType::DurationLiteral => self.build_duration(token),
            NodeType::Period => self.build_period(token),
            NodeType::Negative => self.build_negative(token),

            // Expressions
            NodeType::Property => {
                self.push_expr(
                    Expr::Property(PropertyRef::new(token.text.clone())),
                    token,
                    NodeType::Property,
                );
                Ok(())
            }
            NodeType::FunctionArg => {
                let entry = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
                match entry.built {
                    Built::Expression(expr) => {
                        self.push_expr(expr, &entry.token, NodeType::FunctionArg);
                        Ok(())
                    }
                    _ => Err(self.semantic(token, "function arguments must be expressions")),
                }
            }
            NodeType::Function => {
                let args: Vec<Expr> = {
                    let run = self.stack.pop_run(|n| n == NodeType::FunctionArg);
                    let mut args = Vec::with_capacity(run.len());
                    for entry in run {
                        match entry.built {
                            Built::Expression(expr) => args.push(expr),
                            _ => {
                                return Err(
                                    self.semantic(token, "function arguments must be expressions")
                                );
                            }
                        }
                    }
                    args
                };
                self.push_expr(
                    Expr::Function {
                        name: token.text.clone(),
                        args,
                    },
                    token,
                    NodeType::Function,
                );
                Ok(())
            }
            NodeType::Add => self.build_arithmetic(ArithOp::Add, token, node),
            NodeType::Subtract => self.build_arithmetic(ArithOp::Subtract, token, node),
            NodeType::Multiply => self.build_arithmetic(ArithOp::Multiply, token, node),
            NodeType::Divide => self.build_arithmetic(ArithOp::Divide, token, node),

            // Comparisons
            NodeType::Equal => self.build_compare(CompareOp::Equal, token),
            NodeType::NotEqual => {
                let right = self.pop_expr(token)?;
                let left = self.pop_expr(token)?;
                let filter = self.factory.not_equal(left, right);
                self.push_filter(filter, token, NodeType::NotEqual);
                Ok(())
            }
            NodeType::Less => self.build_compare(CompareOp::Less, token),
            NodeType::Greater => self.build_compare(CompareOp::Greater, token),
            NodeType::LessEqual => self.build_compare(CompareOp::LessEqual, token),
            NodeType::GreaterEqual => self.build_compare(CompareOp::GreaterEqual, token),

            // Predicates
            NodeType::Between => self.build_between(token, false),
            NodeType::NotBetween => self.build_between(token, true),
            NodeType::Like => self.build_like(token, false, false),
            NodeType::NotLike => self.build_like(token, false, true),
            NodeType::ILike => self.build_like(token, true, false),
            NodeType::NotILike => self.build_like(token, true, true),
            NodeType::IsNull => {
                let expr = self.pop_expr(token)?;
                let filter = self.factory.is_null(expr);
                self.push_filter(filter, token, NodeType::IsNull);
                Ok(())
            }
            NodeType::NotNull => {
                let expr = self.pop_expr(token)?;
                let filter = self.factory.not(self.factory.is_null(expr));
                self.push_filter(filter, token, NodeType::NotNull);
                Ok(())
            }
            NodeType::InListElement => {
                let entry = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
                match entry.built {
                    Built::Expression(expr) => {
                        self.push_expr(expr, &entry.token, NodeType::InListElement);
                        Ok(())
                    }
                    _ => Err(self.semantic(token, "IN elements must be expressions")),
                }
            }
            NodeType::In => self.build_in(token, false),
            NodeType::NotIn => self.build_in(token, true),
            NodeType::FeatureId => {
                self.stack.push(
                    Built::Identifier(token.text.clone()),
                    token.clone(),
                    NodeType::FeatureId,
                );
                Ok(())
            }
            NodeType::Id => self.build_id(token, false),
            NodeType::NotId => self.build_id(token, true),

            // Logic
            NodeType::And => {
                let right = self.pop_filter(token)?;
                let left = self.pop_filter(token)?;
                let filter = self.factory.and(vec![left, right]);
                self.push_filter(filter, token, NodeType::And);
                Ok(())
            }
            NodeType::Or => {
                let right = self.pop_filter(token)?;
                let left = self.pop_filter(token)?;
                let filter = self.factory.or(vec![left, right]);
                self.push_filter(filter, token, NodeType::Or);
                Ok(())
            }
            NodeType::Not => {
                let inner = self.pop_filter(token)?;
                let filter = self.factory.not(inner);
                self.push_filter(filter, token, NodeType::Not);
                Ok(())
            }
            NodeType::Include => {
                self.push_filter(Filter::Include, token, NodeType::Include);
                Ok(())
            }
            NodeType::Exclude => {
                self.push_filter(Filter::Exclude, token, NodeType::Exclude);
                Ok(())
            }

            // Temporal
            NodeType::Before => self.build_temporal(token, FilterFactory::before),
            NodeType::After => self.build_temporal(token, FilterFactory::after),
            NodeType::During => self.build_temporal(token, FilterFactory::during),
            NodeType::BeforeOrDuring => self.build_temporal(token, FilterFactory::before_or_during),
            NodeType::DuringOrAfter => self.build_temporal(token, FilterFactory::during_or_after),

            // Spatial
            NodeType::SpatialEquals => self.build_spatial(SpatialOp::Equals, token),
            NodeType::Disjoint => self.build_spatial(SpatialOp::Disjoint, token),
            NodeType::Intersects => self.build_spatial(SpatialOp::Intersects, token),
            NodeType::Touches => self.build_spatial(SpatialOp::Touches, token),
            NodeType::Crosses => self.build_spatial(SpatialOp::Crosses, token),
            NodeType::Within => self.build_spatial(SpatialOp::Within, token),
            NodeType::Contains => self.build_spatial(SpatialOp::Contains, token),
            NodeType::Overlaps => self.build_spatial(SpatialOp::Overlaps, token),
            NodeType::Relate => {
                let pattern = self.pop_string(token)?;
                let right = self.pop_expr(token)?;
                let left = self.pop_expr(token)?;
                let filter = self
                    .factory
                    .relate(left, right, pattern)
                    .map_err(|err| self.factory_failure(token, err))?;
                self.push_filter(filter, token, NodeType::Relate);
                Ok(())
            }
            NodeType::BBox => self.build_bbox(token, false),
            NodeType::BBoxWithCrs => self.build_bbox(token, true),
            NodeType::DWithin => self.build_distance(token, true),
            NodeType::Beyond => self.build_distance(token, false),

            // Geometry
            NodeType::Coordinate2 => self.build_coordinate(token, false),
            NodeType::Coordinate3 => self.build_coordinate(token, true),
            NodeType::Point => {
                let coordinate = self
                    .stack
                    .pop_coordinate()
                    .map_err(|msg| self.semantic(token, msg))?;
                let geometry = self.factory.point(coordinate);
                self.push_geometry(geometry, token, NodeType::Point);
                Ok(())
            }
            NodeType::LineString | NodeType::LineStringMember => {
                let coordinates = self.pop_coordinates(token)?;
                let geometry = self
                    .factory
                    .line_string(coordinates)
                    .map_err(|err| self.factory_failure(token, err))?;
                self.push_geometry(geometry, token, node);
                Ok(())
            }
            NodeType::LinearRing => {
                let coordinates = self.pop_coordinates(token)?;
                let ring = self
                    .factory
                    .linear_ring(coordinates)
                    .map_err(|err| self.factory_failure(token, err))?;
                self.stack
                    .push(Built::Ring(ring), token.clone(), NodeType::LinearRing);
                Ok(())
            }
            NodeType::Polygon | NodeType::PolygonMember => {
                let rings: Result<Vec<Vec<Coordinate>>, String> = self
                    .stack
                    .pop_run(|n| n == NodeType::LinearRing)
                    .into_iter()
                    .map(|entry| match entry.built {
                        Built::Ring(ring) => Ok(ring),
                        _ => Err("polygon rings must be coordinate rings".to_string()),
                    })
                    .collect();
                let rings = rings.map_err(|msg| self.semantic(token, msg))?;
                let geometry = self
                    .factory
                    .polygon(rings)
                    .map_err(|err| self.factory_failure(token, err))?;
                self.push_geometry(geometry, token, node);
                Ok(())
            }
            NodeType::MultiPoint => {
                let coordinates = self.pop_coordinates(token)?;
                let geometry = self.factory.multi_point(coordinates);
                self.push_geometry(geometry, token, NodeType::MultiPoint);
                Ok(())
            }
            NodeType::MultiLineString => {
                let lines = self.pop_line_run(token)?;
                let geometry = self.factory.multi_line_string(lines);
                self.push_geometry(geometry, token, NodeType::MultiLineString);
                Ok(())
            }
            NodeType::MultiPolygon => {
                let polygons: Result<Vec<crate::geometry::Polygon>, CompileError> = self
                    .stack
                    .pop_run(|n| n == NodeType::PolygonMember)
                    .into_iter()
                    .map(|entry| match entry.built {
                        Built::Expression(Expr::Literal(Value::Geometry(g))) => match g.shape {
                            Shape::Polygon(p) => Ok(p),
                            _ => Err(self.semantic(token, "expected a polygon")),
                        },
                        _ => Err(self.semantic(token, "expected a polygon")),
                    })
                    .collect();
                let geometry = self.factory.multi_polygon(polygons?);
                self.push_geometry(geometry, token, NodeType::MultiPolygon);
                Ok(())
            }
            NodeType::GeometryMember => {
                let entry = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
                match entry.built {
                    Built::Expression(Expr::Literal(Value::Geometry(g))) => {
                        self.push_geometry(g, &entry.token, NodeType::GeometryMember);
                        Ok(())
                    }
                    _ => Err(self.semantic(token, "collection members must be geometries")),
                }
            }
            NodeType::GeometryCollectionBegin => {
                self.stack
                    .push(Built::Begin, token.clone(), NodeType::GeometryCollectionBegin);
                Ok(())
            }
            NodeType::GeometryCollection => {
                let children: Result<Vec<crate::geometry::Geometry>, CompileError> = self
                    .stack
                    .pop_run(|n| n == NodeType::GeometryMember)
                    .into_iter()
                    .map(|entry| match entry.built {
                        Built::Expression(Expr::Literal(Value::Geometry(g))) => Ok(g),
                        _ => Err(self.semantic(token, "expected a geometry")),
                    })
                    .collect();
                let children = children?;
                let entry = self.stack.pop().map_err(|msg| self.semantic(token, msg))?;
                if entry.node != NodeType::GeometryCollectionBegin {
                    return Err(self.semantic(token, "collection is missing its begin mark"));
                }
                let geometry = self.factory.collection(children);
                self.push_geometry(geometry, token, NodeType::GeometryCollection);
                Ok(())
            }
            NodeType::Envelope => {
                // Grammar order is min-x, max-x, max-y, min-y.
                let min_y = self.pop_number(token)?;
                let max_y = self.pop_number(token)?;
                let max_x = self.pop_number(token)?;
                let min_x = self.pop_number(token)?;
                let geometry = self.factory.envelope(min_x, max_x, max_y, min_y);
                self.push_geometry(geometry, token, NodeType::Envelope);
                Ok(())
            }
        }
    }
}

/// Parse an RFC 3339 date-time, a bare date (midnight UTC) or a local
/// date-time (assumed UTC).
pub(crate) fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Parse an ISO 8601 duration. Calendar units use the fixed equivalences
/// of one year = 365 days and one month = 30 days; exact calendar arithmetic
/// is out of scope for filter periods.
pub(crate) fn parse_duration(text: &str) -> Option<Duration> {
    let mut chars = text.chars();
    if !matches!(chars.next(), Some('P' | 'p')) {
        return None;
    }
    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;
    for ch in chars {
        match ch {
            'T' | 't' => {
                if !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            d if d.is_ascii_digit() => number.push(d),
            unit => {
                let amount: i64 = number.parse().ok()?;
                number.clear();
                saw_component = true;
                let span = match (unit.to_ascii_uppercase(), in_time) {
                    ('Y', false) => Duration::days(amount.checked_mul(365)?),
                    ('M', false) => Duration::days(amount.checked_mul(30)?),
                    ('W', false) => Duration::weeks(amount),
                    ('D', false) => Duration::days(amount),
                    ('H', true) => Duration::hours(amount),
                    ('M', true) => Duration::minutes(amount),
                    ('S', true) => Duration::seconds(amount),
                    _ => return None,
                };
                total += span;
            }
        }
    }
    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}
