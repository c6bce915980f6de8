//! Evaluation of compiled filters and expressions against candidates.
//!
//! Evaluation is read-only and never mutates the tree, so a compiled
//! filter can be shared across threads and evaluated concurrently. Missing
//! properties resolve to null, and predicates over null operands are
//! false rather than errors; only genuine type misuse (arithmetic over
//! strings, unknown functions, reference-system mismatches) surfaces as an
//! [`EvalError`].

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use regex::Regex;

use crate::ast::{ArithOp, CompareOp, Expr, Filter, Like, SpatialOp};
use crate::error::EvalError;
use crate::geometry::{relate_matrix, Envelope, Geometry};
use crate::property::{Candidate, Descriptor, ID_PROPERTY};
use crate::value::Value;

impl Filter {
    /// Evaluate this filter against a candidate record.
    pub fn evaluate(&self, candidate: &dyn Candidate) -> Result<bool, EvalError> {
        match self {
            Filter::Include => Ok(true),
            Filter::Exclude => Ok(false),
            Filter::And(children) => {
                for child in children {
                    if !child.evaluate(candidate)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(children) => {
                for child in children {
                    if child.evaluate(candidate)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(inner) => Ok(!inner.evaluate(candidate)?),
            Filter::Compare { op, left, right } => {
                let left = left.evaluate(candidate)?;
                let right = right.evaluate(candidate)?;
                if left == Value::Null || right == Value::Null {
                    return Ok(false);
                }
                Ok(compare(*op, &left, &right))
            }
            Filter::Between { test, lower, upper } => {
                let test = test.evaluate(candidate)?;
                if test == Value::Null {
                    return Ok(false);
                }
                let lower = lower.evaluate(candidate)?;
                let upper = upper.evaluate(candidate)?;
                // Bounds that cannot be brought to the test value's kind
                // make the predicate false, not an error.
                let (Some(lower), Some(upper)) = (
                    lower.coerce_to_kind_of(&test),
                    upper.coerce_to_kind_of(&test),
                ) else {
                    return Ok(false);
                };
                let lower_ok = matches!(
                    lower.try_compare(&test),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                );
                let upper_ok = matches!(
                    test.try_compare(&upper),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                );
                Ok(lower_ok && upper_ok)
            }
            Filter::Like(like) => evaluate_like(like, candidate),
            Filter::IsNull(expr) => Ok(expr.evaluate(candidate)? == Value::Null),
            Filter::Id(ids) => match candidate.get(ID_PROPERTY) {
                Some(Value::Str(id)) => Ok(ids.contains(&id)),
                _ => Ok(false),
            },
            Filter::Spatial { op, left, right } => {
                let (Some(left), Some(right)) = (
                    geometry_operand(left, candidate)?,
                    geometry_operand(right, candidate)?,
                ) else {
                    return Ok(false);
                };
                check_reference_systems(&left, &right)?;
                let (Some(a), Some(b)) = (left.envelope(), right.envelope()) else {
                    return Ok(false);
                };
                Ok(evaluate_spatial(*op, &a, &b))
            }
            Filter::Relate {
                left,
                right,
                pattern,
            } => {
                let (Some(left), Some(right)) = (
                    geometry_operand(left, candidate)?,
                    geometry_operand(right, candidate)?,
                ) else {
                    return Ok(false);
                };
                check_reference_systems(&left, &right)?;
                let (Some(a), Some(b)) = (left.envelope(), right.envelope()) else {
                    return Ok(false);
                };
                Ok(matches_relate_pattern(&relate_matrix(&a, &b), pattern))
            }
            Filter::BBox { expr, bounds, crs } => {
                let Some(geometry) = geometry_operand(expr, candidate)? else {
                    return Ok(false);
                };
                if let (Some(filter_crs), Some(geometry_crs)) = (crs, &geometry.crs) {
                    if filter_crs != geometry_crs {
                        return Err(EvalError::Reprojection(format!(
                            "candidate geometry is in {} but the filter bounds are in {}",
                            geometry_crs, filter_crs
                        )));
                    }
                }
                Ok(geometry
                    .envelope()
                    .is_some_and(|env| env.intersects(bounds)))
            }
            Filter::Distance {
                left,
                right,
                distance,
                units: _,
                within,
            } => {
                let (Some(left), Some(right)) = (
                    geometry_operand(left, candidate)?,
                    geometry_operand(right, candidate)?,
                ) else {
                    return Ok(false);
                };
                check_reference_systems(&left, &right)?;
                let (Some(a), Some(b)) = (left.envelope(), right.envelope()) else {
                    return Ok(false);
                };
                let d = a.distance(&b);
                Ok(if *within { d <= *distance } else { d > *distance })
            }
            Filter::Interval { test, begin, end } => {
                let value = test.evaluate(candidate)?;
                let instant = match &value {
                    Value::Instant(t) => Some(*t),
                    Value::Str(s) => crate::builder::parse_instant(s),
                    _ => None,
                };
                Ok(instant.is_some_and(|t| *begin <= t && t <= *end))
            }
        }
    }

    /// Bind every property reference in this filter to accessors from
    /// `descriptor`. Evaluation afterwards must use candidates of the
    /// descriptor's record type.
    pub fn prepare(&self, descriptor: &Descriptor) {
        match self {
            Filter::Include | Filter::Exclude | Filter::Id(_) => {}
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.prepare(descriptor);
                }
            }
            Filter::Not(inner) => inner.prepare(descriptor),
            Filter::Compare { left, right, .. }
            | Filter::Spatial { left, right, .. }
            | Filter::Relate { left, right, .. }
            | Filter::Distance { left, right, .. } => {
                left.prepare(descriptor);
                right.prepare(descriptor);
            }
            Filter::Between { test, lower, upper } => {
                test.prepare(descriptor);
                lower.prepare(descriptor);
                upper.prepare(descriptor);
            }
            Filter::Like(like) => like.expr.prepare(descriptor),
            Filter::IsNull(expr) | Filter::BBox { expr, .. } => expr.prepare(descriptor),
            Filter::Interval { test, .. } => test.prepare(descriptor),
        }
    }
}

impl Expr {
    /// Evaluate this expression against a candidate record. Missing
    /// properties yield [`Value::Null`].
    pub fn evaluate(&self, candidate: &dyn Candidate) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Property(property) => Ok(property.resolve(candidate).unwrap_or(Value::Null)),
            Expr::Arithmetic { op, left, right } => {
                let left = left.evaluate(candidate)?;
                let right = right.evaluate(candidate)?;
                apply_arithmetic(*op, &left, &right)
            }
            Expr::Function { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(candidate)?);
                }
                apply_function(name, &values)
            }
        }
    }

    /// Bind every property reference in this expression; see
    /// [`Filter::prepare`].
    pub fn prepare(&self, descriptor: &Descriptor) {
        match self {
            Expr::Literal(_) => {}
            Expr::Property(property) => property.bind(descriptor),
            Expr::Arithmetic { left, right, .. } => {
                left.prepare(descriptor);
                right.prepare(descriptor);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.prepare(descriptor);
                }
            }
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Equal => left.loose_eq(right),
        CompareOp::Less => left.try_compare(right) == Some(std::cmp::Ordering::Less),
        CompareOp::Greater => left.try_compare(right) == Some(std::cmp::Ordering::Greater),
        CompareOp::LessEqual => matches!(
            left.try_compare(right),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        ),
        CompareOp::GreaterEqual => matches!(
            left.try_compare(right),
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        ),
    }
}

fn evaluate_like(like: &Like, candidate: &dyn Candidate) -> Result<bool, EvalError> {
    let value = like.expr.evaluate(candidate)?;
    if value == Value::Null {
        return Ok(false);
    }
    let text = value.as_text();
    let compiled = like
        .compiled
        .get_or_init(|| Regex::new(&like_regex(like)));
    match compiled {
        Ok(regex) => Ok(regex.is_match(&text)),
        Err(err) => Err(EvalError::InvalidPattern(err.to_string())),
    }
}

/// Translate a SQL92 pattern into an anchored regular expression. `%`
/// becomes `.*`, `_` becomes `.`, the escape character quotes the next
/// pattern character and everything else is taken literally.
fn like_regex(like: &Like) -> String {
    let mut out = String::with_capacity(like.pattern.len() + 8);
    out.push_str("(?s)");
    if like.case_insensitive {
        out.push_str("(?i)");
    }
    out.push('^');
    let mut escaped = false;
    for ch in like.pattern.chars() {
        if escaped {
            out.push_str(&regex::escape(&ch.to_string()));
            escaped = false;
        } else if ch == like.escape {
            escaped = true;
        } else if ch == like.wildcard {
            out.push_str(".*");
        } else if ch == like.single {
            out.push('.');
        } else {
            out.push_str(&regex::escape(&ch.to_string()));
        }
    }
    // A trailing bare escape matches itself.
    if escaped {
        out.push_str(&regex::escape(&like.escape.to_string()));
    }
    out.push('$');
    out
}

/// A spatial operand: a geometry literal or a candidate property holding a
/// geometry. Anything else (including null) is no operand at all.
fn geometry_operand(
    expr: &Expr,
    candidate: &dyn Candidate,
) -> Result<Option<Geometry>, EvalError> {
    match expr.evaluate(candidate)? {
        Value::Geometry(g) => Ok(Some(g)),
        Value::Null => Ok(None),
        other => Err(EvalError::Type(format!(
            "expected a geometry operand, found {}",
            other.kind_name()
        ))),
    }
}

fn check_reference_systems(left: &Geometry, right: &Geometry) -> Result<(), EvalError> {
    if let (Some(a), Some(b)) = (&left.crs, &right.crs) {
        if a != b {
            return Err(EvalError::Reprojection(format!(
                "operands use different reference systems ({} and {})",
                a, b
            )));
        }
    }
    Ok(())
}

fn evaluate_spatial(op: SpatialOp, a: &Envelope, b: &Envelope) -> bool {
    match op {
        SpatialOp::Equals => a == b,
        SpatialOp::Disjoint => !a.intersects(b),
        SpatialOp::Intersects => a.intersects(b),
        SpatialOp::Touches => a.touches(b),
        SpatialOp::Crosses => {
            a.intersects(b) && !a.touches(b) && !a.contains(b) && !b.contains(a)
        }
        SpatialOp::Within => b.contains(a),
        SpatialOp::Contains => a.contains(b),
        SpatialOp::Overlaps => {
            a.intersects(b) && !a.touches(b) && !a.contains(b) && !b.contains(a) && a != b
        }
    }
}

/// Match a DE-9IM matrix against a pattern: `*` accepts anything, `T` any
/// non-empty intersection, `F` an empty one, and a digit the exact
/// dimension.
fn matches_relate_pattern(matrix: &[u8; 9], pattern: &str) -> bool {
    matrix.iter().zip(pattern.bytes()).all(|(&cell, wanted)| {
        match wanted {
            b'*' => true,
            b'T' => cell != b'F',
            b'F' => cell == b'F',
            digit => cell == digit,
        }
    })
}

/// Rank of a numeric kind for promotion; wider wins.
fn numeric_rank(value: &Value) -> Option<u8> {
    match value {
        Value::Int(_) => Some(0),
        Value::Long(_) => Some(1),
        Value::Float(_) => Some(2),
        Value::Double(_) => Some(3),
        _ => None,
    }
}

fn apply_arithmetic(op: ArithOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if *left == Value::Null || *right == Value::Null {
        return Ok(Value::Null);
    }
    let (Some(lr), Some(rr)) = (numeric_rank(left), numeric_rank(right)) else {
        return Err(EvalError::Type(format!(
            "cannot apply '{}' to {} and {}",
            op,
            left.kind_name(),
            right.kind_name()
        )));
    };
    let rank = lr.max(rr);

    // Integral operands stay integral, except for inexact division.
    if rank <= 1 {
        let (Some(a), Some(b)) = (integral_of(left), integral_of(right)) else {
            return Err(EvalError::Type("invalid integral operand".to_string()));
        };
        return apply_integral(op, a, b, rank == 0);
    }

    let (Some(a), Some(b)) = (left.as_double(), right.as_double()) else {
        return Err(EvalError::Type("invalid numeric operand".to_string()));
    };
    let result = apply_decimal(op, a, b)?;
    Ok(if rank == 2 {
        Value::Float(result as f32)
    } else {
        Value::Double(result)
    })
}

fn integral_of(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n as i64),
        Value::Long(n) => Some(*n),
        _ => None,
    }
}

fn narrow_integral(result: i64, narrow: bool) -> Value {
    if narrow {
        if let Ok(small) = i32::try_from(result) {
            return Value::Int(small);
        }
    }
    Value::Long(result)
}

fn apply_integral(op: ArithOp, a: i64, b: i64, narrow: bool) -> Result<Value, EvalError> {
    match op {
        ArithOp::Add => a
            .checked_add(b)
            .map(|n| narrow_integral(n, narrow))
            .ok_or_else(|| EvalError::Type("integer overflow".to_string())),
        ArithOp::Subtract => a
            .checked_sub(b)
            .map(|n| narrow_integral(n, narrow))
            .ok_or_else(|| EvalError::Type("integer overflow".to_string())),
        ArithOp::Multiply => a
            .checked_mul(b)
            .map(|n| narrow_integral(n, narrow))
            .ok_or_else(|| EvalError::Type("integer overflow".to_string())),
        ArithOp::Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            if a % b == 0 {
                Ok(narrow_integral(a / b, narrow))
            } else {
                Ok(Value::Double(a as f64 / b as f64))
            }
        }
    }
}

/// Floating arithmetic goes through fixed-point decimals so results like
/// `0.1 + 0.2` come out exact; operands outside decimal range fall back to
/// plain binary floating point.
fn apply_decimal(op: ArithOp, a: f64, b: f64) -> Result<f64, EvalError> {
    if op == ArithOp::Divide && b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let (Some(da), Some(db)) = (Decimal::from_f64(a), Decimal::from_f64(b)) else {
        return Ok(apply_f64(op, a, b));
    };
    let result = match op {
        ArithOp::Add => da.checked_add(db),
        ArithOp::Subtract => da.checked_sub(db),
        ArithOp::Multiply => da.checked_mul(db),
        ArithOp::Divide => da.checked_div(db),
    };
    Ok(result
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| apply_f64(op, a, b)))
}

fn apply_f64(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => a / b,
    }
}

fn apply_function(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let arity = |expected: usize| -> Result<(), EvalError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(EvalError::Type(format!(
                "{} expects {} argument{}, got {}",
                name,
                expected,
                if expected == 1 { "" } else { "s" },
                args.len()
            )))
        }
    };
    match name {
        "strToUpperCase" => {
            arity(1)?;
            Ok(text_arg(&args[0], |s| Value::Str(s.to_uppercase())))
        }
        "strToLowerCase" => {
            arity(1)?;
            Ok(text_arg(&args[0], |s| Value::Str(s.to_lowercase())))
        }
        "strConcat" => {
            arity(2)?;
            if args[0] == Value::Null || args[1] == Value::Null {
                return Ok(Value::Null);
            }
            Ok(Value::Str(format!(
                "{}{}",
                args[0].as_text(),
                args[1].as_text()
            )))
        }
        "strLength" => {
            arity(1)?;
            Ok(text_arg(&args[0], |s| {
                Value::Int(s.chars().count() as i32)
            }))
        }
        "abs" => {
            arity(1)?;
            match &args[0] {
                Value::Null => Ok(Value::Null),
                Value::Int(n) => Ok(Value::Int(n.saturating_abs())),
                Value::Long(n) => Ok(Value::Long(n.saturating_abs())),
                Value::Float(n) => Ok(Value::Float(n.abs())),
                Value::Double(n) => Ok(Value::Double(n.abs())),
                other => Err(EvalError::Type(format!(
                    "abs expects a number, got {}",
                    other.kind_name()
                ))),
            }
        }
        "min" | "max" => {
            arity(2)?;
            if args[0] == Value::Null || args[1] == Value::Null {
                return Ok(Value::Null);
            }
            let ordering = args[0].try_compare(&args[1]).ok_or_else(|| {
                EvalError::Type(format!(
                    "{} expects comparable operands, got {} and {}",
                    name,
                    args[0].kind_name(),
                    args[1].kind_name()
                ))
            })?;
            let pick_first = if name == "min" {
                ordering != std::cmp::Ordering::Greater
            } else {
                ordering != std::cmp::Ordering::Less
            };
            Ok(if pick_first {
                args[0].clone()
            } else {
                args[1].clone()
            })
        }
        _ => Err(EvalError::UnknownFunction(name.to_string())),
    }
}

fn text_arg(value: &Value, apply: impl Fn(&str) -> Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => apply(&other.as_text()),
    }
}
