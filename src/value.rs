use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::geometry::Geometry;

/// A runtime value produced by evaluating an expression against a candidate.
///
/// The four numeric kinds (int/long/float/double) are kept distinct: literal
/// subtypes survive compilation, and arithmetic promotes to the widest kind
/// of the two operands.
///
/// # Examples
///
/// ```
/// use ecql::Value;
///
/// let n = Value::Int(42);
/// let s = Value::Str("hello".to_string());
/// assert!(n.is_numeric());
/// assert!(!s.is_numeric());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or null value
    Null,

    /// Boolean (true/false)
    Bool(bool),

    /// 32-bit integer
    Int(i32),

    /// 64-bit integer
    Long(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// UTF-8 string
    Str(String),

    /// A point in time (UTC)
    Instant(DateTime<Utc>),

    /// A closed time interval
    Period {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A geometry literal or candidate geometry
    Geometry(Geometry),

    /// Sequence of values
    List(Vec<Value>),

    /// Nested record with string keys
    Object(HashMap<String, Value>),
}

impl Value {
    /// Human-readable kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Instant(_) => "instant",
            Value::Period { .. } => "period",
            Value::Geometry(_) => "geometry",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    /// Widening view of any numeric kind.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Float(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used by LIKE matching and string functions.
    pub fn as_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Instant(t) => t.to_rfc3339(),
            Value::Null => "null".to_string(),
            other => format!("{:?}", other),
        }
    }

    /// Whether ordering comparisons are defined for this value.
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Str(_)
                | Value::Bool(_)
                | Value::Instant(_)
        )
    }

    /// Ordering between two values: numerics compare across kinds, strings,
    /// booleans and instants compare within their kind. Anything else is
    /// not comparable.
    pub fn try_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.as_double()?.partial_cmp(&b.as_double()?)
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Instant(a), Value::Instant(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality used by comparison predicates: numerics are equal across
    /// kinds when they denote the same number, everything else is structural.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.try_compare(other) == Some(Ordering::Equal);
        }
        self == other
    }

    /// Convert this value to the runtime kind of `target`. Returns `None`
    /// when no lossless conversion exists (the BETWEEN absorption rule).
    pub fn coerce_to_kind_of(&self, target: &Value) -> Option<Value> {
        match target {
            Value::Int(_) => match self {
                Value::Int(_) => Some(self.clone()),
                Value::Str(s) => s.trim().parse::<i32>().ok().map(Value::Int),
                v if v.is_numeric() => {
                    let d = v.as_double()?;
                    (d.fract() == 0.0 && d >= i32::MIN as f64 && d <= i32::MAX as f64)
                        .then(|| Value::Int(d as i32))
                }
                _ => None,
            },
            Value::Long(_) => match self {
                Value::Int(n) => Some(Value::Long(*n as i64)),
                Value::Long(_) => Some(self.clone()),
                Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Long),
                v if v.is_numeric() => {
                    let d = v.as_double()?;
                    (d.fract() == 0.0).then(|| Value::Long(d as i64))
                }
                _ => None,
            },
            Value::Float(_) => match self {
                Value::Str(s) => s.trim().parse::<f32>().ok().map(Value::Float),
                v => v.as_double().map(|d| Value::Float(d as f32)),
            },
            Value::Double(_) => match self {
                Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Double),
                v => v.as_double().map(Value::Double),
            },
            Value::Str(_) => match self {
                Value::Null | Value::Geometry(_) | Value::List(_) | Value::Object(_) => None,
                Value::Period { .. } => None,
                v => Some(Value::Str(v.as_text())),
            },
            Value::Instant(_) => match self {
                Value::Instant(_) => Some(self.clone()),
                Value::Str(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|t| Value::Instant(t.with_timezone(&Utc))),
                _ => None,
            },
            Value::Bool(_) => match self {
                Value::Bool(_) => Some(self.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Long(n) => n.hash(state),
            Value::Float(n) => n.to_bits().hash(state),
            Value::Double(n) => n.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Instant(t) => t.hash(state),
            Value::Period { begin, end } => {
                begin.hash(state);
                end.hash(state);
            }
            // Geometries and containers hash through their stable text and
            // element forms; they only ever appear as constituents of
            // structural node hashing, never as hot map keys.
            Value::Geometry(g) => g.to_wkt().hash(state),
            Value::List(items) => {
                for item in items {
                    item.hash(state);
                }
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    key.hash(state);
                    map[key].hash(state);
                }
            }
        }
    }
}
