//! Candidate records and property-accessor resolution.
//!
//! A [`Candidate`] is any record a filter can be evaluated against. Property
//! references resolve either dynamically (walking the candidate on every
//! evaluation) or through a [`Descriptor`] built once per record type, which
//! prepared expressions bind to ahead of time.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::value::Value;

/// Conventional accessor path for a candidate's own identifier, used by id
/// filters.
pub const ID_PROPERTY: &str = "@id";

/// A record a filter or expression is evaluated against.
pub trait Candidate {
    /// Record type name used to select a [`Descriptor`].
    fn type_name(&self) -> &str;

    /// Top-level field lookup. `None` means the field does not exist, which
    /// evaluation absorbs as null rather than an error.
    fn get(&self, field: &str) -> Option<Value>;
}

/// A resolved accessor bound to one record type and property path.
pub type Getter = Arc<dyn Fn(&dyn Candidate) -> Option<Value> + Send + Sync>;

/// Accessor table for one record type: field path to getter closure, built
/// once and shared between prepared expressions.
#[derive(Clone)]
pub struct Descriptor {
    type_name: String,
    getters: HashMap<String, Getter>,
}

impl Descriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Descriptor {
            type_name: type_name.into(),
            getters: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn with_getter(
        mut self,
        path: impl Into<String>,
        getter: impl Fn(&dyn Candidate) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.getters.insert(path.into(), Arc::new(getter));
        self
    }

    /// Resolve an accessor for the given property path, if declared.
    pub fn resolve(&self, path: &str) -> Option<Getter> {
        self.getters.get(path).cloned()
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<&String> = self.getters.keys().collect();
        paths.sort();
        f.debug_struct("Descriptor")
            .field("type_name", &self.type_name)
            .field("paths", &paths)
            .finish()
    }
}

/// A reference to a candidate property, by `.`-separated path.
///
/// Unprepared references walk the candidate on every evaluation and yield
/// null when any step is missing. [`PropertyRef::bind`] fixes the accessor
/// from a descriptor once; after that the candidate must belong to the
/// descriptor's record type (evaluating against anything else is the
/// caller's contract to uphold).
#[derive(Clone)]
pub struct PropertyRef {
    path: String,
    segments: Vec<String>,
    bound: OnceLock<Option<Getter>>,
}

impl PropertyRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let segments = path.split('.').map(str::to_string).collect();
        PropertyRef {
            path,
            segments,
            bound: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bind the accessor from `descriptor`. Idempotent: concurrent first
    /// binds race benignly, later binds are ignored.
    pub fn bind(&self, descriptor: &Descriptor) {
        self.bound.get_or_init(|| descriptor.resolve(&self.path));
    }

    /// Resolve this property against a candidate. A bound reference uses its
    /// prepared getter; an unbound one walks the path dynamically.
    pub fn resolve(&self, candidate: &dyn Candidate) -> Option<Value> {
        if let Some(binding) = self.bound.get() {
            return binding.as_ref().and_then(|getter| getter(candidate));
        }
        self.walk(candidate)
    }

    fn walk(&self, candidate: &dyn Candidate) -> Option<Value> {
        let mut segments = self.segments.iter();
        let mut value = candidate.get(segments.next()?)?;
        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment)?.clone(),
                _ => return None,
            };
        }
        Some(value)
    }
}

// Equality and hashing are structural over the path only; the accessor
// cache never participates.
impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for PropertyRef {}

impl std::hash::Hash for PropertyRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl std::fmt::Debug for PropertyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyRef")
            .field("path", &self.path)
            .field("bound", &self.bound.get().is_some())
            .finish()
    }
}

/// A simple typed record: an id plus named fields. Useful as a concrete
/// candidate in tests and embedding code.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    type_name: String,
    id: String,
    fields: HashMap<String, Value>,
}

impl Feature {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Feature {
            type_name: type_name.into(),
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Build a descriptor covering every field this feature currently has,
    /// plus the conventional id accessor.
    pub fn descriptor(&self) -> Descriptor {
        let mut descriptor = Descriptor::new(self.type_name.clone());
        for name in self.fields.keys() {
            let field = name.clone();
            descriptor = descriptor.with_getter(name.clone(), move |c| c.get(&field));
        }
        descriptor.with_getter(ID_PROPERTY, |c| c.get(ID_PROPERTY))
    }
}

impl Candidate for Feature {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get(&self, field: &str) -> Option<Value> {
        if field == ID_PROPERTY {
            return Some(Value::Str(self.id.clone()));
        }
        self.fields.get(field).cloned()
    }
}

impl Candidate for serde_json::Value {
    fn type_name(&self) -> &str {
        "json"
    }

    fn get(&self, field: &str) -> Option<Value> {
        let map = self.as_object()?;
        if field == ID_PROPERTY {
            return map
                .get(ID_PROPERTY)
                .or_else(|| map.get("id"))
                .map(json_to_value);
        }
        map.get(field).map(json_to_value)
    }
}

/// Convert a JSON document into a runtime [`Value`]. Whole numbers that fit
/// become `Int`, wider whole numbers `Long`, everything else `Double`.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Value::Int(small)
                } else {
                    Value::Long(i)
                }
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

/// Convert a runtime [`Value`] into JSON for output. Instants render as
/// RFC 3339 strings and geometries as WKT.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Long(n) => serde_json::Value::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Double(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Instant(t) => serde_json::Value::String(t.to_rfc3339()),
        Value::Period { begin, end } => serde_json::json!({
            "begin": begin.to_rfc3339(),
            "end": end.to_rfc3339(),
        }),
        Value::Geometry(g) => serde_json::Value::String(g.to_wkt()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}
