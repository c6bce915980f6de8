use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::ast::expressions::Expr;
use crate::ast::operators::{CompareOp, SpatialOp};
use crate::crs::Crs;
use crate::geometry::Envelope;

/// A boolean predicate node, evaluated against a candidate record.
///
/// Filters are immutable after construction and safe for unsynchronized
/// concurrent evaluation; the only interior state is the Like node's lazily
/// memoized compiled pattern, which recomputes at worst redundantly.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every candidate.
    Include,

    /// Matches no candidate.
    Exclude,

    /// Conjunction; stops at the first false child.
    And(Vec<Filter>),

    /// Disjunction; stops at the first true child.
    Or(Vec<Filter>),

    /// Logical negation. All NOT-variants (`<>`, NOT LIKE, NOT BETWEEN,
    /// NOT IN, IS NOT NULL, negated id filters) are this node wrapping the
    /// positive predicate.
    Not(Box<Filter>),

    /// Ordering or equality comparison.
    Compare {
        op: CompareOp,
        left: Expr,
        right: Expr,
    },

    /// `lower <= test <= upper`, with bounds coerced to the test value's
    /// runtime kind.
    Between {
        test: Expr,
        lower: Expr,
        upper: Expr,
    },

    /// SQL92-style wildcard match.
    Like(Like),

    /// True iff the wrapped expression evaluates to null.
    IsNull(Expr),

    /// Feature-id membership; duplicates collapse at construction.
    Id(BTreeSet<String>),

    /// Binary spatial relation between two geometry expressions.
    Spatial {
        op: SpatialOp,
        left: Expr,
        right: Expr,
    },

    /// DE-9IM pattern relation. The pattern is validated at construction to
    /// be exactly nine characters over `T F * 0 1 2`.
    Relate {
        left: Expr,
        right: Expr,
        pattern: String,
    },

    /// Bounding-box intersection against a rectangle, optionally pinned to a
    /// named reference system.
    BBox {
        expr: Expr,
        bounds: Envelope,
        crs: Option<Crs>,
    },

    /// Distance comparison between two geometries: within the threshold
    /// (DWITHIN) or beyond it (BEYOND).
    Distance {
        left: Expr,
        right: Expr,
        distance: f64,
        units: Option<String>,
        within: bool,
    },

    /// Interval membership: `begin <= test <= end`. Temporal predicates over
    /// period operands reduce to this node.
    Interval {
        test: Expr,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A LIKE predicate with its wildcard configuration.
///
/// The compiled regular expression is memoized on first evaluation; the
/// pattern fields alone define equality.
#[derive(Debug, Clone)]
pub struct Like {
    pub expr: Expr,
    pub pattern: String,
    /// Matches any run of characters (`%` in SQL92).
    pub wildcard: char,
    /// Matches exactly one character (`_` in SQL92).
    pub single: char,
    /// Escapes the next pattern character.
    pub escape: char,
    /// Case-insensitive matching, applied by pattern normalization.
    pub case_insensitive: bool,
    pub(crate) compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl Like {
    pub fn new(expr: Expr, pattern: impl Into<String>, case_insensitive: bool) -> Self {
        Like {
            expr,
            pattern: pattern.into(),
            wildcard: '%',
            single: '_',
            escape: '\\',
            case_insensitive,
            compiled: OnceLock::new(),
        }
    }
}

impl PartialEq for Like {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
            && self.pattern == other.pattern
            && self.wildcard == other.wildcard
            && self.single == other.single
            && self.escape == other.escape
            && self.case_insensitive == other.case_insensitive
    }
}
