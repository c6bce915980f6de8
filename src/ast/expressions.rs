use crate::ast::operators::ArithOp;
use crate::property::PropertyRef;
use crate::value::Value;

/// A value-producing node, evaluated against a candidate record.
///
/// Expressions are immutable after construction; equality is structural over
/// constituent fields (accessor caches excluded).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant: evaluates to its wrapped value unconditionally.
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// POINT(1 2)
    /// ```
    Literal(Value),

    /// A candidate property reference, cached or uncached.
    ///
    /// # Examples
    /// ```text
    /// depth
    /// address.city
    /// ```
    Property(PropertyRef),

    /// Binary arithmetic over two sub-expressions.
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Call to a named runtime function.
    ///
    /// # Examples
    /// ```text
    /// strToUpperCase(name)
    /// min(depth, 10)
    /// ```
    Function { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Convenience accessor for literal expressions.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(v) => Some(v),
            _ => None,
        }
    }
}
