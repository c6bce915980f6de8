pub mod ast;
pub mod builder;
pub mod crs;
pub mod error;
pub mod evaluator;
pub mod factory;
pub mod geometry;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod property;
pub mod stack;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{ArithOp, CompareOp, Expr, Filter, Like, SpatialOp, Token};
pub use builder::FilterBuilder;
pub use crs::{Crs, CrsError, DEFAULT_AUTHORITY};
pub use error::{CompileError, ErrorKind, EvalError};
pub use factory::{FactoryError, FilterFactory};
pub use geometry::{Coordinate, Envelope, Geometry, Polygon, Shape};
pub use lexer::{LexError, Lexer, Spanned};
pub use node::NodeType;
pub use parser::{Parser, Reducer, SourceToken};
pub use property::{Candidate, Descriptor, Feature, Getter, PropertyRef, ID_PROPERTY};
pub use stack::{Built, BuildResult, ResultStack};
pub use value::Value;

/// Compile one textual filter into an evaluable [`Filter`] tree.
///
/// # Examples
///
/// ```
/// use ecql::compile_filter;
///
/// let filter = compile_filter("depth > 100 AND name LIKE 'St%'")?;
/// # Ok::<(), ecql::CompileError>(())
/// ```
pub fn compile_filter(source: &str) -> Result<Filter, CompileError> {
    let mut builder = FilterBuilder::new(source, FilterFactory::new());
    Parser::new(source, &mut builder)?.parse_filter()?;
    builder.finish_filter()
}

/// Compile one textual expression into an evaluable [`Expr`] tree.
pub fn compile_expression(source: &str) -> Result<Expr, CompileError> {
    let mut builder = FilterBuilder::new(source, FilterFactory::new());
    Parser::new(source, &mut builder)?.parse_expression()?;
    builder.finish_expression()
}

/// Compile a `;`-separated sequence of filters, in source order.
pub fn compile_filter_list(source: &str) -> Result<Vec<Filter>, CompileError> {
    let mut builder = FilterBuilder::new(source, FilterFactory::new());
    let count = Parser::new(source, &mut builder)?.parse_filter_list()?;
    builder.finish_filter_list(count)
}
