//! # ECQL Abstract Syntax Tree
//!
//! This module defines the object model for compiled ECQL filters and
//! expressions: immutable predicate and value nodes with evaluation
//! semantics over arbitrary candidate records.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Comparison, arithmetic and spatial operators
//! - **[expressions]** - Value-producing nodes (literals, properties,
//!   arithmetic, function calls)
//! - **[filters]** - Boolean predicate nodes (logic, comparisons, LIKE,
//!   BETWEEN, id/spatial/temporal predicates)
//!
//! ## Quick Start
//!
//! ```
//! use ecql::{compile_filter, Feature, Value};
//!
//! let filter = compile_filter("depth > 100 AND name LIKE 'St%'").unwrap();
//!
//! let record = Feature::new("station", "station.1")
//!     .with("depth", Value::Int(300))
//!     .with("name", Value::Str("Stockholm".into()));
//! assert!(filter.evaluate(&record).unwrap());
//! ```
//!
//! ## Core Concepts
//!
//! ### Compilation
//!
//! The parser recognizes grammar productions and raises node-close events
//! into a reducer; the reducer pops operands off a result stack, constructs
//! typed nodes through the filter factory, and pushes them back. A
//! successful compile leaves exactly one result, which becomes the tree.
//!
//! ### Evaluation
//!
//! Trees are immutable and safe for unsynchronized concurrent evaluation.
//! Missing properties evaluate to null rather than erroring; `BETWEEN` over
//! a non-comparable value and `LIKE` over null are false, never failures.
//!
//! ### NOT variants
//!
//! `<>`, `NOT LIKE`, `NOT BETWEEN`, `NOT IN`, `IS NOT NULL` and negated id
//! filters all compile to [`Filter::Not`] wrapping the positive predicate,
//! so there is a single negation code path.

pub mod expressions;
pub mod filters;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use filters::{Filter, Like};
pub use operators::{ArithOp, CompareOp, SpatialOp};
pub use tokens::Token;
