//! Check a filter against one JSON record, or just validate its syntax.

use super::CliError;
use crate::property::value_to_json;
use crate::{compile_expression, compile_filter};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The filter to compile
    pub filter: String,
    /// JSON input record
    pub input: Option<String>,
    /// Only compile, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Compilation passed
    SyntaxValid,
    /// The record was evaluated against the filter
    Matched(bool),
}

/// Compile a filter and, unless syntax-only, evaluate it against the JSON
/// input record.
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let filter = compile_filter(&options.filter)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }
    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let record: serde_json::Value = serde_json::from_str(json_str)?;
    let matched = filter.evaluate(&record)?;
    Ok(CheckResult::Matched(matched))
}

/// Compile an expression and evaluate it against the JSON input record
/// (or against nothing, for constant expressions).
pub fn execute_eval(
    expression: &str,
    input: Option<&str>,
) -> Result<serde_json::Value, CliError> {
    let expr = compile_expression(expression)?;
    let record: serde_json::Value = match input {
        Some(json_str) => serde_json::from_str(json_str)?,
        None => serde_json::Value::Null,
    };
    let value = expr.evaluate(&record)?;
    Ok(value_to_json(&value))
}
