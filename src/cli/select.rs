//! Select the JSON records matching a filter.

use super::CliError;
use crate::compile_filter;

/// Options for the select command
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// The filter to compile
    pub filter: String,
    /// Input records: a JSON array, or one JSON document per line
    pub input: String,
}

/// Compile a filter and return the input records that match it, in input
/// order.
pub fn execute_select(options: &SelectOptions) -> Result<Vec<serde_json::Value>, CliError> {
    let filter = compile_filter(&options.filter)?;
    let mut matched = Vec::new();
    for record in parse_records(&options.input)? {
        if filter.evaluate(&record)? {
            matched.push(record);
        }
    }
    Ok(matched)
}

/// Input is either one JSON array or newline-delimited JSON documents.
fn parse_records(input: &str) -> Result<Vec<serde_json::Value>, CliError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        let records: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
        return Ok(records);
    }
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(CliError::Json))
        .collect()
}
