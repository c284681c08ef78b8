use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Clean one free-text input line.
///
/// Trims whitespace, trailing commas and surrounding quote characters.
/// Returns `None` when nothing is left.
pub fn clean_query(line: &str) -> Option<String> {
    let is_quote = |c: char| c == '"' || c == '\'';

    let cleaned = line
        .trim()
        .trim_end_matches(',')
        .trim()
        .trim_matches(is_quote)
        .trim()
        .trim_end_matches(',')
        .trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Parse newline-delimited queries, skipping blank lines
pub fn parse_queries(content: &str) -> Vec<String> {
    content.lines().filter_map(clean_query).collect()
}

/// Read the query file, one identifier candidate per line
pub fn read_queries(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::Input(format!("Failed to read input file '{}': {}", path.display(), e))
    })?;
    let queries = parse_queries(&content);
    debug!(lines = content.lines().count(), "Input lines read");
    info!(path = %path.display(), queries = queries.len(), "Loaded queries");
    Ok(queries)
}
