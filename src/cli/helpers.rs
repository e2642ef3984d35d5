//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Engine};

/// Catalog file named by `--db`, the environment or the config file
///
/// The parent directory is created when missing.
pub fn database_path(global: &GlobalOpts) -> Result<PathBuf> {
    let path = Config::load().database_path(global.db.as_ref());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_diagnostic()?;
    }
    Ok(path)
}

pub fn open_engine(global: &GlobalOpts) -> Result<Engine<'static>> {
    Ok(Engine::open(&database_path(global)?)?)
}

/// Resolve `auto` to a concrete format
///
/// An explicit `--format` wins, then `default_format` from config.
pub fn resolve_format(global: &GlobalOpts, auto: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    let configured = Config::load()
        .default_format
        .and_then(|f| <OutputFormat as clap::ValueEnum>::from_str(&f, true).ok());
    match configured {
        Some(OutputFormat::Auto) | None => auto,
        Some(format) => format,
    }
}

/// Parse `key=value` pairs into a map
///
/// An empty value (`class=`) is kept; it clears the attribute in a patch.
pub fn parse_assignments(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut fields = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| miette::miette!("Expected key=value, got '{}'", pair))?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(fields)
}

/// Read names from the arguments, or one per line from stdin when given `-`
pub fn collect_names(names: &[String]) -> Result<Vec<String>> {
    if names.len() == 1 && names[0] == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input).into_diagnostic()?;
        return Ok(input
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect());
    }
    Ok(names.to_vec())
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_parse_assignments() {
        let fields =
            parse_assignments(&["sku=SKU1".to_string(), "class=".to_string()]).unwrap();
        assert_eq!(fields.get("sku").map(String::as_str), Some("SKU1"));
        assert_eq!(fields.get("class").map(String::as_str), Some(""));
        assert!(parse_assignments(&["novalue".to_string()]).is_err());
    }
}
