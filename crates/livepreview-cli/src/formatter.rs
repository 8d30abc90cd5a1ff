//! Output formatters for command results.

use std::collections::BTreeMap;

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use livepreview_core::{Diagnostics, Difference, FieldPath, Item};
use serde_json::{json, Value};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format discovered relational field paths.
    fn format_paths(&self, paths: &[FieldPath], diagnostics: &Diagnostics) -> String;

    /// Format a merged item.
    fn format_preview(&self, item: &Item, diagnostics: &Diagnostics) -> String;

    /// Format the differences between two documents.
    fn format_diff(&self, diffs: &BTreeMap<String, Difference>, delta_paths: &[String]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_paths(&self, paths: &[FieldPath], diagnostics: &Diagnostics) -> String {
        if paths.is_empty() {
            return with_diagnostics("No relational fields".to_string(), diagnostics);
        }

        let mut table = Table::new();
        table.set_header(vec!["Path", "Collection"]);
        for path in paths {
            table.add_row(vec![Cell::new(&path.path), Cell::new(&path.collection)]);
        }

        with_diagnostics(table.to_string(), diagnostics)
    }

    fn format_preview(&self, item: &Item, diagnostics: &Diagnostics) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Field", "Value"]);
        for (field, value) in item {
            table.add_row(vec![Cell::new(field), Cell::new(format_value(value))]);
        }

        with_diagnostics(table.to_string(), diagnostics)
    }

    fn format_diff(&self, diffs: &BTreeMap<String, Difference>, delta_paths: &[String]) -> String {
        let mut output = if diffs.is_empty() {
            "No differences".to_string()
        } else {
            let mut table = Table::new();
            table.set_header(vec!["Path", "Left", "Right"]);
            for (path, diff) in diffs {
                table.add_row(vec![
                    Cell::new(path),
                    Cell::new(format_side(diff.left.as_ref())),
                    Cell::new(format_side(diff.right.as_ref())),
                ]);
            }
            table.to_string()
        };

        if !delta_paths.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Pending delta"]);
            for path in delta_paths {
                table.add_row(vec![path]);
            }
            output.push_str("\n\n");
            output.push_str(&table.to_string());
        }

        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_paths(&self, paths: &[FieldPath], diagnostics: &Diagnostics) -> String {
        pretty(&json!({
            "paths": paths,
            "diagnostics": diagnostics_to_json(diagnostics),
        }))
    }

    fn format_preview(&self, item: &Item, diagnostics: &Diagnostics) -> String {
        pretty(&json!({
            "item": item,
            "diagnostics": diagnostics_to_json(diagnostics),
        }))
    }

    fn format_diff(&self, diffs: &BTreeMap<String, Difference>, delta_paths: &[String]) -> String {
        pretty(&json!({
            "differences": diffs,
            "deltas": delta_paths,
        }))
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn diagnostics_to_json(diagnostics: &Diagnostics) -> Value {
    Value::Array(
        diagnostics
            .entries()
            .iter()
            .map(|d| json!({ "path": d.path, "error": d.error.to_string() }))
            .collect(),
    )
}

/// Append a diagnostics table when there is anything to report.
fn with_diagnostics(mut output: String, diagnostics: &Diagnostics) -> String {
    if diagnostics.is_empty() {
        return output;
    }

    let mut table = Table::new();
    table.set_header(vec!["Path", "Diagnostic"]);
    for diagnostic in diagnostics.entries() {
        table.add_row(vec![
            Cell::new(&diagnostic.path),
            Cell::new(diagnostic.error.to_string()),
        ]);
    }
    output.push_str("\n\n");
    output.push_str(&table.to_string());
    output
}

/// Format a value for a table cell.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(rows) => format!("[{} row(s)]", rows.len()),
        other => other.to_string(),
    }
}

fn format_side(value: Option<&Value>) -> String {
    value.map(format_value).unwrap_or_else(|| "-".to_string())
}
