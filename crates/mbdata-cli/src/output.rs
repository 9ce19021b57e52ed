//! Output formatting for mbdata (table, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    /// Print a success message (tables only, JSON output stays parseable)
    pub fn success(&self, msg: &str) {
        if self.format == OutputFormat::Table {
            println!("{}", msg.green());
        }
    }

    pub fn info(&self, msg: &str) {
        if self.format == OutputFormat::Table {
            println!("{}", msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    println!("No data");
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print key-value pairs
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }

    /// Print any serializable value as one JSON line
    pub fn print_json<T: Serialize>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Catalog field for the resources command
#[derive(Debug, Tabled, Serialize)]
pub struct FieldRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Resource")]
    pub name: String,
}

/// Custom data record for the read and poll commands
#[derive(Debug, Tabled, Serialize)]
pub struct RecordRow {
    #[tabled(rename = "#")]
    pub id: usize,
    #[tabled(rename = "Resource")]
    pub label: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl From<&mbdata_client::CustomDataRecord> for RecordRow {
    fn from(record: &mbdata_client::CustomDataRecord) -> Self {
        Self {
            id: record.id,
            label: record.label.clone(),
            value: record.value.clone(),
        }
    }
}
