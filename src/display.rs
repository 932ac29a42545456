use std::fmt::Display;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::api::SearchMode;

const RULE: &str = "===============================";
const DIVIDER: &str = "------------------------";

/// Banner shown when the interactive pipelines start.
pub fn name_plate<W: Write>(entries: &[String], writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", RULE)?;
    writeln!(writer, "=----Welcome to songbird🐦----=")?;
    writeln!(writer, "{}", RULE)?;
    writeln!(writer, "--songbird {}", env!("CARGO_PKG_VERSION"))?;
    for entry in entries {
        writeln!(writer, "{}", entry)?;
    }
    writeln!(writer, "{}", RULE)?;
    writeln!(writer, "Modes: {:?}", SearchMode::values())?;
    Ok(())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Prints records last-to-first, so index 0 ends up right above the prompt.
/// Fields named in `ignore_keys` are left out.
pub fn print_records<T: Serialize, W: Write>(records: &[T], ignore_keys: &[&str], writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", DIVIDER)?;
    for (idx, record) in records.iter().enumerate().rev() {
        writeln!(writer, "{}", idx)?;
        let value = serde_json::to_value(record).map_err(io::Error::other)?;
        if let Value::Object(fields) = value {
            for (key, field) in fields.iter().filter(|(k, _)| !ignore_keys.contains(&k.as_str())) {
                writeln!(writer, "\t{} - {}", key, render_value(field))?;
            }
        }
        writeln!(writer, "{}", DIVIDER)?;
    }
    Ok(())
}

/// `[idx] - item` per line.
pub fn print_indexed<T: Display, W: Write>(items: &[T], writer: &mut W) -> io::Result<()> {
    for (idx, item) in items.iter().enumerate() {
        writeln!(writer, "\t [{}] - {}", idx, item)?;
    }
    Ok(())
}
