//! Dataset readers.
//!
//! A dataset is a table with at least three named columns: an identifier, a
//! short name (the text that gets embedded), and an opaque payload. Records
//! are numbered by position as they are read, which fixes their [`RowId`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Row, RowId};

/// Names of the dataset columns that map onto a [`Row`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    #[serde(default = "default_id_column")]
    pub id: String,
    #[serde(default = "default_name_column")]
    pub name: String,
    #[serde(default = "default_payload_column")]
    pub payload: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            name: default_name_column(),
            payload: default_payload_column(),
        }
    }
}

fn default_id_column() -> String {
    String::from("id")
}

fn default_name_column() -> String {
    String::from("name")
}

fn default_payload_column() -> String {
    String::from("payload")
}

/// Supported on-disk dataset formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// One JSON object per line.
    JsonLines,
    /// A JSON array of objects.
    Json,
}

impl DatasetFormat {
    /// Detect format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| Self::from_extension(&ext.to_string_lossy()))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "unsupported dataset format: {} (expected .csv, .jsonl, .ndjson or .json)",
                    path.display()
                ))
            })
    }
}

/// Read every record of the dataset at `path`, in file order.
pub fn read_dataset(path: &Path, columns: &Columns) -> Result<Vec<Row>> {
    let format = DatasetFormat::from_path(path)?;
    log::debug!("Reading {:?} dataset from {}", format, path.display());

    let rows = match format {
        DatasetFormat::Csv => read_csv(path, columns)?,
        DatasetFormat::JsonLines => read_json_lines(path, columns)?,
        DatasetFormat::Json => read_json(path, columns)?,
    };

    log::info!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_csv(path: &Path, columns: &Columns) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let position_of = |column: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| Error::InvalidData(format!("missing column '{column}'")))
    };
    let id_idx = position_of(&columns.id)?;
    let name_idx = position_of(&columns.name)?;
    let payload_idx = position_of(&columns.payload)?;

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        rows.push(make_row(
            position,
            field(id_idx),
            field(name_idx),
            field(payload_idx),
        ));
    }

    Ok(rows)
}

fn read_json_lines(path: &Path, columns: &Columns) -> Result<Vec<Row>> {
    let reader = BufReader::new(File::open(path)?);

    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)?;
        let Value::Object(object) = value else {
            return Err(Error::InvalidData(format!(
                "line {}: expected a JSON object",
                line_no + 1
            )));
        };
        rows.push(object_to_row(rows.len(), &object, columns)?);
    }

    Ok(rows)
}

fn read_json(path: &Path, columns: &Columns) -> Result<Vec<Row>> {
    let reader = BufReader::new(File::open(path)?);
    let objects: Vec<Map<String, Value>> = serde_json::from_reader(reader)?;

    objects
        .iter()
        .enumerate()
        .map(|(position, object)| object_to_row(position, object, columns))
        .collect()
}

fn object_to_row(position: usize, object: &Map<String, Value>, columns: &Columns) -> Result<Row> {
    if !object.contains_key(&columns.name) {
        return Err(Error::InvalidData(format!(
            "record {position}: missing column '{}'",
            columns.name
        )));
    }

    let field = |column: &str| object.get(column).map(value_to_text).unwrap_or_default();
    Ok(make_row(
        position,
        field(&columns.id),
        field(&columns.name),
        field(&columns.payload),
    ))
}

/// Strings pass through; structured values keep their JSON text.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn make_row(position: usize, external_id: String, name: String, payload: String) -> Row {
    let external_id = if external_id.trim().is_empty() {
        position.to_string()
    } else {
        external_id
    };
    Row::new(RowId::from_position(position), external_id, name, payload)
}
