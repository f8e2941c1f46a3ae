//! Reader for cached SIDRA responses
//!
//! A cached file is either the raw JSON response (an array of records whose
//! first record maps each column key to its label) or a CSV export whose
//! first line is metadata and second line the header. Both are read into the
//! same [`RawTable`]: a header of column keys, their labels, and rows of
//! optional cell values. The markers `...` and `-` are read as missing.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::constants::files::MISSING_VALUE_MARKERS;
use crate::errors::{TableError, TableResult};

/// Rows of one cached response, before refinement
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    source: PathBuf,
    columns: Vec<String>,
    labels: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

type JsonRecord = IndexMap<String, JsonValue>;

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_VALUE_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn json_cell(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::Null => None,
        JsonValue::String(s) => normalize(s),
        other => Some(other.to_string()),
    }
}

impl RawTable {
    /// Read a cached file, choosing the parser by extension
    pub async fn read(path: &Path) -> TableResult<Self> {
        info!("Reading file {}", path.display());
        let bytes = tokio::fs::read(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_slice(&bytes, path),
            Some("csv") => Self::from_csv_slice(&bytes, path),
            _ => Err(TableError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Parse a JSON response body
    ///
    /// Accepts the array the values API returns as well as one record per
    /// line.
    pub fn from_json_slice(bytes: &[u8], source: &Path) -> TableResult<Self> {
        let starts_with_array = bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[');

        let records: Vec<JsonRecord> = if starts_with_array {
            serde_json::from_slice(bytes)?
        } else {
            serde_json::Deserializer::from_slice(bytes)
                .into_iter::<JsonRecord>()
                .collect::<Result<_, _>>()?
        };

        let mut records = records.into_iter();
        let header = records.next().ok_or_else(|| TableError::Empty {
            path: source.to_path_buf(),
        })?;

        let columns: Vec<String> = header.keys().cloned().collect();
        let labels: Vec<String> = header
            .values()
            .map(|label| match label {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        let rows = records
            .map(|record| {
                columns
                    .iter()
                    .map(|column| json_cell(record.get(column)))
                    .collect()
            })
            .collect();

        let table = Self {
            source: source.to_path_buf(),
            columns,
            labels,
            rows,
        };
        debug!("Parsed {} rows from {}", table.len(), source.display());
        Ok(table)
    }

    /// Parse a CSV export, skipping its leading metadata line
    pub fn from_csv_slice(bytes: &[u8], source: &Path) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records().skip(1);
        let header = match records.next() {
            Some(record) => record?,
            None => {
                return Err(TableError::Empty {
                    path: source.to_path_buf(),
                })
            }
        };
        let columns: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            let row = (0..columns.len())
                .map(|i| record.get(i).and_then(normalize))
                .collect();
            rows.push(row);
        }

        Ok(Self {
            source: source.to_path_buf(),
            labels: columns.clone(),
            columns,
            rows,
        })
    }

    /// File the table was read from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Column keys in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column labels, parallel to [`columns`](Self::columns)
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by key, falling back to label
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.labels.iter().position(|l| l == name))
    }

    /// Like [`column_index`](Self::column_index) but a missing column is an error
    pub fn require_column(&self, name: &str) -> TableResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Cell value, `None` when missing
    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}
