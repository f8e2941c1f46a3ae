//! Destination table store
//!
//! The pipeline talks to the database through [`TableStore`]: create a
//! table from a [`TableSpec`] if it is absent, and append a [`RowSet`].
//! A primary key or unique constraint violation is reported as
//! [`StoreError::UniqueViolation`], distinct from every other failure, so
//! the caller can treat "already loaded" as an expected outcome.
//!
//! Two implementations are provided:
//! - [`PgStore`]: PostgreSQL through `sqlx`
//! - [`MemoryStore`]: in-process tables with the same key semantics

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{StoreError, StoreResult};

pub mod config;
pub mod ddl;
pub mod memory;
pub mod postgres;

pub use config::DatabaseConfig;
pub use ddl::{build_dcl, build_ddl};
pub use memory::MemoryStore;
pub use postgres::{PgConnector, PgStore};

/// Value type of a destination column, used for parsing and null binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Integer,
    Double,
}

impl ColumnKind {
    /// Convert a raw cell into a typed value
    pub fn parse(&self, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        match self {
            ColumnKind::Text => Ok(Value::Text(raw.to_string())),
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("not an integer: {}", e)),
            ColumnKind::Double => trimmed
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| format!("not a number: {}", e)),
        }
    }
}

/// One cell of a row to append
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Double(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
        }
    }
}

/// Column of a destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Definition of a destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_keys: Vec<String>,
    pub tablespace: Option<String>,
    pub comment: Option<String>,
    /// Role set as table owner after creation
    pub owner: Option<String>,
    /// Role granted SELECT after creation
    pub reader_role: Option<String>,
}

impl TableSpec {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            tablespace: None,
            comment: None,
            owner: None,
            reader_role: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        self.columns.push(ColumnDef::new(name, sql_type));
        self
    }

    pub fn primary_key<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

pub(crate) fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table)
}

/// Refined rows ready to append, with the kind of every column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnKind)>,
        S: Into<String>,
    {
        let (columns, kinds) = columns
            .into_iter()
            .map(|(name, kind)| (name.into(), kind))
            .unzip();
        Self {
            columns,
            kinds,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reject rows whose width differs from the column list
    pub(crate) fn check_shape(&self, table: &str) -> StoreResult<()> {
        if let Some(position) = self
            .rows
            .iter()
            .position(|row| row.len() != self.columns.len())
        {
            return Err(StoreError::ColumnMismatch {
                table: table.to_string(),
                reason: format!(
                    "row {} has {} values for {} columns",
                    position,
                    self.rows[position].len(),
                    self.columns.len()
                ),
            });
        }
        Ok(())
    }
}

/// What to do with rows whose key is already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// The whole append fails with a uniqueness violation and is rolled back
    #[default]
    Fail,
    /// Conflicting rows are skipped, the rest are inserted
    Skip,
}

/// Destination table operations
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create the table described by `spec` unless it exists
    async fn create_table_if_absent(&self, spec: &TableSpec) -> StoreResult<()>;

    /// Append `rows` in batches of at most `batch_size`, returning rows inserted
    ///
    /// Under [`ConflictPolicy::Fail`] a key violation surfaces as
    /// [`StoreError::UniqueViolation`] and nothing from this call is kept.
    async fn append_rows(
        &self,
        schema: &str,
        table: &str,
        rows: &RowSet,
        batch_size: usize,
        policy: ConflictPolicy,
    ) -> StoreResult<u64>;

    /// Release connections
    async fn close(&self) {}
}

/// Opens a [`TableStore`] once downloads are complete
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> StoreResult<Box<dyn TableStore>>;
}
