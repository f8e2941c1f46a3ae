//! In-process table store
//!
//! Tables live behind a shared lock so clones of one [`MemoryStore`] see
//! the same data. Primary keys are enforced with the same outcome as the
//! database: under [`ConflictPolicy::Fail`] one duplicate rejects the whole
//! append.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::ddl::{build_dcl, build_ddl};
use super::{qualified_name, ConflictPolicy, RowSet, StoreConnector, TableSpec, TableStore, Value};
use crate::errors::{StoreError, StoreResult};

/// Hashable form of one key cell; doubles compare by bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Text(String),
    Integer(i64),
    Double(u64),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Integer(i) => KeyPart::Integer(*i),
            // -0.0 and 0.0 are the same key
            Value::Double(d) if *d == 0.0 => KeyPart::Double(0.0f64.to_bits()),
            Value::Double(d) => KeyPart::Double(d.to_bits()),
        }
    }
}

type RowKey = Vec<KeyPart>;

#[derive(Debug)]
struct MemoryTable {
    spec: TableSpec,
    rows: Vec<Vec<Value>>,
    keys: HashSet<RowKey>,
}

impl MemoryTable {
    fn key_positions(&self) -> Vec<usize> {
        self.spec
            .primary_keys
            .iter()
            .filter_map(|key| self.spec.columns.iter().position(|c| &c.name == key))
            .collect()
    }

    fn key_of(&self, row: &[Value], positions: &[usize]) -> RowKey {
        positions.iter().map(|&i| KeyPart::from(&row[i])).collect()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, MemoryTable>,
    statements: Vec<String>,
}

/// [`TableStore`] that keeps rows in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently in `schema.table`, in table column order
    pub async fn rows(&self, schema: &str, table: &str) -> Option<Vec<Vec<Value>>> {
        let state = self.state.read().await;
        state
            .tables
            .get(&qualified_name(schema, table))
            .map(|t| t.rows.clone())
    }

    pub async fn row_count(&self, schema: &str, table: &str) -> usize {
        let state = self.state.read().await;
        state
            .tables
            .get(&qualified_name(schema, table))
            .map_or(0, |t| t.rows.len())
    }

    /// DDL and DCL that would have been executed, in order
    pub async fn statements(&self) -> Vec<String> {
        self.state.read().await.statements.clone()
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn create_table_if_absent(&self, spec: &TableSpec) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.statements.extend(build_ddl(spec));
        state.statements.extend(build_dcl(
            &spec.schema,
            &spec.name,
            spec.owner.as_deref(),
            spec.reader_role.as_deref(),
        ));

        let name = spec.qualified_name();
        if !state.tables.contains_key(&name) {
            info!("Creating in-memory table {}", name);
            state.tables.insert(
                name,
                MemoryTable {
                    spec: spec.clone(),
                    rows: Vec::new(),
                    keys: HashSet::new(),
                },
            );
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        schema: &str,
        table: &str,
        rows: &RowSet,
        _batch_size: usize,
        policy: ConflictPolicy,
    ) -> StoreResult<u64> {
        let qualified = qualified_name(schema, table);
        rows.check_shape(&qualified)?;

        let mut state = self.state.write().await;
        let target = state
            .tables
            .get_mut(&qualified)
            .ok_or_else(|| StoreError::TableNotFound {
                table: qualified.clone(),
            })?;

        // Position of every RowSet column in the table
        let mut mapping = Vec::with_capacity(rows.columns().len());
        for column in rows.columns() {
            let position = target
                .spec
                .columns
                .iter()
                .position(|c| &c.name == column)
                .ok_or_else(|| StoreError::ColumnMismatch {
                    table: qualified.clone(),
                    reason: format!("unknown column {}", column),
                })?;
            mapping.push(position);
        }

        let width = target.spec.columns.len();
        let positions = target.key_positions();

        let mut staged = Vec::with_capacity(rows.len());
        let mut staged_keys = HashSet::new();
        for row in rows.rows() {
            let mut full = vec![Value::Null; width];
            for (value, &position) in row.iter().zip(&mapping) {
                full[position] = value.clone();
            }

            let key = target.key_of(&full, &positions);
            let duplicate = !positions.is_empty()
                && (target.keys.contains(&key) || staged_keys.contains(&key));
            if duplicate {
                let shown: Vec<String> = positions.iter().map(|&i| full[i].to_string()).collect();
                match policy {
                    ConflictPolicy::Fail => {
                        return Err(StoreError::UniqueViolation {
                            table: qualified,
                            detail: format!("Key ({}) already exists", shown.join(", ")),
                        });
                    }
                    ConflictPolicy::Skip => continue,
                }
            }
            staged_keys.insert(key);
            staged.push(full);
        }

        let inserted = staged.len() as u64;
        if !positions.is_empty() {
            target.keys.extend(staged_keys);
        }
        target.rows.extend(staged);
        debug!("Appended {} rows to {}", inserted, qualified);
        Ok(inserted)
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(&self) -> StoreResult<Box<dyn TableStore>> {
        Ok(Box::new(self.clone()))
    }
}
