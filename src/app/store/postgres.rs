//! PostgreSQL table store

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::config::DatabaseConfig;
use super::ddl::{build_dcl, build_ddl};
use super::{qualified_name, ColumnKind, ConflictPolicy, RowSet, StoreConnector, TableSpec, TableStore, Value};
use crate::constants::store::MAX_BIND_PARAMS;
use crate::errors::{StoreError, StoreResult};

const UNIQUE_VIOLATION: &str = "23505";

/// Separate key violations from other database failures
fn classify(table: &str, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::UniqueViolation {
                table: table.to_string(),
                detail: db_error.message().to_string(),
            };
        }
    }
    StoreError::Database(error)
}

fn push_value(builder: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, kind: ColumnKind) {
    match (value, kind) {
        (Value::Null, ColumnKind::Text) => builder.push_bind(None::<String>),
        (Value::Null, ColumnKind::Integer) => builder.push_bind(None::<i64>),
        (Value::Null, ColumnKind::Double) => builder.push_bind(None::<f64>),
        (Value::Text(s), _) => builder.push_bind(s.clone()),
        (Value::Integer(i), _) => builder.push_bind(*i),
        (Value::Double(d), _) => builder.push_bind(*d),
    };
}

/// Rows per statement so that one INSERT never exceeds the bind limit
fn effective_batch_size(requested: usize, columns: usize) -> usize {
    let limit = MAX_BIND_PARAMS / columns.max(1);
    requested.clamp(1, limit.max(1))
}

/// [`TableStore`] over a `sqlx` connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn execute_all(&self, table: &str, statements: &[String]) -> StoreResult<()> {
        for statement in statements {
            debug!("Executing: {}", statement);
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| classify(table, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for PgStore {
    async fn create_table_if_absent(&self, spec: &TableSpec) -> StoreResult<()> {
        let table = spec.qualified_name();
        info!("Creating table {} if absent", table);
        self.execute_all(&table, &build_ddl(spec)).await?;

        let dcl = build_dcl(
            &spec.schema,
            &spec.name,
            spec.owner.as_deref(),
            spec.reader_role.as_deref(),
        );
        self.execute_all(&table, &dcl).await
    }

    async fn append_rows(
        &self,
        schema: &str,
        table: &str,
        rows: &RowSet,
        batch_size: usize,
        policy: ConflictPolicy,
    ) -> StoreResult<u64> {
        let qualified = qualified_name(schema, table);
        rows.check_shape(&qualified)?;
        if rows.is_empty() || rows.columns().is_empty() {
            return Ok(0);
        }

        let batch_size = effective_batch_size(batch_size, rows.columns().len());
        let insert = format!("INSERT INTO {} ({}) ", qualified, rows.columns().join(", "));
        let kinds = rows.kinds();

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for (index, chunk) in rows.rows().chunks(batch_size).enumerate() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&insert);
            builder.push_values(chunk, |mut separated, row| {
                for (value, kind) in row.iter().zip(kinds) {
                    push_value(&mut separated, value, *kind);
                }
            });
            if policy == ConflictPolicy::Skip {
                builder.push(" ON CONFLICT DO NOTHING");
            }

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(&qualified, e))?;
            debug!(
                "Batch {} into {}: {} rows",
                index,
                qualified,
                result.rows_affected()
            );
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

/// Opens a [`PgStore`] from `[database]` settings
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    max_connections: u32,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.dbname);
        Self {
            options,
            max_connections: config.max_connections.max(1),
        }
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    async fn connect(&self) -> StoreResult<Box<dyn TableStore>> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(self.options.clone())
            .await?;
        info!("Connected to database");
        Ok(Box::new(PgStore::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_clamped_to_bind_limit() {
        assert_eq!(effective_batch_size(1_000, 5), 1_000);
        assert_eq!(effective_batch_size(100_000, 10), 6_553);
        assert_eq!(effective_batch_size(0, 3), 1);
        assert_eq!(effective_batch_size(10, 0), 10);
    }

    #[test]
    fn test_non_database_errors_are_not_violations() {
        let error = classify("ibge.pam", sqlx::Error::RowNotFound);
        assert!(!error.is_unique_violation());
        assert!(matches!(error, StoreError::Database(_)));
    }

    #[test]
    fn test_connector_from_config() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..Default::default()
        };
        let connector = PgConnector::new(&config);
        assert_eq!(connector.max_connections, 1);
    }
}
