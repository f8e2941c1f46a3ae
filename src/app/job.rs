//! Declarative pipelines loaded from TOML job files
//!
//! A job file names the SIDRA queries to download, the destination table,
//! and how each destination column is taken from the raw response:
//!
//! ```toml
//! drop_missing = ["valor"]
//!
//! [destination]
//! table = "pam_lavouras_temporarias"
//! schema = "ibge"
//! primary_key = ["ano", "id_municipio", "id_produto", "id_variavel"]
//! conflict = "skip"
//!
//! [[columns]]
//! source = "D1C"
//! name = "id_municipio"
//! sql_type = "INTEGER NOT NULL"
//! kind = "integer"
//!
//! [[columns]]
//! source = "Valor"
//! name = "valor"
//! sql_type = "DOUBLE PRECISION"
//! kind = "double"
//!
//! [[requests]]
//! table = "1612"
//! territories = { "6" = [] }
//! variables = ["allxp"]
//! unnest = true
//! ```
//!
//! `source` matches a column key (`D1C`) or label (`Município (Código)`).
//! A column without `source` takes its `default` on every row.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::fetcher::Fetcher;
use crate::app::models::{ClassificationFilter, Classifications, TableQuery, Territories};
use crate::app::pipeline::{LoadOptions, TablePipeline};
use crate::app::store::{ColumnKind, ConflictPolicy, DatabaseConfig, RowSet, TableSpec, Value};
use crate::app::table::RawTable;
use crate::constants::store::DEFAULT_BATCH_SIZE;
use crate::errors::{JobError, Result, TableError, TableResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestinationSection {
    table: String,
    schema: Option<String>,
    #[serde(default)]
    primary_key: Vec<String>,
    comment: Option<String>,
    owner: Option<String>,
    #[serde(default)]
    conflict: ConflictPolicy,
    batch_size: Option<usize>,
}

/// Mapping from a raw column to a destination column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobColumn {
    pub source: Option<String>,
    pub name: String,
    pub sql_type: String,
    #[serde(default)]
    pub kind: ColumnKind,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobRequest {
    table: String,
    #[serde(default)]
    territories: Territories,
    variables: Option<Vec<String>>,
    classifications: Option<Classifications>,
    #[serde(default)]
    unnest: bool,
}

impl JobRequest {
    fn to_query(&self) -> TableQuery {
        let classifications = match (&self.classifications, self.unnest) {
            (_, true) => ClassificationFilter::Unnested,
            (Some(explicit), false) => ClassificationFilter::Explicit(explicit.clone()),
            (None, false) => ClassificationFilter::Unfiltered,
        };
        TableQuery {
            table_id: self.table.clone(),
            territories: self.territories.clone(),
            variables: self.variables.clone(),
            classifications,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default)]
    drop_missing: Vec<String>,
    destination: DestinationSection,
    columns: Vec<JobColumn>,
    requests: Vec<JobRequest>,
}

/// [`TablePipeline`] described by a job file
#[derive(Debug, Clone)]
pub struct JobPipeline {
    spec: TableSpec,
    columns: Vec<JobColumn>,
    drop_missing: Vec<usize>,
    queries: Vec<TableQuery>,
    options: LoadOptions,
}

fn invalid(reason: impl Into<String>) -> JobError {
    JobError::Invalid {
        reason: reason.into(),
    }
}

impl JobPipeline {
    /// Read and validate a job file
    ///
    /// `database` supplies the schema, tablespace and reader role when the
    /// job does not override them.
    pub fn load(path: &Path, database: &DatabaseConfig) -> std::result::Result<Self, JobError> {
        let content = std::fs::read_to_string(path).map_err(|source| JobError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, database)
    }

    /// Parse and validate job TOML
    pub fn from_toml(content: &str, database: &DatabaseConfig) -> std::result::Result<Self, JobError> {
        let job: JobFile = toml::from_str(content)?;

        if job.requests.is_empty() {
            return Err(invalid("at least one [[requests]] entry is required"));
        }
        if job.columns.is_empty() {
            return Err(invalid("at least one [[columns]] entry is required"));
        }
        for request in &job.requests {
            if request.unnest && request.classifications.is_some() {
                return Err(invalid(format!(
                    "table {}: unnest and classifications are mutually exclusive",
                    request.table
                )));
            }
        }
        for column in &job.columns {
            if column.source.is_none() && column.default.is_none() {
                return Err(invalid(format!(
                    "column {} needs a source or a default",
                    column.name
                )));
            }
            if let Some(default) = &column.default {
                column.kind.parse(default).map_err(|reason| {
                    invalid(format!("default of column {}: {}", column.name, reason))
                })?;
            }
        }

        let position = |name: &str| job.columns.iter().position(|c| c.name == name);
        for key in &job.destination.primary_key {
            if position(key).is_none() {
                return Err(invalid(format!("primary key {} is not a column", key)));
            }
        }
        let drop_missing = job
            .drop_missing
            .iter()
            .map(|name| {
                position(name).ok_or_else(|| invalid(format!("drop_missing {} is not a column", name)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let destination = job.destination;
        let spec = TableSpec {
            schema: destination
                .schema
                .unwrap_or_else(|| database.schema.clone()),
            name: destination.table,
            columns: job
                .columns
                .iter()
                .map(|c| crate::app::store::ColumnDef::new(&c.name, &c.sql_type))
                .collect(),
            primary_keys: destination.primary_key,
            tablespace: database.tablespace.clone(),
            comment: destination.comment,
            owner: destination.owner,
            reader_role: database.readonly_role.clone(),
        };

        Ok(Self {
            spec,
            columns: job.columns,
            drop_missing,
            queries: job.requests.iter().map(JobRequest::to_query).collect(),
            options: LoadOptions {
                batch_size: destination.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
                conflict: destination.conflict,
            },
        })
    }

    pub fn queries(&self) -> &[TableQuery] {
        &self.queries
    }
}

#[async_trait]
impl TablePipeline for JobPipeline {
    async fn list_requests(&self, _fetcher: &Fetcher) -> Result<Vec<TableQuery>> {
        Ok(self.queries.clone())
    }

    fn destination(&self) -> TableSpec {
        self.spec.clone()
    }

    fn refine(&self, table: RawTable) -> TableResult<RowSet> {
        let sources = self
            .columns
            .iter()
            .map(|column| {
                column
                    .source
                    .as_deref()
                    .map(|source| table.require_column(source))
                    .transpose()
            })
            .collect::<TableResult<Vec<_>>>()?;

        let mut rows = RowSet::new(self.columns.iter().map(|c| (c.name.clone(), c.kind)));
        for row in 0..table.len() {
            let mut values = Vec::with_capacity(self.columns.len());
            for (column, source) in self.columns.iter().zip(&sources) {
                let raw = source
                    .and_then(|index| table.value(row, index))
                    .or(column.default.as_deref());
                let value = match raw {
                    Some(raw) => column.kind.parse(raw).map_err(|reason| TableError::InvalidValue {
                        column: column.name.clone(),
                        value: raw.to_string(),
                        reason,
                    })?,
                    None => Value::Null,
                };
                values.push(value);
            }

            if self.drop_missing.iter().any(|&i| values[i].is_null()) {
                continue;
            }
            rows.push(values);
        }

        tracing::debug!(
            "Refined {} of {} rows from {}",
            rows.len(),
            table.len(),
            table.source().display()
        );
        Ok(rows)
    }

    fn load_options(&self) -> LoadOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
drop_missing = ["valor"]

[destination]
table = "pam_area"
schema = "ibge"
primary_key = ["ano", "id_municipio"]
comment = "Área plantada"
conflict = "skip"
batch_size = 500

[[columns]]
source = "D2C"
name = "ano"
sql_type = "SMALLINT NOT NULL"
kind = "integer"

[[columns]]
source = "Município (Código)"
name = "id_municipio"
sql_type = "INTEGER NOT NULL"
kind = "integer"

[[columns]]
source = "V"
name = "valor"
sql_type = "DOUBLE PRECISION"
kind = "double"

[[columns]]
name = "fonte"
sql_type = "TEXT"
default = "PAM"

[[requests]]
table = "1612"
territories = { "6" = [] }
variables = ["216"]
classifications = { "81" = ["allxt"] }

[[requests]]
table = "839"
territories = { "6" = [] }
unnest = true
"#;

    const RAW: &str = r#"[
        {"D1C": "Município (Código)", "D2C": "Ano (Código)", "V": "Valor"},
        {"D1C": "1100015", "D2C": "2017", "V": "1250"},
        {"D1C": "1100023", "D2C": "2017", "V": "..."},
        {"D1C": "1100031", "D2C": "2017", "V": "12.5"}
    ]"#;

    fn pipeline() -> JobPipeline {
        JobPipeline::from_toml(JOB, &DatabaseConfig::default()).unwrap()
    }

    #[test]
    fn test_destination_from_job() {
        let spec = pipeline().destination();
        assert_eq!(spec.qualified_name(), "ibge.pam_area");
        assert_eq!(spec.columns.len(), 4);
        assert_eq!(spec.primary_keys, vec!["ano", "id_municipio"]);
        assert_eq!(spec.comment.as_deref(), Some("Área plantada"));

        let options = pipeline().load_options();
        assert_eq!(options.batch_size, 500);
        assert_eq!(options.conflict, ConflictPolicy::Skip);
    }

    #[test]
    fn test_request_modes() {
        let job = pipeline();
        let queries = job.queries();
        assert_eq!(queries.len(), 2);
        assert!(matches!(
            queries[0].classifications,
            ClassificationFilter::Explicit(_)
        ));
        assert_eq!(queries[0].variables.as_deref(), Some(&["216".to_string()][..]));
        assert_eq!(queries[1].classifications, ClassificationFilter::Unnested);
        assert!(queries[1].variables.is_none());
    }

    #[test]
    fn test_schema_defaults_to_database() {
        let job = JOB.replace("schema = \"ibge\"\n", "");
        let database = DatabaseConfig {
            schema: "staging".to_string(),
            readonly_role: Some("analyst".to_string()),
            ..Default::default()
        };
        let spec = JobPipeline::from_toml(&job, &database).unwrap().destination();
        assert_eq!(spec.schema, "staging");
        assert_eq!(spec.reader_role.as_deref(), Some("analyst"));
    }

    #[test]
    fn test_refine_drops_missing_and_casts() {
        let raw = RawTable::from_json_slice(RAW.as_bytes(), Path::new("t.json")).unwrap();
        let rows = pipeline().refine(raw).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.columns(), &["ano", "id_municipio", "valor", "fonte"]);
        assert_eq!(
            rows.rows()[0],
            vec![
                Value::Integer(2017),
                Value::Integer(1100015),
                Value::Double(1250.0),
                Value::Text("PAM".to_string()),
            ]
        );
        assert_eq!(rows.rows()[1][2], Value::Double(12.5));
    }

    #[test]
    fn test_refine_missing_source_column() {
        let raw = RawTable::from_json_slice(
            br#"[{"D2C": "Ano", "V": "Valor"}, {"D2C": "2017", "V": "1"}]"#,
            Path::new("t.json"),
        )
        .unwrap();
        assert!(matches!(
            pipeline().refine(raw),
            Err(TableError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_refine_invalid_value() {
        let raw = RawTable::from_json_slice(
            r#"[{"D1C": "Município (Código)", "D2C": "Ano", "V": "Valor"},
                {"D1C": "1100015", "D2C": "dois mil", "V": "1"}]"#
                .as_bytes(),
            Path::new("t.json"),
        )
        .unwrap();
        assert!(matches!(
            pipeline().refine(raw),
            Err(TableError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_jobs() {
        let database = DatabaseConfig::default();

        let no_requests = JOB.split("[[requests]]").next().unwrap_or_default();
        assert!(matches!(
            JobPipeline::from_toml(no_requests, &database),
            Err(JobError::InvalidFormat(_)) | Err(JobError::Invalid { .. })
        ));

        let bad_key = JOB.replace("primary_key = [\"ano\", \"id_municipio\"]", "primary_key = [\"id\"]");
        assert!(matches!(
            JobPipeline::from_toml(&bad_key, &database),
            Err(JobError::Invalid { .. })
        ));

        let both = JOB.replace("unnest = true", "unnest = true\nclassifications = { \"81\" = [] }");
        assert!(matches!(
            JobPipeline::from_toml(&both, &database),
            Err(JobError::Invalid { .. })
        ));

        let bad_default = JOB.replace("default = \"PAM\"", "default = \"PAM\"\nkind = \"integer\"");
        assert!(matches!(
            JobPipeline::from_toml(&bad_default, &database),
            Err(JobError::Invalid { .. })
        ));
    }
}
