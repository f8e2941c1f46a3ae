//! Database connection configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::store;

/// `[database]` section
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
    /// Default destination schema for jobs that do not name one
    pub schema: String,
    pub tablespace: Option<String>,
    /// Role granted SELECT on created tables
    pub readonly_role: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            schema: store::DEFAULT_SCHEMA.to_string(),
            tablespace: None,
            readonly_role: None,
            max_connections: store::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("schema", &self.schema)
            .field("tablespace", &self.tablespace)
            .field("readonly_role", &self.readonly_role)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}
