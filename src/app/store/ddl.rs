//! DDL and DCL statement builders

use super::{qualified_name, TableSpec};

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE TABLE IF NOT EXISTS` plus an optional `COMMENT ON TABLE`
///
/// Statements are returned separately so they can be executed one at a
/// time.
pub fn build_ddl(spec: &TableSpec) -> Vec<String> {
    let table = spec.qualified_name();

    let mut definitions: Vec<String> = spec
        .columns
        .iter()
        .map(|column| format!("{} {}", column.name, column.sql_type))
        .collect();
    if !spec.primary_keys.is_empty() {
        definitions.push(format!(
            "CONSTRAINT {}_pkey PRIMARY KEY ({})",
            spec.name,
            spec.primary_keys.join(", ")
        ));
    }

    let mut create = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        table,
        definitions.join(",\n    ")
    );
    if let Some(tablespace) = &spec.tablespace {
        create.push_str(&format!("\nTABLESPACE {}", tablespace));
    }
    create.push(';');

    let mut statements = vec![create];
    if let Some(comment) = spec.comment.as_deref().filter(|c| !c.is_empty()) {
        statements.push(format!(
            "COMMENT ON TABLE {} IS {};",
            table,
            quote_literal(comment)
        ));
    }
    statements
}

/// Owner change and read grant for a table
pub fn build_dcl(schema: &str, table: &str, owner: Option<&str>, reader: Option<&str>) -> Vec<String> {
    let table = qualified_name(schema, table);
    let mut statements = Vec::new();
    if let Some(owner) = owner {
        statements.push(format!("ALTER TABLE IF EXISTS {} OWNER TO {};", table, owner));
    }
    if let Some(reader) = reader {
        statements.push(format!("GRANT SELECT ON TABLE {} TO {};", table, reader));
    }
    statements
}
